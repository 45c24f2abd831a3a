//! Core domain types shared by the parsers, catalog, and tree builder.

pub mod errors;
pub mod model;
