//! Application layer: bookmark parsing, per-app catalogs, and the flow tree view model.

pub mod bookmarks;
pub mod catalog;
pub mod filter;
pub mod joined;
pub mod registry;
pub mod search;
pub mod session;
pub mod tree;
pub mod workspace;
