//! Infrastructure adapters for config, logging, git, and label highlighting.

pub mod config;
pub mod git;
pub mod highlight;
pub mod logging;
