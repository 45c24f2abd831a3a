//! Collection of reusable TUI components.

pub mod command_palette;
pub mod flow_tree;
pub mod steps;
