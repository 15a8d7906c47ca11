//! CLI library components for colmap.

pub mod commands;
pub mod logging;
