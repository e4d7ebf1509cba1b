//! CLI subcommands.

pub mod common;
pub mod content;
pub mod package;
