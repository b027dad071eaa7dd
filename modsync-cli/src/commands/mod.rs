//! CLI subcommands.

pub mod common;
pub mod get;
pub mod list;
pub mod sync;
pub mod version;
