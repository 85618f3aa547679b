//! CLI command handlers

pub mod args;
pub mod commands;

pub use args::ServerArgs;
pub use commands::{fill, inspect_template, serve, table, templates};
