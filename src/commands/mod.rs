//! Command-line interface definitions and handlers for the pathstore CLI.

pub mod args;
pub mod build;
pub mod inspect;

pub use args::{Cli, Commands};
pub use build::{build_store, build_store_from_config, BuildArgs};
pub use inspect::{fetch_value, inspect_store};
