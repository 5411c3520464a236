//! Upkeep terminal host
//!
//! Drives the console engine from a shell: resolves tenants, lists entity
//! tables, shows records through their form schema and manages the stored
//! access token.

pub mod cli;
pub mod commands;
pub mod host;

pub use cli::{Cli, Commands, ListArgs};
pub use host::{Host, TerminalNavigator, TerminalNotifier};
