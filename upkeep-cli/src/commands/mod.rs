//! One module per subcommand. Each exposes a `render` that works against any
//! backend or store, and a `run` that wires it to the real host.

pub mod auth;
pub mod get;
pub mod list;
pub mod tenant;
