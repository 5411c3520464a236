//! CLI definition for the Upkeep terminal host.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Upkeep - CMMS console in the terminal
#[derive(Parser, Debug)]
#[command(name = "upkeep")]
#[command(version)]
#[command(about = "Upkeep CMMS console engine - terminal host")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Extra configuration file layered over the standard locations
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory of YAML schema overrides (entities/, forms/, tables/)
    #[arg(long, global = true, value_name = "DIR")]
    pub schemas: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show how a hostname resolves to a tenant and API host
    Tenant {
        /// Console hostname, e.g. acme.console.example.com
        hostname: String,
    },
    /// List records of an entity
    List(ListArgs),
    /// Show one record through its form schema
    Get {
        /// Entity name, e.g. asset
        entity: String,
        /// Record id
        id: String,
        /// Console hostname selecting the tenant
        #[arg(long)]
        host: Option<String>,
    },
    /// Store an access token for later commands
    Login {
        /// Access token issued by the console
        #[arg(long)]
        token: String,
        /// Refresh token, if one was issued
        #[arg(long)]
        refresh: Option<String>,
    },
    /// Remove stored credentials
    Logout,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Entity name, e.g. asset
    pub entity: String,
    /// Console hostname selecting the tenant
    #[arg(long)]
    pub host: Option<String>,
    /// Free-text search
    #[arg(short, long)]
    pub search: Option<String>,
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Rows per page
    #[arg(long, default_value_t = 10)]
    pub page_size: u32,
    /// Column key to sort by
    #[arg(long)]
    pub sort: Option<String>,
    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,
}
