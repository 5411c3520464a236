//! Upkeep CLI - terminal host for the CMMS console engine.
//!
//! Commands:
//! - `upkeep tenant <hostname>`: Show tenant resolution and API host
//! - `upkeep list <entity>`: List records of an entity
//! - `upkeep get <entity> <id>`: Show one record
//! - `upkeep login --token <T>`: Store an access token
//! - `upkeep logout`: Remove stored credentials
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error

use clap::Parser;
use tracing_subscriber::EnvFilter;

use upkeep::commands::{auth, get, list, tenant};
use upkeep::{Cli, Commands, Host};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new(
            "upkeep=debug,upkeep_transport=debug,upkeep_forms=debug,upkeep_tables=debug,upkeep_config=debug,upkeep_fields=debug",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = result_to_exit(dispatch(cli).await);
    std::process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let host = Host::load(cli.config.as_deref(), cli.schemas.as_deref()).await?;
    match cli.command {
        Commands::Tenant { hostname } => tenant::run(&host, &hostname),
        Commands::List(args) => list::run(&host, &args).await,
        Commands::Get { entity, id, host: hostname } => {
            get::run(&host, &entity, &id, hostname.as_deref()).await
        }
        Commands::Login { token, refresh } => auth::run_login(&host, &token, refresh.as_deref()),
        Commands::Logout => auth::run_logout(&host),
    }
}

/// Convert a command result to an exit code.
fn result_to_exit(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_tenant() {
        let cli = Cli::parse_from(["upkeep", "tenant", "acme.console.example.com"]);
        assert!(!cli.debug);
        assert!(matches!(cli.command, Commands::Tenant { hostname } if hostname == "acme.console.example.com"));
    }

    #[test]
    fn test_cli_parsing_list_defaults() {
        let cli = Cli::parse_from(["upkeep", "list", "asset"]);
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.entity, "asset");
        assert_eq!(args.page, 1);
        assert_eq!(args.page_size, 10);
        assert!(!args.desc);
    }

    #[test]
    fn test_cli_parsing_list_options() {
        let cli = Cli::parse_from([
            "upkeep", "--debug", "list", "work_order", "--search", "pump", "--page", "3",
            "--sort", "title", "--desc",
        ]);
        assert!(cli.debug);
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.search.as_deref(), Some("pump"));
        assert_eq!(args.page, 3);
        assert_eq!(args.sort.as_deref(), Some("title"));
        assert!(args.desc);
    }

    #[test]
    fn test_cli_desc_requires_sort() {
        assert!(Cli::try_parse_from(["upkeep", "list", "asset", "--desc"]).is_err());
    }

    #[test]
    fn test_cli_parsing_login() {
        let cli = Cli::parse_from(["upkeep", "login", "--token", "abc", "--refresh", "def"]);
        assert!(matches!(
            cli.command,
            Commands::Login { token, refresh } if token == "abc" && refresh.as_deref() == Some("def")
        ));
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli = Cli::parse_from(["upkeep", "logout", "--config", "/tmp/upkeep.toml"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/upkeep.toml")));
        assert!(matches!(cli.command, Commands::Logout));
    }

    #[test]
    fn test_result_to_exit() {
        assert_eq!(result_to_exit(Ok(())), 0);
        assert_eq!(result_to_exit(Err(anyhow::anyhow!("boom"))), 1);
    }
}
