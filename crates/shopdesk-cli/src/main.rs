//! shopdesk - a terminal front end for the shopdesk retail dashboard API.
//!
//! Signs in, lists catalog and ledger resources (falling back to the last
//! cached copy when the API is unreachable) and keeps a session open under
//! the inactivity monitor.

mod app;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shopdesk_core::{Config, Resource};

use app::App;

/// Log file written under the storage directory
const LOG_FILE: &str = "shopdesk.log";

const USAGE: &str = "\
Usage: shopdesk <command>

Commands:
  login [email]         Sign in (SHOPDESK_EMAIL / SHOPDESK_PASSWORD are used if set)
  verify <email> <code> Confirm a new account
  logout                Sign out and clear the saved session
  whoami                Show the signed-in user
  list <resource>       Print a list (products, sales, users, customers, providers,
                        expenses, purchases, incomes, discounts, categories, banners)
  refresh               Fetch every list and update the offline cache
  cache                 Show the age of each cached list
  watch                 Keep the session open; ends on inactivity or expiry";

#[derive(Debug, PartialEq)]
enum Command {
    Login(Option<String>),
    Verify { email: String, code: String },
    Logout,
    Whoami,
    List(Resource),
    Refresh,
    Cache,
    Watch,
}

impl Command {
    fn parse(command: &str, rest: &[String]) -> Result<Self> {
        Ok(match (command, rest) {
            ("login", rest) => Command::Login(rest.first().cloned()),
            ("verify", [email, code]) => Command::Verify {
                email: email.clone(),
                code: code.clone(),
            },
            ("logout", _) => Command::Logout,
            ("whoami", _) => Command::Whoami,
            ("list", [resource]) => Command::List(resource.parse().map_err(anyhow::Error::msg)?),
            ("refresh", _) => Command::Refresh,
            ("cache", _) => Command::Cache,
            ("watch", _) => Command::Watch,
            _ => anyhow::bail!("Unknown command or arguments\n\n{}", USAGE),
        })
    }
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a file so they do not interleave with command output; if the
/// directory is unusable they go to stderr instead.
fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if std::fs::create_dir_all(log_dir).is_ok() {
        let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .with(filter)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
        None
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }
    let command = Command::parse(command, &args[1..])?;

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config ({}), using defaults", e);
        Config::default()
    });
    let storage_dir = config
        .storage_dir()
        .unwrap_or_else(|_| PathBuf::from("./shopdesk-data"));

    let _log_guard = init_tracing(&storage_dir);
    info!(?command, "shopdesk starting");

    let mut app = App::new(config, storage_dir).await?;

    match command {
        Command::Login(email) => app.login(email).await?,
        Command::Verify { email, code } => app.verify(&email, &code).await?,
        Command::Logout => app.logout(),
        Command::Whoami => app.whoami(),
        Command::List(resource) => app.list(resource).await?,
        Command::Refresh => app.refresh_all().await?,
        Command::Cache => app.cache_status(),
        Command::Watch => app.watch().await?,
    }

    info!("shopdesk finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("login", &[]).unwrap(), Command::Login(None));
        assert_eq!(
            Command::parse("verify", &args(&["a@b.c", "123456"])).unwrap(),
            Command::Verify {
                email: "a@b.c".to_string(),
                code: "123456".to_string()
            }
        );
        assert_eq!(
            Command::parse("list", &args(&["products"])).unwrap(),
            Command::List(Resource::Products)
        );
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let err = Command::parse("frobnicate", &[]).unwrap_err();
        assert!(err.to_string().contains("Usage: shopdesk"));
        assert!(Command::parse("verify", &args(&["only-email"])).is_err());
        assert!(Command::parse("list", &args(&["widgets"])).is_err());
    }
}
