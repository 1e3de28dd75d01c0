use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use gator::commands::{Command, Registry, State};
use gator::config::Config;
use gator::feed::FeedClient;
use gator::storage::Database;

/// Used when neither `RUST_LOG` nor the config's `log_level` is set
const DEFAULT_LOG_FILTER: &str = "gator=info";

#[derive(Parser, Debug)]
#[command(name = "gator", version, about = "Command-line RSS aggregator")]
struct Args {
    /// Config file (default: ~/.config/gator/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// One of: login, register, reset, users, agg, addfeed, feeds, follow,
    /// following, unfollow, browse
    command: String,

    /// Arguments for the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn init_logging(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // stdout belongs to command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the config before logging is configured. Only `RUST_LOG` applies
/// here; without it, load-time diagnostics are left for the caller.
fn load_config(path: &Path) -> Result<Config> {
    let load = || {
        Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    };
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            let bootstrap = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .finish();
            tracing::subscriber::with_default(bootstrap, load)
        }
        Err(_) => load(),
    }
}

/// Create the directory holding the config (and, by default, the database)
/// with user-only permissions.
fn ensure_config_dir(config_path: &Path) -> Result<()> {
    let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create config directory {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)) {
            tracing::warn!(
                path = %dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = load_config(&config_path)?;

    init_logging(config.log_level.as_deref());
    for key in config.unknown_keys() {
        tracing::warn!(
            key = %key,
            path = %config_path.display(),
            "Unknown key in config file, ignoring"
        );
    }
    ensure_config_dir(&config_path)?;

    let db = Database::open(&config.db_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.db_url))?;
    let client = FeedClient::new().context("Failed to build HTTP client")?;

    let mut state = State::new(db, config, client);
    let registry = Registry::with_defaults();
    let command = Command::new(args.command, args.args);

    registry.run(&mut state, &command).await
}
