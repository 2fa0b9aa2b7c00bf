//! phishdash - a command line front end for the phishing-risk dashboard.
//!
//! Each subcommand plays the part of a dashboard view: it is admitted
//! through the route guard, talks to the API through the shared session,
//! and reports any notices or forced logouts raised along the way.

mod app;
mod output;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use phishdash_core::Config;

// ============================================================================
// Constants
// ============================================================================

/// Rolling log file name (a date suffix is appended daily)
const LOG_FILE_NAME: &str = "phishdash.log";

#[derive(Parser, Debug)]
#[command(name = "phishdash", version, about = "Phishing-risk dashboard client")]
struct Cli {
    /// API base URL; overrides the config file
    #[arg(long, env = "PHISHDASH_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(long, short)]
        username: Option<String>,
        /// Remember the password in the OS keychain
        #[arg(long)]
        remember: bool,
        /// Log in again even if a session exists
        #[arg(long)]
        force: bool,
    },
    /// End the session
    Logout {
        /// Also delete the password stored in the OS keychain
        #[arg(long)]
        forget: bool,
    },
    /// Show the current user
    Whoami,
    /// Manage tracked URLs
    Urls(UrlsCommand),
    /// Download all URLs as CSV
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Upload a CSV file of URLs
    Import { file: PathBuf },
    /// Dashboard analytics
    Dashboard(DashboardCommand),
}

#[derive(Args, Debug)]
pub struct UrlsCommand {
    #[command(subcommand)]
    pub command: UrlsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum UrlsSubcommand {
    List,
    Add {
        url: String,
        /// Defaults to the URL's host
        #[arg(long)]
        domain: Option<String>,
        #[arg(long, default_value = "unknown")]
        threat: String,
        #[arg(long, default_value = "active")]
        status: String,
        #[arg(long, default_value = "manual")]
        source: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        threat: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct DashboardCommand {
    #[command(subcommand)]
    pub command: Option<DashboardSubcommand>,
}

#[derive(Subcommand, Debug)]
pub enum DashboardSubcommand {
    /// Totals by threat and status
    Metrics,
    /// URL counts per threat level
    Risk,
    /// URL counts per status
    Status,
    /// URL counts per domain
    Domains {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Riskiest domains only
        #[arg(long)]
        top: bool,
    },
    /// URLs added per day
    Activity {
        #[arg(long)]
        monthly: bool,
    },
    /// Riskiest URLs
    Top {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Most recently added URLs
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Recent activity feed
    Events {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Search URLs and domains
    Search { query: String },
    /// Metrics, top domains, daily activity and recent URLs together
    Summary,
}

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=debug). Logs go to
/// stderr and, when the cache directory is usable, to a daily rolling file.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_dir = Config::default()
        .cache_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());
    // Flushes the log file on drop
    let _log_guard = init_tracing(log_dir.as_deref());
    info!("phishdash starting");

    let mut app = App::new(cli.base_url)?;
    let result = app.run(cli.command).await;
    app.report_events();

    result
}
