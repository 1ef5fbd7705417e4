//! hrportal - terminal frontend for the HR records portal API.
//!
//! Signs in, issues authenticated requests through the shared client
//! facade, and watches the session so it is closed when the token expires.

mod app;
mod terminal;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use hrportal_core::{Settings, StorageKind};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "hrportal.log";

/// HR portal command-line client
#[derive(Parser, Debug)]
#[command(name = "hrportal")]
#[command(about = "Command-line client for the HR records portal API")]
#[command(version)]
pub struct Args {
    /// Only log notices instead of showing them
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Where to keep the session between runs
    #[arg(long, global = true, value_enum)]
    pub store: Option<StoreArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StoreArg {
    Memory,
    File,
    Keyring,
}

impl From<StoreArg> for StorageKind {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Memory => StorageKind::Memory,
            StoreArg::File => StorageKind::File,
            StoreArg::Keyring => StorageKind::Keyring,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with employee id and password
    Signin {
        #[arg(short, long)]
        employee_id: Option<String>,
    },
    /// Complete a Google sign-in with the callback parameters
    GoogleSignin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        id_token: String,
    },
    /// Print the URL that starts a Google sign-in
    GoogleUrl {
        /// Build the sign-up callback instead of sign-in
        #[arg(long)]
        signup: bool,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        employee_id: String,
    },
    /// Request a password reset link
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password with the token from a reset link
    ResetPassword {
        #[arg(long)]
        token: String,
    },
    /// GET a resource and print it
    Get { path: String },
    /// POST a JSON body
    Post {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    /// PUT a JSON body
    Put {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    /// DELETE a resource
    Delete { path: String },
    /// Show the current session and when it expires
    Status,
    /// Hold the session open until it expires
    Watch,
    /// Forget the current session
    Signout,
}

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match Settings::cache_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
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

    let args = Args::parse();
    let _log_guard = init_tracing();
    info!("hrportal starting");

    let app = App::new(&args)?;
    let result = app.run(args.command).await;

    info!("hrportal shutting down");
    result
}
