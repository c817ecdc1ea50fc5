//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific
//! modules.

mod classify;
mod import;
mod init;
mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::models::BusinessContext;

#[derive(Parser)]
#[command(name = "taxlens")]
#[command(about = "AI transaction classification and tax research system")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "TAXLENS_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(short = 't', long, global = true, env = "TAXLENS_DATA_DIR")]
    target: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Import source transactions for a tenant from a JSON file
    Import {
        /// Tenant the transactions belong to
        #[arg(short = 'T', long)]
        tenant: String,
        /// JSON file containing an array of transactions
        file: PathBuf,
        /// Replace any previously imported transactions for the tenant
        #[arg(long)]
        replace: bool,
    },

    /// Classify a tenant's transactions chunk by chunk until complete
    Classify {
        /// Tenant to classify
        #[arg(short = 'T', long)]
        tenant: String,
        /// Transactions per chunk (default 25, max 50)
        #[arg(short, long)]
        batch_size: Option<u32>,
        /// Business name for classification context
        #[arg(long)]
        business_name: Option<String>,
        /// Industry for classification context
        #[arg(long)]
        industry: Option<String>,
        /// ABN for classification context
        #[arg(long)]
        abn: Option<String>,
    },

    /// Show the classification job status for a tenant
    Status {
        /// Tenant to inspect
        #[arg(short = 'T', long)]
        tenant: String,
    },

    /// Start the web server
    Serve {
        /// Bind address: port, host, or host:port
        #[arg(short, long, default_value = "127.0.0.1:3030")]
        bind: String,
    },
}

/// Parse arguments and dispatch to the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(target) = cli.target {
        settings.data_dir = target;
    }

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Import {
            tenant,
            file,
            replace,
        } => import::cmd_import(&settings, &tenant, &file, replace).await,
        Commands::Classify {
            tenant,
            batch_size,
            business_name,
            industry,
            abn,
        } => {
            let context = BusinessContext {
                business_name,
                industry,
                abn,
            };
            classify::cmd_classify(&settings, &tenant, batch_size, context).await
        }
        Commands::Status { tenant } => status::cmd_status(&settings, &tenant).await,
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
    }
}
