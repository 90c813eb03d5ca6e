//! jobline CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "jobline")]
#[command(about = "Inspect and reorder jobline job queues", long_about = None)]
struct Cli {
    /// Cluster configuration file
    #[arg(long, global = true, env = "JOBLINE_CONFIG", default_value = "jobline.kdl")]
    config: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the jobs of a resource pool in queue order
    Queue {
        /// Resource pool
        #[arg(long, default_value = "default")]
        pool: String,
        /// Furthest back first
        #[arg(long)]
        desc: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show queued and scheduled counts of a resource pool
    Stats {
        /// Resource pool
        #[arg(long, default_value = "default")]
        pool: String,
    },
    /// Apply queue control updates, e.g. `exp-7:priority=10` or `exp-7:ahead-of=@head`
    Control {
        /// Updates as JOB:ACTION=VALUE, applied in order
        #[arg(required = true)]
        updates: Vec<String>,
        /// Resource pool to list afterwards
        #[arg(long, default_value = "default")]
        pool: String,
    },
    /// Explain a container exit code
    ExitStatus {
        /// Exit code
        #[arg(allow_hyphen_values = true)]
        code: i32,
    },
    /// Validate a cluster configuration
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "jobline.kdl")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Queue { pool, desc, json } => {
            commands::queue::list(&cli.config, &pool, desc, json).await?;
        }
        Commands::Stats { pool } => {
            commands::queue::stats(&cli.config, &pool).await?;
        }
        Commands::Control { updates, pool } => {
            commands::control::apply(&cli.config, &updates, &pool).await?;
        }
        Commands::ExitStatus { code } => {
            commands::exit_status(code);
        }
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
    }

    Ok(())
}
