//! postcheck command-line tool.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use postcheck::{commands, shutdown, PostcheckConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Configuration file used when `--config` is not given and the file exists.
const DEFAULT_CONFIG: &str = "postcheck.toml";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, env = "POSTCHECK_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one verification session over the address directory
    Verify {
        /// Maximum lookups per postcode this session
        #[arg(long)]
        batch_size: Option<usize>,
        /// Pause between lookups, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Fixed sampling seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Reverse-verify postcodes the verification loop never confirmed
    Hopeless {
        /// Pause between round trips, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Classify every postcode and write the summary table
    Summary,
    /// Write the sorted list of every confirmed postcode
    Compile,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<PostcheckConfig> {
    match path {
        Some(path) => PostcheckConfig::load(&path)
            .with_context(|| format!("loading {}", path.display())),
        None if std::path::Path::new(DEFAULT_CONFIG).exists() => {
            PostcheckConfig::load(DEFAULT_CONFIG).context("loading postcheck.toml")
        }
        None => Ok(PostcheckConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config)?;

    let cancelled = match cli.command {
        Command::Verify {
            batch_size,
            delay_ms,
            seed,
        } => {
            if let Some(batch_size) = batch_size {
                config.session.batch_size = batch_size;
            }
            if let Some(delay_ms) = delay_ms {
                config.session.request_delay_ms = delay_ms;
            }
            if seed.is_some() {
                config.session.seed = seed;
            }
            config.validate()?;

            let report = commands::verify(&config, shutdown::on_ctrl_c())
                .await
                .context("verification session failed")?;
            info!(
                matched = report.matched,
                exhausted = report.batch_exhausted,
                calls = report.oracle_calls,
                "done"
            );
            report.cancelled
        }
        Command::Hopeless { delay_ms } => {
            if let Some(delay_ms) = delay_ms {
                config.session.request_delay_ms = delay_ms;
            }
            let report = commands::hopeless(&config, shutdown::on_ctrl_c())
                .await
                .context("reverse verification failed")?;
            info!(
                confirmed = report.confirmed,
                declined = report.declined,
                "done"
            );
            report.cancelled
        }
        Command::Summary => {
            commands::summary(&config)
                .await
                .context("writing summary failed")?;
            false
        }
        Command::Compile => {
            let count = commands::compile(&config).context("compiling reference list failed")?;
            info!(postcodes = count, "done");
            false
        }
    };

    Ok(if cancelled {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
