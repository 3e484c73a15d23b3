//! `latchkey`: RFID door access controller.
//!
//! ```text
//! latchkey --config /etc/latchkey.json serve
//! latchkey --config /etc/latchkey.json read --timeout-sec 10
//! latchkey dump --max-attempts 5
//! ```

mod app;
mod config;
mod dump;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::Config;
use latchkey_core::constants::DEFAULT_DUMP_TIMEOUT_MS;
use latchkey_hardware::TagReader;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "latchkey", version, about = "RFID door access controller")]
struct Args {
    /// JSON configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of RUST_LOG.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the access loop until Ctrl-C.
    Serve,

    /// Read the next tag once and print it as JSON.
    Read {
        /// Seconds to wait for a tag (default 5).
        #[arg(long)]
        timeout_sec: Option<String>,
    },

    /// Print every sector of the tag in front of the reader.
    Dump {
        /// Tries per sector before skipping it.
        #[arg(long, default_value_t = 5)]
        max_attempts: usize,

        /// Timeout of each sector read, in milliseconds.
        #[arg(long, default_value_t = DEFAULT_DUMP_TIMEOUT_MS)]
        timeout_ms: u64,
    },
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug,sqlx=warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            info!("No config file given, using defaults");
            Config::default()
        }
    };

    match args.command {
        Command::Serve => app::serve(config).await,
        Command::Read { timeout_sec } => {
            let body = app::read_once(&config, timeout_sec.as_deref()).await?;
            println!("{body}");
            Ok(())
        }
        Command::Dump {
            max_attempts,
            timeout_ms,
        } => {
            let mut reader = app::build_reader(&config.reader)?;
            reader
                .initialize()
                .await
                .context("failed to initialize reader")?;

            let mut stdout = std::io::stdout().lock();
            let result = dump::dump_tag(
                &mut reader,
                Duration::from_millis(timeout_ms),
                max_attempts,
                &mut stdout,
            )
            .await;

            reader.halt().await.context("failed to halt reader")?;
            let summary = result?;
            if !summary.skipped.is_empty() {
                anyhow::bail!("unreadable sectors: {:?}", summary.skipped);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_dump_defaults() {
        let args = Args::try_parse_from(["latchkey", "dump"]).unwrap();
        match args.command {
            Command::Dump {
                max_attempts,
                timeout_ms,
            } => {
                assert_eq!(max_attempts, 5);
                assert_eq!(timeout_ms, DEFAULT_DUMP_TIMEOUT_MS);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["latchkey", "read", "--timeout-sec", "2.5", "--debug"]).unwrap();
        assert!(args.debug);
        assert!(matches!(args.command, Command::Read { timeout_sec: Some(t) } if t == "2.5"));
    }
}
