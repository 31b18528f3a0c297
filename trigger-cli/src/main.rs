//! # bluezcript
//!
//! CLI for the BlueZcript authenticated trigger protocol.
//!
//! ## Commands
//!
//! - `keygen`: Mint a pairing payload for a receiving device
//! - `pair`: Save a pairing from a payload or flags
//! - `trigger`: Advance the counter, sign, and write the frame to stdout
//! - `status`: Show paired devices and counters
//! - `reset`: Forget one or all pairings
//! - `verify`: Check a captured frame as a receiver would
//!
//! ## Example
//!
//! ```bash
//! # On the receiver side, mint a credential
//! bluezcript keygen --device-id garage
//!
//! # On the sending side, pair with it
//! bluezcript pair "garage|0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f"
//!
//! # Fire (prints the manufacturer-data frame as hex)
//! bluezcript trigger garage
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;
mod transport;

use commands::{keygen, pair, reset, status, trigger, verify};
use config::Config;

const DEFAULT_FILTER: &str = "bluezcript=info,warn";
const VERBOSE_FILTER: &str = "bluezcript=debug,warn";

/// CLI for the BlueZcript authenticated trigger protocol.
#[derive(Parser, Debug)]
#[command(name = "bluezcript")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for pairings and the config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/bluezcript.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mint a fresh pairing payload
    Keygen {
        /// Device id to embed (default: random)
        #[arg(long)]
        device_id: Option<String>,

        /// Use the receiver's radio address as the device id
        #[arg(long, conflicts_with = "device_id")]
        mac: Option<String>,

        /// Pairing server URL for the three-field form
        #[arg(long)]
        server_url: Option<String>,
    },

    /// Pair with a device
    Pair {
        /// Pairing payload: `deviceId|keyHex` or `serverUrl|deviceId|keyHex`
        payload: Option<String>,

        /// Device id (with --key, instead of a payload)
        #[arg(long, conflicts_with = "payload", requires = "key")]
        device: Option<String>,

        /// Pre-shared key as hex (with --device)
        #[arg(long, conflicts_with = "payload", requires = "device")]
        key: Option<String>,
    },

    /// Fire one trigger at a paired device
    Trigger {
        /// Device id
        device: String,
    },

    /// Show paired devices
    Status,

    /// Forget a pairing
    Reset {
        /// Device id
        #[arg(conflicts_with = "all")]
        device: Option<String>,

        /// Forget every pairing
        #[arg(long)]
        all: bool,
    },

    /// Check a captured frame as a receiver would
    Verify {
        /// Frame as hex (13-byte payload or manufacturer data)
        frame: String,

        /// Pre-shared key as hex
        #[arg(long)]
        key: String,

        /// Last counter the receiver accepted
        #[arg(long, default_value = "0")]
        last_seen: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    let config = Config::load(&data_dir, cli.config.as_deref());
    init_tracing(
        cli.verbose,
        config.as_ref().ok().and_then(|c| c.log.filter.as_deref()),
    );
    let config = config?;

    let ctx = commands::Context {
        store_dir: config.store_dir(&data_dir),
        transport: config.transport.clone(),
    };
    tracing::debug!(data_dir = %data_dir.display(), store = %ctx.store_dir.display(), "starting");

    match cli.command {
        Commands::Keygen {
            device_id,
            mac,
            server_url,
        } => {
            keygen::run(device_id.as_deref(), mac.as_deref(), server_url.as_deref())?;
        }
        Commands::Pair {
            payload,
            device,
            key,
        } => {
            pair::run(&ctx, payload.as_deref(), device.as_deref(), key.as_deref()).await?;
        }
        Commands::Trigger { device } => {
            trigger::run(&ctx, &device).await?;
        }
        Commands::Status => {
            status::run(&ctx).await?;
        }
        Commands::Reset { device, all } => {
            reset::run(&ctx, device.as_deref(), all).await?;
        }
        Commands::Verify {
            frame,
            key,
            last_seen,
        } => {
            verify::run(&frame, &key, last_seen, config.transport.company_id)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so frames on stdout stay machine readable.
///
/// `RUST_LOG` wins, then `-v`, then the config file's filter, then the default.
fn init_tracing(verbose: bool, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            return EnvFilter::new(VERBOSE_FILTER);
        }
        configured
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    });

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Get the default data directory for bluezcript.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "bluezcript", "bluezcript")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
