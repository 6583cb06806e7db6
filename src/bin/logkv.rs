//! LogKV CLI
//!
//! Runs a single engine operation against a local data directory.

use clap::{Parser, Subcommand, ValueEnum};
use logkv::{Config, Engine, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// LogKV CLI
#[derive(Parser, Debug)]
#[command(name = "logkv")]
#[command(about = "Log-structured key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./logkv_data")]
    data_dir: String,

    /// When to fsync the data file
    #[arg(short, long, value_enum, default_value_t = SyncMode::EveryWrite)]
    sync: SyncMode,

    /// Appends between fsyncs when --sync=every-n
    #[arg(short = 'n', long, default_value = "100")]
    sync_every: usize,

    /// Cut a large torn tail on open, saving it to logkv.data.torn first
    #[arg(long)]
    repair: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SyncMode {
    Never,
    EveryWrite,
    EveryN,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Compact the data file down to live records
    Merge,

    /// Show key count and data file size
    Stats,
}

fn main() {
    // Initialize tracing/logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,logkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let sync_strategy = match args.sync {
        SyncMode::Never => SyncStrategy::Never,
        SyncMode::EveryWrite => SyncStrategy::EveryWrite,
        SyncMode::EveryN => SyncStrategy::EveryNEntries {
            count: args.sync_every,
        },
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .sync_strategy(sync_strategy)
        .repair_torn_tail(args.repair)
        .build();

    let engine = match Engine::open_with_config(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&engine, args.command) {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        std::process::exit(1);
    }
}

fn run(engine: &Engine, command: Commands) -> logkv::Result<()> {
    match command {
        Commands::Get { key } => match engine.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            engine.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Merge => {
            let stats = engine.merge()?;
            println!(
                "kept {} of {} records, reclaimed {} bytes",
                stats.entries_kept,
                stats.entries_scanned,
                stats.bytes_reclaimed()
            );
        }
        Commands::Stats => {
            println!("keys: {}", engine.len());
            println!("data file: {}", engine.data_file_path().display());
            println!("size: {} bytes", engine.log_size());
        }
    }
    Ok(())
}
