//! caskdb CLI
//!
//! Offline maintenance tools for a caskdb data directory pair.
//!
//! # Commands
//!
//! - `inspect` - Display segment, hint and index statistics
//! - `verify` - Check that every indexed key resolves on disk
//! - `compact` - Merge durable segments
//! - `export` - Write the `Key,Value` table to a file
//! - `get` / `put` - Read or write a single key
//! - `dump-hints` - Print the entries of one hint file

mod commands;

use clap::{Parser, Subcommand};
use commands::Dirs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// caskdb command-line database tools.
#[derive(Parser)]
#[command(name = "caskdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of data segments
    #[arg(global = true, short, long, default_value = "logs")]
    log_dir: PathBuf,

    /// Directory of hint files
    #[arg(global = true, long, default_value = "hints")]
    hint_dir: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display segment, hint and index statistics
    Inspect {
        /// List every segment with its size
        #[arg(short, long)]
        segments: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that every indexed key resolves to its own entry
    Verify {
        /// Recover segments without hint files by scanning them
        #[arg(long)]
        scan: bool,
    },

    /// Merge durable segments into the fewest segments that hold every key
    Compact {
        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Export every live pair as a `Key,Value` table
    Export {
        /// Target directory
        dir: PathBuf,

        /// File name within the directory
        name: String,
    },

    /// Print the value stored under a key
    Get {
        /// Key to read
        #[arg(allow_negative_numbers = true)]
        key: i64,
    },

    /// Store a value under a key and flush it
    Put {
        /// Key to write
        #[arg(allow_negative_numbers = true)]
        key: i64,

        /// Value to store
        value: String,
    },

    /// Print the entries of one hint file
    DumpHints {
        /// Segment id of the hint file
        id: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let dirs = Dirs {
        log_dir: cli.log_dir,
        hint_dir: cli.hint_dir,
    };

    match cli.command {
        Commands::Inspect { segments, format } => {
            commands::inspect::run(&dirs, segments, &format)?;
        }
        Commands::Verify { scan } => {
            commands::verify::run(&dirs, scan)?;
        }
        Commands::Compact { dry_run } => {
            commands::compact::run(&dirs, dry_run)?;
        }
        Commands::Export { dir, name } => {
            commands::export::run(&dirs, &dir, &name)?;
        }
        Commands::Get { key } => {
            commands::get::run(&dirs, key)?;
        }
        Commands::Put { key, value } => {
            commands::put::run(&dirs, key, value.as_bytes())?;
        }
        Commands::DumpHints { id, format } => {
            commands::dump_hints::run(&dirs, id, &format)?;
        }
        Commands::Version => {
            println!("caskdb CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("caskdb Core v{}", caskdb_core::VERSION);
        }
    }

    Ok(())
}
