//! CLI commands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// logslice CLI
#[derive(Parser)]
#[command(name = "logslice")]
#[command(about = "Slice multi-file record logs into named time windows")]
pub struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Input files and window selection shared by the reading commands
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Input record files, read in the order given
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Process just this window; "start,end" or "start,end,name" (repeatable)
    #[arg(short, long = "keep", value_name = "SPEC")]
    pub keep: Vec<String>,

    /// Keep only records of this type (repeatable)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    /// Accepted file extension (repeatable, default "lsr")
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip checksum and record count verification
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print record counts and time bounds per stream
    Summary {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Print one JSON object per stream
        #[arg(long)]
        json: bool,
    },
    /// Print every record as a JSON line
    Dump {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Write each stream to its own record file
    Extract {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Directory for the output files (default: next to the first input of each
        /// segment; without --keep the single stream is written to ./all.lsr)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// Compress output blocks with zstd
        #[arg(long)]
        compress: bool,
    },
    /// Build a record file from JSON lines
    Import {
        /// JSON lines input: {"type": ..., "timestamp": ..., "payload": ...}
        #[arg(short, long)]
        input: PathBuf,
        /// Record file to create
        #[arg(short, long)]
        output: PathBuf,
        /// Compress output blocks with zstd
        #[arg(long)]
        compress: bool,
    },
}
