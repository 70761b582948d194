//! CLI Module
//!
//! Command-line interface for running HyperPrism effects offline.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HyperPrism - single-effect audio processors
#[derive(Parser, Debug)]
#[command(name = "hyperprism")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available effects
    #[command(name = "list")]
    List,

    /// Show an effect's parameters, ranges and defaults
    #[command(name = "params")]
    Params {
        /// Effect id (see `list`)
        effect: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Process a WAV file through an effect
    #[command(name = "render")]
    Render {
        /// Effect id (see `list`)
        effect: String,

        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Parameter override, e.g. `--set threshold=-24` (repeatable)
        #[arg(short, long = "set", value_name = "ID=VALUE")]
        set: Vec<String>,

        /// Restore parameters from a saved state file first
        #[arg(long)]
        state: Option<PathBuf>,

        /// Render configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Samples per processing block
        #[arg(short, long)]
        block_size: Option<usize>,

        /// Keep the lookahead delay in the output
        #[arg(long)]
        no_latency_compensation: bool,

        /// Silence rendered after the input, in milliseconds
        #[arg(long)]
        tail_ms: Option<f32>,

        /// Output bit depth (16, 24 or 32 float)
        #[arg(long)]
        bits: Option<u16>,

        /// Write the final parameter state to this file
        #[arg(long)]
        save_state: Option<PathBuf>,
    },
}
