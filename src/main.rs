//! HyperPrism CLI - offline effect rendering
//!
//! Command-line interface for the HyperPrism effect processors.

use clap::Parser;
use env_logger::Env;
use log::info;

use hyperprism::cli::commands::{self, RenderOptions};
use hyperprism::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("HyperPrism v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("HyperPrism v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    let result = match cmd {
        Commands::List => commands::list(),
        Commands::Params { effect, json } => commands::params(&effect, json),
        Commands::Render {
            effect,
            input,
            output,
            set,
            state,
            config,
            block_size,
            no_latency_compensation,
            tail_ms,
            bits,
            save_state,
        } => {
            let options = RenderOptions {
                overrides: set,
                state,
                config,
                block_size,
                no_latency_compensation,
                tail_ms,
                bits,
                save_state,
            };
            commands::render(&effect, &input, &output, &options)
        }
    };

    result.map_err(|e| {
        eprintln!("hint: {}", e.recovery_hint());
        anyhow::Error::new(e)
    })
}
