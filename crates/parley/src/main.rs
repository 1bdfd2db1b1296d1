// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - a survey and reminder bot.
//!
//! This is the binary entry point.

mod app;
mod flows;
mod notifier;
mod router;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_config::model::ParleyConfig;
use parley_core::ParleyError;

/// Parley - a survey and reminder bot.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot: Telegram polling plus the reminder scheduler.
    Serve,
    /// Recompute the reminder queue from the stored settings and exit.
    RebuildQueue,
    /// Validate the configuration and exit.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> ParleyConfig {
    let result = match path {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    };
    match result {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::RebuildQueue) => serve::run_rebuild_queue(config).await,
        Some(Commands::CheckConfig) => {
            println!("parley: config is valid (bot.name={})", config.bot.name);
            Ok(())
        }
        None => {
            println!("parley: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("parley: {e}");
        std::process::exit(exit_code(&e));
    }
}

/// Broken flow registration exits with 2, any other failure with 1.
fn exit_code(err: &ParleyError) -> i32 {
    if err.is_registration_error() {
        2
    } else {
        1
    }
}
