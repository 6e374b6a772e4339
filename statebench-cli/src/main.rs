// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Statebench CLI
//!
//! Command-line host for the statebench measurement engine: runs built-in
//! workloads against several async state-management strategies and compares
//! them.

use clap::{Parser, Subcommand};

mod commands;
mod scenarios;
mod strategies;
mod workloads;

/// Statebench - compare async state-management strategies
#[derive(Parser)]
#[command(name = "statebench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "statebench.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured scenarios
    Run {
        /// Only run the scenario with this id
        #[arg(short, long)]
        scenario: Option<String>,

        /// Override the measured trial count for every scenario
        #[arg(short, long)]
        trials: Option<usize>,

        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },

    /// List built-in strategies and workloads
    Strategies,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            scenario,
            trials,
            json,
        } => commands::run::execute(&cli.config, scenario.as_deref(), trials, json).await,
        Commands::Validate { file } => commands::validate::execute(&file).await,
        Commands::Strategies => commands::strategies::execute().await,
    }
}
