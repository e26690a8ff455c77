// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! commwait scenario runner CLI
//!
//! # Usage
//!
//! ```bash
//! # Wait for the first of two activities, 10 s timeout
//! commwait-sim --activity a:never --activity b:done@2.0 --timeout 10
//!
//! # Count completions by t=4
//! commwait-sim --activity a:done@1 --activity b:failed@6 --timeout 4 --mode all
//!
//! # Using a scenario file
//! commwait-sim --config scenario.toml
//! ```

use clap::{Parser, Subcommand};
use commwait::config::FOREVER_SECS;
use commwait_sim::{ActivityConfig, ScenarioConfig, WaitMode};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Wait-any scenario runner on simulated time
#[derive(Parser, Debug)]
#[command(name = "commwait-sim")]
#[command(about = "Run wait-any scenarios against simulated virtual time")]
#[command(version)]
struct Args {
    /// Scenario file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Activity as name:state@secs (state: done, failed, cancelled, never; can repeat)
    #[arg(short, long, conflicts_with = "config")]
    activity: Vec<ActivityConfig>,

    /// Timeout in seconds (negative waits forever)
    #[arg(short, long, default_value_t = FOREVER_SECS, allow_negative_numbers = true)]
    timeout: f64,

    /// Wait operation (any, all, test)
    #[arg(short, long, default_value = "any")]
    mode: WaitMode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example scenario file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "scenario.toml")]
        output: PathBuf,
    },

    /// Validate a scenario file
    Validate {
        /// Scenario file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = build_config(&args)?;
    let report = commwait_sim::run(&config)?;
    print!("{}", report);
    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<ScenarioConfig> {
    if let Some(ref path) = args.config {
        return Ok(ScenarioConfig::from_file(path)?);
    }

    if args.activity.is_empty() {
        anyhow::bail!("No activities given (use --activity name:state@secs or --config)");
    }

    let config = ScenarioConfig {
        name: "command-line".into(),
        mode: args.mode,
        timeout_secs: args.timeout,
        activities: args.activity.clone(),
        ..Default::default()
    };
    config.validate()?;
    Ok(config)
}

fn cmd_gen_config(output: PathBuf) -> anyhow::Result<()> {
    let toml_str = ScenarioConfig::example().to_toml()?;

    let content = format!(
        r#"# commwait scenario
# Generated by commwait-sim gen-config

{}"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated scenario file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    match ScenarioConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Scenario valid!");
            println!();
            println!("Scenario: {} (mode {})", config.name, config.mode);
            println!("Activities: {}", config.activities.len());
            for (i, activity) in config.activities.iter().enumerate() {
                println!(
                    "  [{}] {} -> {:?} at {}s",
                    i, activity.name, activity.state, activity.at_secs
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Scenario invalid: {}", e);
            std::process::exit(1);
        }
    }
}
