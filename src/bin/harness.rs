//! Load balancing validation harness.
//!
//! Run examples:
//! # Upload 30 copies of test_image.png through the debug client
//! cargo run --bin harness -- stress
//!
//! # Upload 50 heavy synthetic images through the release client
//! cargo run --release --bin harness -- demo

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use lb_harness::config::{Profile, RunConfig, WorkloadSource};
use lb_harness::harness;
use lb_harness::interrupt::{watch_ctrl_c, Interrupt};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(version, about = "Validates load balancing of the distributed image service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload copies of a seed image and check every node takes a share
    Stress,
    /// Upload heavy high-entropy images and grade balance and reliability
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let profile = match cli.command {
        Commands::Stress => Profile::Stress,
        Commands::Demo => Profile::Demo,
    };
    let config = RunConfig::for_profile(profile);
    config.validate()?;

    if config.confirm_before_start {
        confirm(&config).await?;
    }

    let (trigger, interrupt) = Interrupt::new();
    let watcher = watch_ctrl_c(trigger);
    let result = harness::run(&config, &interrupt).await;
    watcher.abort();

    let outcome = result?;
    println!("{}", outcome.report(&config));
    println!("✓ Full output saved to: {}", config.log_path.display());
    Ok(())
}

/// Describes the run and waits for ENTER on stdin.
async fn confirm(config: &RunConfig) -> Result<()> {
    println!("This {} run will:", config.profile);
    match &config.source {
        WorkloadSource::Synthetic { min_dim, max_dim } => println!(
            "  1. Generate {} unique heavy images ({}x{} to {}x{})",
            config.num_uploads, min_dim, min_dim, max_dim, max_dim
        ),
        WorkloadSource::SeedCopy { seed } => println!(
            "  1. Copy {} {} times",
            seed.display(),
            config.num_uploads
        ),
    }
    println!("  2. Upload all images through '{}'", config.client_argv().join(" "));
    println!("  3. Report load distribution across the nodes");
    println!();
    println!("Press ENTER to start (or Ctrl+C to cancel)...");

    let mut line = String::new();
    let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    if read == 0 {
        bail!("No confirmation received on stdin, not starting");
    }
    Ok(())
}
