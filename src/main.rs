use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use mmcdrive::{Drive, MediumPresence, ProbeConfig, ProbeState};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Probe an optical drive and print what it can write.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Device node of the drive, e.g. /dev/sr0
    device: PathBuf,

    /// Open the device exclusively
    #[arg(long)]
    exclusive: bool,

    /// Prevent medium removal after probing
    #[arg(long, conflicts_with = "unlock")]
    lock: bool,

    /// Allow medium removal after probing
    #[arg(long)]
    unlock: bool,

    /// Eject the medium after probing
    #[arg(long)]
    eject: bool,

    /// Log every submitted command
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = ProbeConfig {
        exclusive: args.exclusive,
        ..ProbeConfig::default()
    };
    let mut drive: Drive = Drive::new(&args.device, config);
    drive.reprobe()?;

    match drive.wait_probe().await {
        ProbeState::Done {
            name,
            capabilities,
            medium,
        } => {
            println!("drive:  {}", name.as_deref().unwrap_or("(unknown)"));
            println!("writes: {capabilities:?}");
            match medium {
                MediumPresence::Absent => println!("medium: none"),
                MediumPresence::Present { profile } => println!(
                    "medium: {}",
                    profile.name().unwrap_or("unknown profile")
                ),
            }
        }
        ProbeState::Failed(err) => return Err(eyre!("probing {} failed: {err}", args.device.display())),
        other => return Err(eyre!("probe ended in {other:?}")),
    }

    if args.lock {
        drive.lock()?;
        info!("medium removal prevented");
    }
    if args.unlock {
        drive.unlock()?;
        info!("medium removal allowed");
    }
    if args.eject {
        drive.eject()?;
        info!("ejected");
    }
    Ok(())
}
