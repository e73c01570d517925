//! cliptrack - forward clipboard changes until the clipboard goes idle.
//!
//! # Usage
//!
//! ```bash
//! # Append clipboard changes to ~/Downloads/resource-<timestamp>.txt
//! cliptrack
//!
//! # Append to a chosen file, stop after two idle minutes
//! cliptrack --path ~/notes --name clips.txt --idle 2m
//!
//! # Send changes to a Telegram chat
//! TELEGRAM_TOKEN=... TELEGRAM_CHAT_ID=... cliptrack --sink telegram
//!
//! # Show the resolved settings
//! cliptrack --print-config
//! ```

use anyhow::Result;
use clap::Parser;

use cliptrack_lib::cli::{execute, initialize, render_config, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let ctx = initialize(&args).await?;

    if args.print_config {
        println!("{}", render_config(&ctx)?);
        return Ok(());
    }

    let reason = execute(&ctx).await?;

    if args.verbose {
        eprintln!("[cli] Stopped: {}", reason);
    }

    Ok(())
}
