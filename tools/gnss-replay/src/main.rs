//! Replays recorded satellite status updates through the GNSS plugin.
//!
//! Run with: cargo run -p gnss-replay -- recording.json

mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use geoguard_gnss::{CHANNEL_NAME, GnssPlugin, METHOD_SNAPSHOT, MethodCall, MethodResponse};
use owo_colors::OwoColorize;

use crate::replay::{ReplayBackend, parse_recording};

#[derive(Parser)]
#[command(name = "gnss-replay")]
#[command(about = "Replay satellite status recordings through the GNSS plugin", long_about = None)]
struct Cli {
    /// JSON recording: an array of updates, each an array of satellites
    recording: PathBuf,

    /// Attach as if the platform had no satellite status callbacks
    #[arg(long)]
    unsupported: bool,

    /// Refuse callback registration as if location permission were missing
    #[arg(long)]
    deny_permission: bool,

    /// Method to call after each update
    #[arg(long, default_value = METHOD_SNAPSHOT)]
    method: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let json = std::fs::read_to_string(&cli.recording)
        .with_context(|| format!("Failed to read {}", cli.recording.display()))?;
    let updates = parse_recording(&json)?;

    println!(
        "{}",
        format!("🛰  Replaying {} updates on {CHANNEL_NAME}", updates.len())
            .green()
            .bold()
    );

    let backend = Arc::new(ReplayBackend::new(cli.deny_permission));
    let plugin = GnssPlugin::attach(&!cli.unsupported, backend.clone());
    println!("Registration: {:?}", plugin.registration());

    let call = MethodCall::new(cli.method);
    print_response(0, &plugin.handle_method_call(&call))?;

    for (index, satellites) in updates.iter().enumerate() {
        if !backend.emit(satellites) {
            println!(
                "{}",
                format!("update {}: no delegate registered, dropped", index + 1).yellow()
            );
        }
        print_response(index + 1, &plugin.handle_method_call(&call))?;
    }

    plugin.detach();
    println!("{}", "✅ Replay finished.".green().bold());
    Ok(())
}

fn print_response(update: usize, response: &MethodResponse) -> Result<()> {
    let json = response.to_json()?;
    match response {
        MethodResponse::Success(_) => println!("[{update:>4}] {json}"),
        MethodResponse::NotImplemented => println!("[{update:>4}] {}", json.red()),
    }
    Ok(())
}
