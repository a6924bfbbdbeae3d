mod extractor;
mod observer;
mod replay;
mod script;

use anyhow::{Context, Result};
use clap::Parser;
use replay::ReplayOptions;
use script::ReplayScript;
use stackcut_core::EngineConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stackcut-replay")]
#[command(
    author,
    version,
    about = "Replay recorded timeline input against the arrangement engine",
    long_about = None
)]
struct Args {
    /// Script of clips and input events (JSON)
    script: PathBuf,

    /// Engine configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated extractor latency in milliseconds
    #[arg(long, default_value_t = 50)]
    extract_delay_ms: u64,

    /// Number of edits kept for undo
    #[arg(long, default_value_t = 100)]
    history: usize,

    /// Print the final clips compactly instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stackcut_core=info,stackcut_replay=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let script = ReplayScript::load(&args.script)?;
    tracing::info!("replaying {} steps from {}", script.steps.len(), args.script.display());

    let options = ReplayOptions {
        extract_delay: Duration::from_millis(args.extract_delay_ms),
        history_depth: args.history,
    };
    let snapshot = replay::run(script, config, options).await?;

    let json = if args.compact {
        serde_json::to_string(&snapshot)?
    } else {
        serde_json::to_string_pretty(&snapshot)?
    };
    println!("{json}");
    Ok(())
}
