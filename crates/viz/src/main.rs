mod script;
mod session;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use viz_canvas::{Canvas, CanvasEditor};
use viz_config::VizConfig;
use viz_history::config::MAX_ENTRIES_ENV;
use viz_history::HistoryConfig;

use crate::session::Replay;

/// Replays a canvas edit script with undo/redo history.
#[derive(Parser, Debug)]
#[command(name = "viz", version, about)]
struct Cli {
    /// Edit script to replay.
    script: PathBuf,

    /// Config file. Defaults to `viz.json` next to the executable.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of undo snapshots to keep. Overrides the environment and config file.
    #[arg(long = "max-history")]
    max_history: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(VizConfig::config_path);
    let config = VizConfig::load_or_create(&config_path);
    let history_config = resolve_history_config(cli.max_history, &config);
    tracing::info!(
        "Starting viz with {}x{} canvas, {} history entries",
        config.canvas_width,
        config.canvas_height,
        history_config.max_entries
    );

    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("Failed to read script {}", cli.script.display()))?;
    let lines = script::parse_script(&source)
        .with_context(|| format!("Failed to parse {}", cli.script.display()))?;

    let editor = CanvasEditor::new(Canvas::from_config(&config), history_config);
    let mut replay = Replay::new(editor, config.default_fill);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    replay.run(&lines, &mut out)?;
    writeln!(out, "final:")?;
    replay.write_status(&mut out)?;
    Ok(())
}

/// Flag, then `VIZ_HISTORY_MAX_ENTRIES`, then the config file.
fn resolve_history_config(flag: Option<usize>, config: &VizConfig) -> HistoryConfig {
    if let Some(n) = flag {
        return HistoryConfig::with_max_entries(n);
    }
    if std::env::var_os(MAX_ENTRIES_ENV).is_some() {
        return HistoryConfig::from_env();
    }
    HistoryConfig::with_max_entries(config.max_history_entries)
}
