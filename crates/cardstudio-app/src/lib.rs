//! CardStudio application shell.
//!
//! Loads a deck, replays an optional editing script against it and reports
//! the result. The editor itself lives in `cardstudio-core`.

pub mod script;
pub mod shortcuts;

pub use script::{ScriptStep, parse_script, run_script};
pub use shortcuts::{Shortcut, ShortcutRegistry};

use cardstudio_core::{Editor, EditorConfig, EditorError, EditorResult, ManualClock};
use clap::Parser;
use std::path::PathBuf;

/// Command-line options.
#[derive(Debug, Clone, Default, PartialEq, Parser)]
#[command(
    name = "cardstudio",
    about = "Replay editing scripts against a card-news deck",
    version
)]
pub struct Options {
    /// Markup file to load.
    #[arg(required_unless_present = "shortcuts")]
    pub input: Option<PathBuf>,

    /// JSON array of editing steps to replay.
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Write the final markup here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long)]
    pub zoom: Option<f64>,

    /// Editor configuration (JSON).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the keyboard shortcuts.
    #[arg(long)]
    pub shortcuts: bool,
}

/// Outcome of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub markup: String,
    pub block_titles: Vec<String>,
    pub undo_depth: usize,
    pub redo_depth: usize,
}

impl Report {
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (index, title) in self.block_titles.iter().enumerate() {
            out.push_str(&format!("{:>3}. {}\n", index + 1, title));
        }
        out.push_str(&format!("history: {} undo, {} redo\n", self.undo_depth, self.redo_depth));
        out
    }
}

/// Load the deck, replay the script and collect the result.
pub fn run(options: &Options) -> EditorResult<Report> {
    let input = options
        .input
        .as_ref()
        .ok_or_else(|| EditorError::Config("missing markup file".to_string()))?;
    let config = match &options.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    let clock = ManualClock::new();
    let mut editor = Editor::new(config).with_clock(clock.clone());
    editor.load_markup(&std::fs::read_to_string(input)?)?;
    if let Some(zoom) = options.zoom {
        editor.set_zoom(zoom);
    }

    if let Some(path) = &options.script {
        let steps = parse_script(&std::fs::read_to_string(path)?)?;
        log::info!("Replaying {} steps from {}", steps.len(), path.display());
        run_script(&mut editor, &clock, &steps)?;
    }

    let report = Report {
        markup: editor.content(),
        block_titles: editor.blocks().iter().map(|b| b.display_title.clone()).collect(),
        undo_depth: editor.history().undo_len(),
        redo_depth: editor.history().redo_len(),
    };
    if let Some(out) = &options.out {
        std::fs::write(out, &report.markup)?;
        log::info!("Wrote {}", out.display());
    }
    Ok(report)
}
