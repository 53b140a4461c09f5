//! Scripted interaction sessions.
//!
//! A script is a JSON array of steps, each tagged by `"step"`:
//!
//! ```json
//! [
//!   {"step": "search", "term": "AskScience"},
//!   {"step": "frames", "count": 120},
//!   {"step": "click_point", "name": "rust", "ctrl": true},
//!   {"step": "filter", "max_nsfw": 20.0, "hidden_prefix": "u_"}
//! ]
//! ```

use anyhow::{Context, Result};
use cloudmap::camera::MoveKey;
use cloudmap::color::ColorMode;
use cloudmap::selection::SelectMode;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Advance the clock without input.
    Frames { count: u32 },
    /// Press and release at a pixel.
    Click {
        x: f32,
        y: f32,
        #[serde(default)]
        ctrl: bool,
    },
    /// Click wherever the named point currently appears on screen.
    ClickPoint {
        name: String,
        #[serde(default)]
        ctrl: bool,
    },
    Drag { from: [f32; 2], to: [f32; 2] },
    Search {
        term: String,
        #[serde(default)]
        multi: bool,
    },
    Clear,
    Filter {
        max_nsfw: f32,
        #[serde(default)]
        hidden_prefix: Option<String>,
    },
    /// `null` switches back to automatic resolution.
    Resolution { value: Option<u32> },
    AutoTarget { enabled: bool },
    SelectMode { mode: SelectMode },
    KeyDown { key: MoveKey },
    KeyUp { key: MoveKey },
    ColorMode { mode: ColorMode },
    ClusterIndex { index: usize },
    /// Jump the camera back to its home pose.
    Home,
}

pub fn parse(json: &str) -> Result<Vec<Step>> {
    serde_json::from_str(json).context("invalid replay script")
}

pub fn load(path: &Path) -> Result<Vec<Step>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    parse(&json).with_context(|| format!("in {}", path.display()))
}
