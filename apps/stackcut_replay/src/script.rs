use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use stackcut_core::{AudioClip, EditModes, EditorCommand, KeyInput, VideoClip};
use std::path::Path;

/// A recorded editing session: the clips to start from and the input to
/// feed the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    pub video: Vec<VideoClip>,
    #[serde(default)]
    pub audio: Vec<AudioClip>,
    #[serde(default)]
    pub modes: Option<EditModes>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        modifier: bool,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
    },
    Blur,
    Key(KeyInput),
    Seek {
        time: f64,
    },
    Command {
        command: EditorCommand,
    },
    Zoom {
        steps: i32,
    },
    Modes(EditModes),
    /// Block until every extraction in flight has been delivered.
    WaitExtraction,
}

impl ReplayScript {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid replay script")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json)
    }
}
