use crate::error::{CoreError, Result};
use crate::types::DEFAULT_MIN_DURATION;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// EditModes
// ---------------------------------------------------------------------------

/// User-facing toggles that change how edits are placed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditModes {
    /// Close the gap a clip leaves behind when it is deleted, moved away or
    /// merged.
    pub magnet: bool,
    /// Snap dragged clip edges to nearby edges and the playhead.
    pub snap: bool,
    /// Move separated audio together with its video clip.
    pub link: bool,
}

impl Default for EditModes {
    fn default() -> Self {
        Self {
            magnet: false,
            snap: true,
            link: true,
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub min_duration: f64,
    /// Pixels per second bounds and starting value.
    pub min_scale: f64,
    pub max_scale: f64,
    pub initial_scale: f64,
    /// Multiplier applied per zoom step.
    pub zoom_step: f64,
    pub track_height_px: f64,
    pub layer_hysteresis_px: f64,
    pub background_drag_threshold_px: f64,
    pub clip_drag_threshold_px: f64,
    pub handle_width_px: f64,
    pub snap_threshold_px: f64,
    pub min_tick_spacing_px: f64,
    pub min_label_spacing_px: f64,
    pub modes: EditModes,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            min_scale: 5.0,
            max_scale: 500.0,
            initial_scale: 50.0,
            zoom_step: 1.25,
            track_height_px: 60.0,
            layer_hysteresis_px: 20.0,
            background_drag_threshold_px: 15.0,
            clip_drag_threshold_px: 5.0,
            handle_width_px: 8.0,
            snap_threshold_px: 10.0,
            min_tick_spacing_px: 8.0,
            min_label_spacing_px: 60.0,
            modes: EditModes::default(),
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("min_duration", self.min_duration),
            ("min_scale", self.min_scale),
            ("zoom_step", self.zoom_step),
            ("track_height_px", self.track_height_px),
            ("min_tick_spacing_px", self.min_tick_spacing_px),
            ("min_label_spacing_px", self.min_label_spacing_px),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        let non_negative = [
            ("layer_hysteresis_px", self.layer_hysteresis_px),
            ("background_drag_threshold_px", self.background_drag_threshold_px),
            ("clip_drag_threshold_px", self.clip_drag_threshold_px),
            ("handle_width_px", self.handle_width_px),
            ("snap_threshold_px", self.snap_threshold_px),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }

        if self.max_scale < self.min_scale {
            return Err(CoreError::InvalidConfig(format!(
                "max_scale {} is below min_scale {}",
                self.max_scale, self.min_scale
            )));
        }
        if self.layer_hysteresis_px >= self.track_height_px {
            return Err(CoreError::InvalidConfig(
                "layer_hysteresis_px must be smaller than track_height_px".into(),
            ));
        }
        Ok(())
    }

    /// Save as pretty-printed JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON. Missing fields take their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }
}
