use crate::config::EngineConfig;
use crate::types::ClipKind;
use serde::{Deserialize, Serialize};

/// Tick intervals the ruler may use, in seconds.
pub const TICK_LADDER: [f64; 10] = [1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0];

// ---------------------------------------------------------------------------
// CoordinateMapper
// ---------------------------------------------------------------------------

/// Converts between timeline seconds and horizontal pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMapper {
    scale: f64,
    min_scale: f64,
    max_scale: f64,
    min_tick_spacing_px: f64,
    min_label_spacing_px: f64,
}

impl CoordinateMapper {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            scale: config.initial_scale.clamp(config.min_scale, config.max_scale),
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            min_tick_spacing_px: config.min_tick_spacing_px,
            min_label_spacing_px: config.min_label_spacing_px,
        }
    }

    /// Pixels per second.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn time_to_pixel(&self, t: f64) -> f64 {
        t * self.scale
    }

    pub fn pixel_to_time(&self, x: f64) -> f64 {
        x / self.scale
    }

    /// Convert a horizontal pixel distance into seconds.
    pub fn pixels_to_duration(&self, dx: f64) -> f64 {
        dx / self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() {
            self.scale = scale.clamp(self.min_scale, self.max_scale);
        }
    }

    /// Multiplicative zoom; factors above 1 zoom in.
    pub fn zoom_by(&mut self, factor: f64) {
        if factor > 0.0 {
            self.set_scale(self.scale * factor);
        }
    }

    /// Smallest ladder interval whose on-screen width is at least the
    /// minimum tick spacing.
    pub fn tick_interval(&self) -> f64 {
        TICK_LADDER
            .iter()
            .copied()
            .find(|interval| interval * self.scale >= self.min_tick_spacing_px)
            .unwrap_or(TICK_LADDER[TICK_LADDER.len() - 1])
    }

    /// Smallest multiple of the tick interval wide enough to hold a label.
    pub fn label_interval(&self) -> f64 {
        let tick = self.tick_interval();
        let multiple = (self.min_label_spacing_px / (tick * self.scale)).ceil().max(1.0);
        tick * multiple
    }

    /// Ticks covering `[visible_start, visible_end]`.
    pub fn ruler(&self, visible_start: f64, visible_end: f64) -> Vec<RulerTick> {
        let tick = self.tick_interval();
        let label = self.label_interval();
        let label_every = (label / tick).round().max(1.0) as i64;

        let first = (visible_start.max(0.0) / tick).ceil() as i64;
        let last = (visible_end / tick).floor() as i64;
        (first..=last)
            .map(|i| {
                let time = i as f64 * tick;
                let labelled = i % label_every == 0;
                RulerTick {
                    time,
                    x: self.time_to_pixel(time),
                    label: labelled.then(|| format_timecode(time)),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RulerTick {
    pub time: f64,
    pub x: f64,
    /// Set on ticks that carry a label.
    pub label: Option<String>,
}

/// `m:ss`, or `h:mm:ss` past the hour.
pub fn format_timecode(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

// ---------------------------------------------------------------------------
// TrackLayout
// ---------------------------------------------------------------------------

/// Vertical placement of layers. Video layer 0 sits directly above
/// `video_baseline` and higher layers stack upward; audio layer 0 starts at
/// `audio_top` and higher layers stack downward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrackLayout {
    pub track_height: f64,
    pub video_baseline: f64,
    pub audio_top: f64,
}

impl TrackLayout {
    pub fn new(track_height: f64, video_baseline: f64, audio_top: f64) -> Self {
        Self {
            track_height,
            video_baseline,
            audio_top,
        }
    }

    /// `(top, bottom)` pixel rows of a layer.
    pub fn layer_band(&self, kind: ClipKind, layer: u32) -> (f64, f64) {
        let h = self.track_height;
        let l = layer as f64;
        match kind {
            ClipKind::Video => (
                self.video_baseline - (l + 1.0) * h,
                self.video_baseline - l * h,
            ),
            ClipKind::Audio => (self.audio_top + l * h, self.audio_top + (l + 1.0) * h),
        }
    }

    /// Namespace and layer under a y coordinate. Rows between the video
    /// baseline and the audio area belong to neither.
    pub fn layer_at(&self, y: f64) -> Option<(ClipKind, u32)> {
        if y < self.video_baseline {
            let layer = ((self.video_baseline - y) / self.track_height).floor();
            return Some((ClipKind::Video, layer as u32));
        }
        if y >= self.audio_top {
            let layer = ((y - self.audio_top) / self.track_height).floor();
            return Some((ClipKind::Audio, layer as u32));
        }
        None
    }

    /// Sign that turns a screen-space dy into travel toward higher layers.
    pub fn upward_sign(kind: ClipKind) -> f64 {
        match kind {
            ClipKind::Video => -1.0,
            ClipKind::Audio => 1.0,
        }
    }
}

impl Default for TrackLayout {
    fn default() -> Self {
        Self::new(60.0, 360.0, 380.0)
    }
}
