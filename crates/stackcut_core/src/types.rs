use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest clip the engine will ever commit, in seconds.
pub const DEFAULT_MIN_DURATION: f64 = 0.1;

/// Tolerance for comparing timeline positions.
pub const TIME_EPSILON: f64 = 1e-9;

pub const MAX_VOLUME: f64 = 2.0;

// ---------------------------------------------------------------------------
// ClipKind
// ---------------------------------------------------------------------------

/// The two clip namespaces. Layers are numbered independently in each.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    Video,
    Audio,
}

// ---------------------------------------------------------------------------
// ClipSpan
// ---------------------------------------------------------------------------

/// Where a clip sits on the timeline and which part of its source it plays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipSpan {
    pub start_time: f64,
    pub end_time: f64,
    pub source_start: f64,
    pub source_end: f64,
    pub source_duration: f64,
    pub layer: u32,
}

impl ClipSpan {
    /// A span playing `source_start..source_end` starting at `start_time`.
    pub fn new(
        start_time: f64,
        source_start: f64,
        source_end: f64,
        source_duration: f64,
        layer: u32,
    ) -> Self {
        Self {
            start_time,
            end_time: start_time + (source_end - source_start),
            source_start,
            source_end,
            source_duration,
            layer,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn source_len(&self) -> f64 {
        self.source_end - self.source_start
    }

    /// Half-open overlap test against `[start, end)`, ignoring layers.
    pub fn overlaps_range(&self, start: f64, end: f64) -> bool {
        self.start_time < end - TIME_EPSILON && start < self.end_time - TIME_EPSILON
    }

    /// Same layer and intersecting time ranges.
    pub fn overlaps(&self, other: &ClipSpan) -> bool {
        self.layer == other.layer && self.overlaps_range(other.start_time, other.end_time)
    }

    /// True when `t` lies inside the open interval `(start_time, end_time)`.
    pub fn contains_strictly(&self, t: f64) -> bool {
        t > self.start_time + TIME_EPSILON && t < self.end_time - TIME_EPSILON
    }

    pub fn shift_by(&mut self, delta: f64) {
        self.start_time += delta;
        self.end_time += delta;
    }

    pub fn move_to(&mut self, start_time: f64) {
        let duration = self.duration();
        self.start_time = start_time;
        self.end_time = start_time + duration;
    }

    /// Describe the first broken per-clip invariant, if any.
    pub fn check(&self, min_duration: f64) -> Option<String> {
        let times = [
            ("start_time", self.start_time),
            ("end_time", self.end_time),
            ("source_start", self.source_start),
            ("source_end", self.source_end),
            ("source_duration", self.source_duration),
        ];
        if let Some((name, value)) = times.iter().find(|(_, v)| !v.is_finite()) {
            return Some(format!("{name} is not a finite time ({value})"));
        }
        if self.start_time < -TIME_EPSILON {
            return Some(format!("start_time {} is negative", self.start_time));
        }
        if self.duration() < min_duration - TIME_EPSILON {
            return Some(format!(
                "duration {:.6} is below the minimum {min_duration}",
                self.duration()
            ));
        }
        if self.source_start < -TIME_EPSILON {
            return Some(format!("source_start {} is negative", self.source_start));
        }
        if self.source_end <= self.source_start {
            return Some("source_end must be greater than source_start".into());
        }
        if self.source_end > self.source_duration + TIME_EPSILON {
            return Some(format!(
                "source_end {} exceeds source_duration {}",
                self.source_end, self.source_duration
            ));
        }
        None
    }
}

// ---------------------------------------------------------------------------
// MediaArray
// ---------------------------------------------------------------------------

/// A precomputed per-clip array (thumbnails, waveform peaks) produced by an
/// external extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", content = "items", rename_all = "snake_case")]
pub enum MediaArray<T> {
    /// Nothing extracted yet.
    Pending,
    /// A stand-in, e.g. one half of a split clip's array. Re-extract.
    Approximate(Vec<T>),
    /// Final extractor output.
    Ready(Vec<T>),
}

impl<T> Default for MediaArray<T> {
    fn default() -> Self {
        MediaArray::Pending
    }
}

impl<T: Clone> MediaArray<T> {
    pub fn items(&self) -> Option<&[T]> {
        match self {
            MediaArray::Pending => None,
            MediaArray::Approximate(items) | MediaArray::Ready(items) => Some(items),
        }
    }

    /// Whether an extractor result may still be written into this slot.
    pub fn needs_extraction(&self) -> bool {
        !matches!(self, MediaArray::Ready(_))
    }

    /// Partition at `floor(len * ratio)`. Both halves become approximations.
    pub fn split_at_ratio(&self, ratio: f64) -> (Self, Self) {
        match self.items() {
            None => (MediaArray::Pending, MediaArray::Pending),
            Some(items) => {
                let idx = ((items.len() as f64) * ratio.clamp(0.0, 1.0)).floor() as usize;
                let idx = idx.min(items.len());
                (
                    MediaArray::Approximate(items[..idx].to_vec()),
                    MediaArray::Approximate(items[idx..].to_vec()),
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TimelineClip
// ---------------------------------------------------------------------------

/// Behaviour shared by both clip kinds, so placement and editing code can be
/// written once per namespace.
pub trait TimelineClip: Clone {
    const KIND: ClipKind;

    fn id(&self) -> Uuid;
    fn span(&self) -> &ClipSpan;
    fn span_mut(&mut self) -> &mut ClipSpan;

    /// A deep copy carrying a fresh id.
    fn duplicate(&self) -> Self;

    /// Split this clip's metadata arrays at `ratio`, keeping the left part
    /// here and writing the right part into `right`.
    fn split_metadata(&mut self, right: &mut Self, ratio: f64);
}

fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        1.0
    } else {
        volume.clamp(0.0, MAX_VOLUME)
    }
}

// ---------------------------------------------------------------------------
// VideoClip
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoClip {
    pub id: Uuid,
    #[serde(flatten)]
    pub span: ClipSpan,
    /// False once the audio has been separated into its own AudioClip.
    pub has_audio: bool,
    #[serde(default)]
    pub thumbnails: MediaArray<String>,
    #[serde(default)]
    pub waveform: MediaArray<f32>,
    pub volume: f64,
}

impl VideoClip {
    pub fn new(span: ClipSpan) -> Self {
        Self {
            id: Uuid::new_v4(),
            span,
            has_audio: true,
            thumbnails: MediaArray::Pending,
            waveform: MediaArray::Pending,
            volume: 1.0,
        }
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = clamp_volume(volume);
    }
}

impl TimelineClip for VideoClip {
    const KIND: ClipKind = ClipKind::Video;

    fn id(&self) -> Uuid {
        self.id
    }

    fn span(&self) -> &ClipSpan {
        &self.span
    }

    fn span_mut(&mut self) -> &mut ClipSpan {
        &mut self.span
    }

    fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    fn split_metadata(&mut self, right: &mut Self, ratio: f64) {
        let (left_thumbs, right_thumbs) = self.thumbnails.split_at_ratio(ratio);
        let (left_wave, right_wave) = self.waveform.split_at_ratio(ratio);
        self.thumbnails = left_thumbs;
        self.waveform = left_wave;
        right.thumbnails = right_thumbs;
        right.waveform = right_wave;
    }
}

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioClip {
    pub id: Uuid,
    #[serde(flatten)]
    pub span: ClipSpan,
    /// The video clip this audio was separated from. Never owning: the video
    /// clip may be gone, in which case this is an independent track item.
    pub video_clip_id: Option<Uuid>,
    #[serde(default)]
    pub waveform: MediaArray<f32>,
    pub volume: f64,
}

impl AudioClip {
    pub fn new(span: ClipSpan) -> Self {
        Self {
            id: Uuid::new_v4(),
            span,
            video_clip_id: None,
            waveform: MediaArray::Pending,
            volume: 1.0,
        }
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = clamp_volume(volume);
    }
}

impl TimelineClip for AudioClip {
    const KIND: ClipKind = ClipKind::Audio;

    fn id(&self) -> Uuid {
        self.id
    }

    fn span(&self) -> &ClipSpan {
        &self.span
    }

    fn span_mut(&mut self) -> &mut ClipSpan {
        &mut self.span
    }

    fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    fn split_metadata(&mut self, right: &mut Self, ratio: f64) {
        let (left_wave, right_wave) = self.waveform.split_at_ratio(ratio);
        self.waveform = left_wave;
        right.waveform = right_wave;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_new_derives_end_from_source_range() {
        let span = ClipSpan::new(2.0, 1.0, 4.0, 10.0, 0);
        assert_eq!(span.end_time, 5.0);
        assert!((span.duration() - 3.0).abs() < 1e-9);
        assert!((span.source_len() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn adjacent_spans_dont_overlap() {
        let a = ClipSpan::new(0.0, 0.0, 5.0, 10.0, 0);
        let b = ClipSpan::new(5.0, 0.0, 5.0, 10.0, 0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn overlap_requires_same_layer() {
        let a = ClipSpan::new(0.0, 0.0, 5.0, 10.0, 0);
        let b = ClipSpan::new(2.0, 0.0, 5.0, 10.0, 1);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps_range(b.start_time, b.end_time));
    }

    #[test]
    fn contains_strictly_excludes_edges() {
        let span = ClipSpan::new(0.0, 0.0, 5.0, 10.0, 0);
        assert!(!span.contains_strictly(0.0));
        assert!(!span.contains_strictly(5.0));
        assert!(span.contains_strictly(2.5));
    }

    #[test]
    fn check_reports_broken_bounds() {
        let mut span = ClipSpan::new(0.0, 0.0, 5.0, 5.0, 0);
        assert!(span.check(DEFAULT_MIN_DURATION).is_none());

        span.source_end = 6.0;
        assert!(span.check(DEFAULT_MIN_DURATION).is_some());

        let short = ClipSpan::new(0.0, 0.0, 0.05, 5.0, 0);
        assert!(short.check(DEFAULT_MIN_DURATION).is_some());
    }

    #[test]
    fn check_rejects_non_finite_times() {
        let mut span = ClipSpan::new(0.0, 0.0, 5.0, 5.0, 0);
        span.start_time = f64::NAN;
        span.end_time = f64::NAN;
        assert!(span.check(DEFAULT_MIN_DURATION).unwrap().contains("start_time"));

        let mut span = ClipSpan::new(0.0, 0.0, 5.0, 5.0, 0);
        span.source_duration = f64::INFINITY;
        assert!(span.check(DEFAULT_MIN_DURATION).unwrap().contains("source_duration"));

        let mut span = ClipSpan::new(0.0, 0.0, 5.0, 5.0, 0);
        span.end_time = f64::INFINITY;
        assert!(span.check(DEFAULT_MIN_DURATION).is_some());
    }

    #[test]
    fn media_array_split_uses_floor() {
        let arr = MediaArray::Ready(vec![1, 2, 3, 4, 5]);
        let (left, right) = arr.split_at_ratio(0.5);
        assert_eq!(left, MediaArray::Approximate(vec![1, 2]));
        assert_eq!(right, MediaArray::Approximate(vec![3, 4, 5]));
        assert!(left.needs_extraction());
    }

    #[test]
    fn pending_media_array_splits_to_pending() {
        let arr: MediaArray<f32> = MediaArray::Pending;
        let (left, right) = arr.split_at_ratio(0.3);
        assert_eq!(left, MediaArray::Pending);
        assert_eq!(right, MediaArray::Pending);
    }

    #[test]
    fn volume_is_clamped() {
        let mut clip = VideoClip::new(ClipSpan::new(0.0, 0.0, 1.0, 1.0, 0));
        clip.set_volume(3.5);
        assert_eq!(clip.volume, MAX_VOLUME);
        clip.set_volume(-1.0);
        assert_eq!(clip.volume, 0.0);
    }

    #[test]
    fn duplicate_gets_fresh_id() {
        let clip = AudioClip::new(ClipSpan::new(0.0, 0.0, 1.0, 1.0, 0));
        let copy = clip.duplicate();
        assert_ne!(copy.id, clip.id);
        assert_eq!(copy.span, clip.span);
    }

    #[test]
    fn serde_roundtrip_video_clip() {
        let mut clip = VideoClip::new(ClipSpan::new(1.0, 0.0, 4.0, 8.0, 2));
        clip.thumbnails = MediaArray::Ready(vec!["a.jpg".into(), "b.jpg".into()]);
        let json = serde_json::to_string(&clip).unwrap();
        let back: VideoClip = serde_json::from_str(&json).unwrap();
        assert_eq!(clip, back);
    }
}
