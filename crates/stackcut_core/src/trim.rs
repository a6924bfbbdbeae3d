use crate::store::layer_spans;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrimEdge {
    Left,
    Right,
}

/// Positions a trim may not cross: the end of the previous clip and the
/// start of the next one on the same layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimBounds {
    pub prev_end: f64,
    pub next_start: f64,
}

impl TrimBounds {
    pub fn unbounded() -> Self {
        Self {
            prev_end: 0.0,
            next_start: f64::INFINITY,
        }
    }

    /// Neighbours of `clip` among `clips` on its layer.
    pub fn around<C: TimelineClip>(clips: &[C], clip: &C) -> Self {
        let span = clip.span();
        let mut bounds = Self::unbounded();
        for other in layer_spans(clips, span.layer, Some(clip.id())) {
            if other.end_time <= span.start_time + TIME_EPSILON {
                bounds.prev_end = bounds.prev_end.max(other.end_time);
            }
            if other.start_time >= span.end_time - TIME_EPSILON {
                bounds.next_start = bounds.next_start.min(other.start_time);
            }
        }
        bounds
    }
}

/// Drag the left handle by `dt` seconds.
///
/// The start moves within `[0, end - min_duration]` and the source start moves
/// by the same amount. Extending is limited by the source start reaching 0
/// and by the previous clip on the layer.
pub fn trim_left(span: &ClipSpan, dt: f64, min_duration: f64, bounds: TrimBounds) -> ClipSpan {
    let lower = (-span.start_time)
        .max(-span.source_start)
        .max(bounds.prev_end - span.start_time)
        .min(0.0);
    let upper = (span.duration() - min_duration)
        .min(span.source_len() - min_duration)
        .max(0.0);
    let delta = dt.max(lower).min(upper);

    let mut trimmed = span.clone();
    trimmed.start_time = span.start_time + delta;
    trimmed.source_start = (span.source_start + delta).max(0.0);
    trimmed
}

/// Drag the right handle by `dt` seconds.
///
/// Shrinking is allowed down to `min_duration`. Extending is capped by the
/// remaining source material and by the next clip on the layer.
pub fn trim_right(span: &ClipSpan, dt: f64, min_duration: f64, bounds: TrimBounds) -> ClipSpan {
    let proposed_end = (span.end_time + dt).max(span.start_time + min_duration);
    let mut delta = proposed_end - span.end_time;
    if delta > 0.0 {
        delta = delta
            .min(span.source_duration - span.source_end)
            .min(bounds.next_start - span.end_time)
            .max(0.0);
    } else {
        delta = delta.max(-(span.source_len() - min_duration).max(0.0));
    }

    let mut trimmed = span.clone();
    trimmed.end_time = span.end_time + delta;
    trimmed.source_end = span.source_end + delta;
    trimmed
}

pub fn trim(
    span: &ClipSpan,
    edge: TrimEdge,
    dt: f64,
    min_duration: f64,
    bounds: TrimBounds,
) -> ClipSpan {
    match edge {
        TrimEdge::Left => trim_left(span, dt, min_duration, bounds),
        TrimEdge::Right => trim_right(span, dt, min_duration, bounds),
    }
}
