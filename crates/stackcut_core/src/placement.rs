use crate::store::layer_spans;
use crate::types::*;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Sticky layer switching
// ---------------------------------------------------------------------------

/// Tracks which layer a dragged clip should land on.
///
/// Layer boundaries sit at whole multiples of the track height from where the
/// drag started. Crossing a boundary away from the current layer needs the
/// pointer to travel `hysteresis` past it; coming back needs it to retreat
/// `hysteresis` short of it. A pointer hovering near a boundary therefore
/// never flips layers back and forth.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerTracker {
    origin_layer: u32,
    offset: i64,
    track_height: f64,
    hysteresis: f64,
}

impl LayerTracker {
    pub fn new(origin_layer: u32, track_height: f64, hysteresis: f64) -> Self {
        Self {
            origin_layer,
            offset: 0,
            track_height,
            hysteresis,
        }
    }

    pub fn origin_layer(&self) -> u32 {
        self.origin_layer
    }

    /// Feed the cumulative travel toward higher layers (pixels) and get the
    /// candidate layer. `max_layer` is the highest occupied layer in the
    /// namespace; the candidate never goes past one above it. Crossing out
    /// of a band is inclusive and crossing back is strict, so the walk
    /// terminates even with zero hysteresis.
    pub fn update(&mut self, travel_up: f64, max_layer: Option<u32>) -> u32 {
        let h = self.track_height;
        loop {
            let up_boundary = (self.offset + 1) as f64 * h;
            let down_boundary = (self.offset - 1) as f64 * h;
            if self.offset >= 0 && travel_up >= up_boundary + self.hysteresis {
                self.offset += 1;
            } else if self.offset <= 0 && travel_up <= down_boundary - self.hysteresis {
                self.offset -= 1;
            } else if self.offset > 0 && travel_up < self.offset as f64 * h - self.hysteresis {
                self.offset -= 1;
            } else if self.offset < 0 && travel_up > self.offset as f64 * h + self.hysteresis {
                self.offset += 1;
            } else {
                break;
            }
        }
        self.layer(max_layer)
    }

    /// Current candidate layer without feeding new travel.
    pub fn layer(&self, max_layer: Option<u32>) -> u32 {
        let ceiling = max_layer
            .map(|m| m as i64 + 1)
            .unwrap_or(0)
            .max(self.origin_layer as i64);
        (self.origin_layer as i64 + self.offset).clamp(0, ceiling) as u32
    }
}

// ---------------------------------------------------------------------------
// Collision avoidance
// ---------------------------------------------------------------------------

/// Find a start time for a clip of `duration` on `layer` near
/// `desired_start`.
///
/// When the desired range is free it is returned as is. Otherwise the gaps
/// are tried in order: before the first clip, between consecutive clips, and
/// after the last clip; inside the chosen gap the clip sits as close to
/// `desired_start` as the gap allows.
pub fn resolve_collision<C: TimelineClip>(
    clips: &[C],
    layer: u32,
    desired_start: f64,
    duration: f64,
    exclude: Option<Uuid>,
) -> f64 {
    let desired_start = desired_start.max(0.0);
    let spans = layer_spans(clips, layer, exclude);
    let desired_end = desired_start + duration;
    if !spans
        .iter()
        .any(|s| s.overlaps_range(desired_start, desired_end))
    {
        return desired_start;
    }

    let fits = |gap_start: f64, gap_end: f64| gap_end - gap_start >= duration - TIME_EPSILON;
    // A gap accepted within tolerance can be a hair shorter than `duration`.
    let place = |gap_start: f64, gap_end: f64| {
        let latest = (gap_end - duration).max(gap_start);
        desired_start.clamp(gap_start, latest)
    };

    let first = spans[0];
    if fits(0.0, first.start_time) {
        return place(0.0, first.start_time);
    }

    for pair in spans.windows(2) {
        let (gap_start, gap_end) = (pair[0].end_time, pair[1].start_time);
        if fits(gap_start, gap_end) {
            return place(gap_start, gap_end);
        }
    }

    spans
        .iter()
        .map(|s| s.end_time)
        .fold(0.0, f64::max)
}

/// Lowest layer whose `[start, end)` range is free.
pub fn lowest_free_layer<C: TimelineClip>(clips: &[C], start: f64, end: f64) -> u32 {
    let mut layer = 0;
    while clips
        .iter()
        .any(|c| c.span().layer == layer && c.span().overlaps_range(start, end))
    {
        layer += 1;
    }
    layer
}

// ---------------------------------------------------------------------------
// Shifting and magnet condensing
// ---------------------------------------------------------------------------

/// Shift every clip on `layer` starting at or after `from` by `delta`.
/// Returns how many clips moved.
pub fn shift_after<C: TimelineClip>(clips: &mut [C], layer: u32, from: f64, delta: f64) -> usize {
    let mut moved = 0;
    for clip in clips.iter_mut() {
        let span = clip.span_mut();
        if span.layer == layer && span.start_time >= from - TIME_EPSILON {
            span.shift_by(delta);
            moved += 1;
        }
    }
    moved
}

/// Close the gap left by a clip that used to occupy `[gap_start, gap_start +
/// gap_len)` on `layer` by pulling later clips left. The shift never exceeds
/// the empty space between the later clips and whatever still sits before
/// `gap_start`. Returns the applied shift.
pub fn close_gap<C: TimelineClip>(
    clips: &mut [C],
    layer: u32,
    gap_start: f64,
    gap_len: f64,
) -> f64 {
    let tail_start = clips
        .iter()
        .map(|c| c.span())
        .filter(|s| s.layer == layer && s.start_time >= gap_start - TIME_EPSILON)
        .map(|s| s.start_time)
        .fold(f64::INFINITY, f64::min);
    if !tail_start.is_finite() {
        return 0.0;
    }

    let floor = clips
        .iter()
        .map(|c| c.span())
        .filter(|s| s.layer == layer && s.start_time < gap_start - TIME_EPSILON)
        .map(|s| s.end_time)
        .fold(0.0, f64::max);

    let shift = gap_len.min(tail_start - floor).max(0.0);
    if shift > TIME_EPSILON {
        shift_after(clips, layer, gap_start, -shift);
        shift
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Snapping
// ---------------------------------------------------------------------------

/// Find the nearest snap point within the threshold.
/// Returns the snapped position if within threshold, otherwise `None`.
pub fn find_snap_point(position: f64, snap_points: &[f64], threshold: f64) -> Option<f64> {
    snap_points
        .iter()
        .copied()
        .map(|p| (p, (position - p).abs()))
        .filter(|(_, dist)| *dist <= threshold)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(p, _)| p)
}

/// Collect snap points from one namespace (clip edges), plus zero and the
/// playhead.
pub fn collect_snap_points<C: TimelineClip>(
    clips: &[C],
    exclude: Option<Uuid>,
    playhead: f64,
) -> Vec<f64> {
    let mut points = vec![0.0, playhead];
    for clip in clips {
        if Some(clip.id()) == exclude {
            continue;
        }
        points.push(clip.span().start_time);
        points.push(clip.span().end_time);
    }
    points.sort_by(f64::total_cmp);
    points.dedup_by(|a, b| (*a - *b).abs() < TIME_EPSILON);
    points
}

/// Snap a clip of `duration` starting at `start`: whichever edge lands
/// closer to a snap point wins.
pub fn snap_clip_start(start: f64, duration: f64, snap_points: &[f64], threshold: f64) -> f64 {
    let by_start = find_snap_point(start, snap_points, threshold).map(|p| (p, (p - start).abs()));
    let by_end = find_snap_point(start + duration, snap_points, threshold)
        .map(|p| (p - duration, (p - (start + duration)).abs()));
    let snapped = match (by_start, by_end) {
        (Some(a), Some(b)) => {
            if a.1 <= b.1 {
                a.0
            } else {
                b.0
            }
        }
        (Some(a), None) => a.0,
        (None, Some(b)) => b.0,
        (None, None) => start,
    };
    snapped.max(0.0)
}
