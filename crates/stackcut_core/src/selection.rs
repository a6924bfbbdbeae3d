use crate::coords::{CoordinateMapper, TrackLayout};
use crate::store::ClipStore;
use crate::types::{ClipKind, ClipSpan};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Selected clip ids in selection order. The last one is the primary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    ids: Vec<Uuid>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    /// Most recently selected clip.
    pub fn primary(&self) -> Option<Uuid> {
        self.ids.last().copied()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn add(&mut self, id: Uuid) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    pub fn remove(&mut self, id: Uuid) {
        self.ids.retain(|&x| x != id);
    }

    pub fn toggle(&mut self, id: Uuid) {
        if self.contains(id) {
            self.remove(id);
        } else {
            self.add(id);
        }
    }

    pub fn select_only(&mut self, id: Uuid) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Replace the selection, dropping duplicates but keeping order.
    pub fn set(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        self.ids.clear();
        for id in ids {
            self.add(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids the store no longer holds. Returns true if anything went.
    pub fn prune(&mut self, store: &ClipStore) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&id| store.contains(id));
        self.ids.len() != before
    }
}

// ---------------------------------------------------------------------------
// Marquee
// ---------------------------------------------------------------------------

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    /// The rectangle spanned by two corners, in any order.
    pub fn from_points(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            min_x: a.0.min(b.0),
            min_y: a.1.min(b.1),
            max_x: a.0.max(b.0),
            max_y: a.1.max(b.1),
        }
    }

    /// Strict overlap: touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

/// On-screen box of a clip.
pub fn clip_rect(
    span: &ClipSpan,
    kind: ClipKind,
    mapper: &CoordinateMapper,
    layout: &TrackLayout,
) -> Rect {
    let (top, bottom) = layout.layer_band(kind, span.layer);
    Rect {
        min_x: mapper.time_to_pixel(span.start_time),
        min_y: top,
        max_x: mapper.time_to_pixel(span.end_time),
        max_y: bottom,
    }
}

/// Every clip, video then audio, whose box intersects `rect`.
pub fn clips_intersecting_box(
    store: &ClipStore,
    rect: &Rect,
    mapper: &CoordinateMapper,
    layout: &TrackLayout,
) -> Vec<Uuid> {
    let video = store
        .video_clips()
        .iter()
        .filter(|c| clip_rect(&c.span, ClipKind::Video, mapper, layout).intersects(rect))
        .map(|c| c.id);
    let audio = store
        .audio_clips()
        .iter()
        .filter(|c| clip_rect(&c.span, ClipKind::Audio, mapper, layout).intersects(rect))
        .map(|c| c.id);
    video.chain(audio).collect()
}
