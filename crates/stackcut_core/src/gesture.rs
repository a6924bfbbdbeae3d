use crate::config::EngineConfig;
use crate::coords::{CoordinateMapper, TrackLayout};
use crate::store::ClipStore;
use crate::types::{ClipKind, TimelineClip};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// A pointer position in timeline pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// ---------------------------------------------------------------------------
// Hit testing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitZone {
    LeftHandle,
    Body,
    RightHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub id: Uuid,
    pub kind: ClipKind,
    pub zone: HitZone,
}

/// The clip under `(x, y)` and which part of it was hit. Handles are
/// `handle_px` wide but never more than a third of the clip, so narrow
/// clips keep a grabbable body.
pub fn hit_test(
    store: &ClipStore,
    mapper: &CoordinateMapper,
    layout: &TrackLayout,
    x: f64,
    y: f64,
    handle_px: f64,
) -> Option<Hit> {
    let (kind, layer) = layout.layer_at(y)?;
    let found = match kind {
        ClipKind::Video => hit_in(store.video_clips(), layer, x, mapper, handle_px),
        ClipKind::Audio => hit_in(store.audio_clips(), layer, x, mapper, handle_px),
    };
    found.map(|(id, zone)| Hit { id, kind, zone })
}

fn hit_in<C: TimelineClip>(
    clips: &[C],
    layer: u32,
    x: f64,
    mapper: &CoordinateMapper,
    handle_px: f64,
) -> Option<(Uuid, HitZone)> {
    clips
        .iter()
        .filter(|c| c.span().layer == layer)
        .find_map(|clip| {
            let x0 = mapper.time_to_pixel(clip.span().start_time);
            let x1 = mapper.time_to_pixel(clip.span().end_time);
            if x < x0 || x >= x1 {
                return None;
            }
            let handle = handle_px.min((x1 - x0) / 3.0);
            let zone = if x < x0 + handle {
                HitZone::LeftHandle
            } else if x >= x1 - handle {
                HitZone::RightHandle
            } else {
                HitZone::Body
            };
            Some((clip.id(), zone))
        })
}

// ---------------------------------------------------------------------------
// Gesture context
// ---------------------------------------------------------------------------

/// Where the gesture started, where the pointer is now and how far it has
/// travelled along its path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureContext {
    pub origin: Point,
    pub latest: Point,
    pub travelled: f64,
}

impl GestureContext {
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            latest: origin,
            travelled: 0.0,
        }
    }

    pub fn advance(&mut self, to: Point) {
        self.travelled += self.latest.distance(to);
        self.latest = to;
    }

    pub fn dx(&self) -> f64 {
        self.latest.x - self.origin.x
    }

    pub fn dy(&self) -> f64 {
        self.latest.y - self.origin.y
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    /// Pointer is down but has not travelled far enough to be a drag.
    Candidate {
        target: Option<Hit>,
        additive: bool,
    },
    Moving(Hit),
    TrimmingLeft(Hit),
    TrimmingRight(Hit),
    MarqueeSelecting {
        additive: bool,
    },
}

impl GestureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, GestureState::Idle)
    }

    /// True once a candidate has turned into a drag.
    pub fn is_dragging(&self) -> bool {
        !matches!(self, GestureState::Idle | GestureState::Candidate { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerDown {
    /// A gesture is already in flight.
    Ignored,
    /// Modifier-click on a clip: flip its selection, no drag.
    Toggle(Uuid),
    Armed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMove {
    Idle,
    Pending,
    /// The candidate just committed to a drag.
    Started,
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Release {
    /// Pointer went up without leaving the candidate state.
    Click { target: Option<Hit>, at: Point },
    /// A drag finished; `gesture` is the state it ended in.
    Commit {
        gesture: GestureState,
        context: GestureContext,
    },
}

/// Turns raw pointer events into gestures. Owns the gesture context and
/// updates it synchronously on every event.
#[derive(Debug, Clone)]
pub struct InteractionController {
    state: GestureState,
    context: GestureContext,
    background_threshold: f64,
    clip_threshold: f64,
}

impl InteractionController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: GestureState::Idle,
            context: GestureContext::new(Point::default()),
            background_threshold: config.background_drag_threshold_px,
            clip_threshold: config.clip_drag_threshold_px,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Context of the gesture in flight, if any.
    pub fn context(&self) -> Option<&GestureContext> {
        (!self.state.is_idle()).then_some(&self.context)
    }

    pub fn pointer_down(&mut self, at: Point, target: Option<Hit>, modifier: bool) -> PointerDown {
        if !self.state.is_idle() {
            debug!("pointer down ignored, gesture already active");
            return PointerDown::Ignored;
        }
        if let (Some(hit), true) = (target, modifier) {
            return PointerDown::Toggle(hit.id);
        }
        self.context = GestureContext::new(at);
        self.state = GestureState::Candidate {
            target,
            additive: modifier,
        };
        debug!("candidate gesture at ({:.1}, {:.1}) on {:?}", at.x, at.y, target.map(|h| h.id));
        PointerDown::Armed
    }

    pub fn pointer_move(&mut self, to: Point) -> PointerMove {
        if self.state.is_idle() {
            return PointerMove::Idle;
        }
        self.context.advance(to);

        let GestureState::Candidate { target, additive } = self.state else {
            return PointerMove::Dragging;
        };
        let threshold = if target.is_some() {
            self.clip_threshold
        } else {
            self.background_threshold
        };
        if self.context.travelled <= threshold {
            return PointerMove::Pending;
        }

        self.state = match target {
            None => GestureState::MarqueeSelecting { additive },
            Some(hit) => match hit.zone {
                HitZone::Body => GestureState::Moving(hit),
                HitZone::LeftHandle => GestureState::TrimmingLeft(hit),
                HitZone::RightHandle => GestureState::TrimmingRight(hit),
            },
        };
        debug!("gesture started: {:?}", self.state);
        PointerMove::Started
    }

    /// Finish the gesture. The release position is applied first so the
    /// result reflects where the pointer actually ended.
    pub fn pointer_up(&mut self, at: Point) -> Option<Release> {
        if self.state.is_idle() {
            return None;
        }
        self.context.advance(at);
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        let release = match state {
            GestureState::Candidate { target, .. } => Release::Click { target, at },
            gesture => Release::Commit {
                gesture,
                context: self.context,
            },
        };
        debug!("gesture released: {release:?}");
        Some(release)
    }

    /// Window lost focus: drop whatever was in flight. Returns true if a
    /// gesture was aborted.
    pub fn blur(&mut self) -> bool {
        if self.state.is_idle() {
            return false;
        }
        debug!("gesture aborted: {:?}", self.state);
        self.state = GestureState::Idle;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClipSpan, VideoClip};

    fn controller() -> InteractionController {
        InteractionController::new(&EngineConfig::default())
    }

    fn hit(zone: HitZone) -> Hit {
        Hit {
            id: Uuid::new_v4(),
            kind: ClipKind::Video,
            zone,
        }
    }

    // -----------------------------------------------------------------------
    // hit_test
    // -----------------------------------------------------------------------

    fn scene() -> (ClipStore, CoordinateMapper, TrackLayout, Uuid, Uuid) {
        let mapper = CoordinateMapper::new(&EngineConfig::default()); // 50 px/s
        let layout = TrackLayout::new(60.0, 300.0, 320.0);
        let mut store = ClipStore::new();
        let wide = VideoClip::new(ClipSpan::new(0.0, 0.0, 4.0, 4.0, 0)); // 0..200 px
        let narrow = VideoClip::new(ClipSpan::new(5.0, 0.0, 0.3, 0.3, 0)); // 250..265 px
        let ids = (wide.id, narrow.id);
        store.insert_video(wide).unwrap();
        store.insert_video(narrow).unwrap();
        (store, mapper, layout, ids.0, ids.1)
    }

    #[test]
    fn hit_zones_on_wide_clip() {
        let (store, mapper, layout, wide, _) = scene();
        let at = |x| hit_test(&store, &mapper, &layout, x, 270.0, 8.0);
        assert_eq!(at(3.0).map(|h| h.zone), Some(HitZone::LeftHandle));
        assert_eq!(at(100.0).map(|h| h.zone), Some(HitZone::Body));
        assert_eq!(at(195.0).map(|h| h.zone), Some(HitZone::RightHandle));
        assert_eq!(at(100.0).map(|h| h.id), Some(wide));
        assert_eq!(at(220.0), None);
    }

    #[test]
    fn narrow_clip_keeps_a_body() {
        let (store, mapper, layout, _, narrow) = scene();
        // 15px wide: handles shrink to 5px each.
        let h = hit_test(&store, &mapper, &layout, 257.0, 270.0, 8.0).unwrap();
        assert_eq!((h.id, h.zone), (narrow, HitZone::Body));
        let h = hit_test(&store, &mapper, &layout, 251.0, 270.0, 8.0).unwrap();
        assert_eq!(h.zone, HitZone::LeftHandle);
    }

    #[test]
    fn miss_outside_tracks_and_layers() {
        let (store, mapper, layout, _, _) = scene();
        assert_eq!(hit_test(&store, &mapper, &layout, 100.0, 310.0, 8.0), None);
        assert_eq!(hit_test(&store, &mapper, &layout, 100.0, 200.0, 8.0), None);
        assert_eq!(hit_test(&store, &mapper, &layout, 100.0, 350.0, 8.0), None);
    }

    // -----------------------------------------------------------------------
    // click vs drag
    // -----------------------------------------------------------------------

    #[test]
    fn background_click_below_threshold() {
        let mut c = controller();
        assert_eq!(c.pointer_down(Point::new(100.0, 50.0), None, false), PointerDown::Armed);
        assert_eq!(c.pointer_move(Point::new(110.0, 50.0)), PointerMove::Pending);
        let release = c.pointer_up(Point::new(112.0, 50.0)).unwrap();
        assert_eq!(
            release,
            Release::Click {
                target: None,
                at: Point::new(112.0, 50.0)
            }
        );
        assert!(c.state().is_idle());
    }

    #[test]
    fn background_drag_becomes_marquee() {
        let mut c = controller();
        c.pointer_down(Point::new(100.0, 50.0), None, true);
        assert_eq!(c.pointer_move(Point::new(116.0, 50.0)), PointerMove::Started);
        assert_eq!(*c.state(), GestureState::MarqueeSelecting { additive: true });
        assert_eq!(c.pointer_move(Point::new(130.0, 60.0)), PointerMove::Dragging);
    }

    #[test]
    fn clip_threshold_is_smaller() {
        let mut c = controller();
        let body = hit(HitZone::Body);
        c.pointer_down(Point::new(0.0, 0.0), Some(body), false);
        assert_eq!(c.pointer_move(Point::new(4.0, 0.0)), PointerMove::Pending);
        assert_eq!(c.pointer_move(Point::new(6.0, 0.0)), PointerMove::Started);
        assert_eq!(*c.state(), GestureState::Moving(body));
    }

    #[test]
    fn travel_is_cumulative_path_length() {
        let mut c = controller();
        c.pointer_down(Point::new(0.0, 0.0), Some(hit(HitZone::RightHandle)), false);
        // Back and forth: net displacement zero, path 6px.
        c.pointer_move(Point::new(3.0, 0.0));
        assert_eq!(c.pointer_move(Point::new(0.0, 0.0)), PointerMove::Started);
        assert!(matches!(c.state(), GestureState::TrimmingRight(_)));
    }

    #[test]
    fn release_applies_final_position() {
        let mut c = controller();
        c.pointer_down(Point::new(0.0, 0.0), Some(hit(HitZone::LeftHandle)), false);
        c.pointer_move(Point::new(20.0, 0.0));
        let Some(Release::Commit { gesture, context }) = c.pointer_up(Point::new(75.0, 3.0)) else {
            panic!("expected a commit");
        };
        assert!(matches!(gesture, GestureState::TrimmingLeft(_)));
        assert_eq!(context.latest, Point::new(75.0, 3.0));
        assert_eq!(context.dx(), 75.0);
    }

    // -----------------------------------------------------------------------
    // guards
    // -----------------------------------------------------------------------

    #[test]
    fn second_pointer_down_is_ignored() {
        let mut c = controller();
        c.pointer_down(Point::new(0.0, 0.0), None, false);
        assert_eq!(
            c.pointer_down(Point::new(50.0, 0.0), Some(hit(HitZone::Body)), false),
            PointerDown::Ignored
        );
        assert_eq!(c.context().unwrap().origin, Point::new(0.0, 0.0));
    }

    #[test]
    fn modifier_click_toggles_without_arming() {
        let mut c = controller();
        let body = hit(HitZone::Body);
        assert_eq!(
            c.pointer_down(Point::new(0.0, 0.0), Some(body), true),
            PointerDown::Toggle(body.id)
        );
        assert!(c.state().is_idle());
        assert_eq!(c.pointer_move(Point::new(100.0, 0.0)), PointerMove::Idle);
        assert_eq!(c.pointer_up(Point::new(100.0, 0.0)), None);
    }

    #[test]
    fn blur_aborts_drag() {
        let mut c = controller();
        c.pointer_down(Point::new(0.0, 0.0), Some(hit(HitZone::Body)), false);
        c.pointer_move(Point::new(40.0, 0.0));
        assert!(c.blur());
        assert!(c.state().is_idle());
        assert_eq!(c.pointer_up(Point::new(40.0, 0.0)), None);
        assert!(!c.blur());
    }
}
