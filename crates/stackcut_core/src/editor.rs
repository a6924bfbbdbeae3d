use crate::config::{EditModes, EngineConfig};
use crate::coords::{CoordinateMapper, TrackLayout};
use crate::edit::{self, ClipboardEntry, EditOutcome};
use crate::error::Result;
use crate::gesture::{
    hit_test, GestureContext, GestureState, Hit, InteractionController, Point, PointerDown,
    PointerMove, Release,
};
use crate::history::{EditCommand, HistoryHook, NoHistory};
use crate::metadata::{self, ExtractionRequest, MetadataUpdate};
use crate::placement::{collect_snap_points, snap_clip_start, LayerTracker};
use crate::selection::{clips_intersecting_box, Rect, Selection};
use crate::store::{ClipStore, StoreSnapshot};
use crate::trim::{trim, TrimBounds, TrimEdge};
use crate::types::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Collaborator contracts
// ---------------------------------------------------------------------------

/// Receives state the owning application displays. Collection callbacks fire
/// once per committed change to that collection.
pub trait EditorObserver {
    fn on_update_video_clips(&mut self, _clips: &[VideoClip]) {}
    fn on_update_audio_clips(&mut self, _clips: &[AudioClip]) {}
    fn on_seek(&mut self, _time: f64) {}
    fn on_selection_changed(&mut self, _ids: &[Uuid]) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoObserver;

impl EditorObserver for NoObserver {}

// ---------------------------------------------------------------------------
// Commands and keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditorCommand {
    Delete,
    Split,
    RippleLeft,
    RippleRight,
    Copy,
    Paste,
    Unlink,
    Merge,
    Undo,
    Redo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Delete,
    Backspace,
    Char(char),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    /// Ctrl, or Cmd on macOS.
    #[serde(default)]
    pub command: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            command: false,
            shift: false,
        }
    }

    pub fn with_command(key: Key) -> Self {
        Self {
            key,
            command: true,
            shift: false,
        }
    }

    /// The editor command bound to this key, if any.
    pub fn command_binding(&self) -> Option<EditorCommand> {
        match (self.key, self.command) {
            (Key::Delete | Key::Backspace, false) => Some(EditorCommand::Delete),
            (Key::Char(c), false) => match c.to_ascii_lowercase() {
                'e' => Some(EditorCommand::Split),
                'q' => Some(EditorCommand::RippleLeft),
                'w' => Some(EditorCommand::RippleRight),
                _ => None,
            },
            (Key::Char(c), true) => match c.to_ascii_lowercase() {
                'c' => Some(EditorCommand::Copy),
                'v' => Some(EditorCommand::Paste),
                'z' if self.shift => Some(EditorCommand::Redo),
                'z' => Some(EditorCommand::Undo),
                'y' => Some(EditorCommand::Redo),
                _ => None,
            },
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// Candidate result of the drag in flight. Never written to the store until
/// the pointer is released.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Move {
        id: Uuid,
        kind: ClipKind,
        layer: u32,
        start_time: f64,
        end_time: f64,
    },
    Trim {
        id: Uuid,
        kind: ClipKind,
        edge: TrimEdge,
        span: ClipSpan,
    },
    Marquee {
        rect: Rect,
    },
}

/// Per-drag data captured when a candidate turns into a drag.
#[derive(Debug, Clone)]
enum DragSession {
    Move {
        hit: Hit,
        original: ClipSpan,
        tracker: LayerTracker,
        max_layer: Option<u32>,
        snap_points: Vec<f64>,
    },
    Trim {
        hit: Hit,
        edge: TrimEdge,
        original: ClipSpan,
        bounds: TrimBounds,
    },
    Marquee {
        initial: Vec<Uuid>,
        additive: bool,
    },
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// The arrangement engine: owns the clips, the selection and the gesture in
/// flight, and turns pointer and keyboard input into committed edits.
pub struct Editor {
    config: EngineConfig,
    modes: EditModes,
    store: ClipStore,
    selection: Selection,
    mapper: CoordinateMapper,
    layout: TrackLayout,
    controller: InteractionController,
    drag: Option<DragSession>,
    preview: Option<Preview>,
    playhead: f64,
    clipboard: Option<ClipboardEntry>,
    observer: Box<dyn EditorObserver>,
    history: Box<dyn HistoryHook>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("modes", &self.modes)
            .field("store", &self.store)
            .field("selection", &self.selection)
            .field("state", self.controller.state())
            .field("playhead", &self.playhead)
            .finish_non_exhaustive()
    }
}

impl Editor {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let layout = TrackLayout {
            track_height: config.track_height_px,
            ..TrackLayout::default()
        };
        Ok(Self {
            modes: config.modes,
            mapper: CoordinateMapper::new(&config),
            controller: InteractionController::new(&config),
            layout,
            store: ClipStore::new(),
            selection: Selection::new(),
            drag: None,
            preview: None,
            playhead: 0.0,
            clipboard: None,
            observer: Box::new(NoObserver),
            history: Box::new(NoHistory),
            config,
        })
    }

    pub fn with_observer(mut self, observer: impl EditorObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn with_history(mut self, history: impl HistoryHook + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    pub fn with_layout(mut self, layout: TrackLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Replace all clips with an imported set. Rejects sets that break a
    /// store invariant.
    pub fn load(&mut self, video: Vec<VideoClip>, audio: Vec<AudioClip>) -> Result<()> {
        self.store = ClipStore::from_clips(video, audio, self.config.min_duration)?;
        info!(
            "loaded {} video and {} audio clips",
            self.store.video_clips().len(),
            self.store.audio_clips().len()
        );
        self.emit(&EditOutcome {
            video_changed: true,
            audio_changed: true,
            ..EditOutcome::default()
        });
        self.prune_selection();
        Ok(())
    }

    // ---- accessors ----

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ClipStore {
        &self.store
    }

    pub fn selection(&self) -> &[Uuid] {
        self.selection.ids()
    }

    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn layout(&self) -> &TrackLayout {
        &self.layout
    }

    pub fn gesture_state(&self) -> &GestureState {
        self.controller.state()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn clipboard(&self) -> Option<&ClipboardEntry> {
        self.clipboard.as_ref()
    }

    pub fn modes(&self) -> EditModes {
        self.modes
    }

    pub fn set_modes(&mut self, modes: EditModes) {
        self.modes = modes;
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    // ---- playhead and zoom ----

    pub fn seek(&mut self, time: f64) {
        self.playhead = time.max(0.0);
        self.observer.on_seek(self.playhead);
    }

    /// Zoom by whole steps; positive zooms in.
    pub fn zoom(&mut self, steps: i32) {
        self.mapper.zoom_by(self.config.zoom_step.powi(steps));
        debug!("zoom now {:.2} px/s", self.mapper.scale());
    }

    // ---- pointer input ----

    pub fn pointer_down(&mut self, at: Point, modifier: bool) {
        let hit = hit_test(
            &self.store,
            &self.mapper,
            &self.layout,
            at.x,
            at.y,
            self.config.handle_width_px,
        );
        if let PointerDown::Toggle(id) = self.controller.pointer_down(at, hit, modifier) {
            self.selection.toggle(id);
            self.notify_selection();
        }
    }

    pub fn pointer_move(&mut self, to: Point) {
        match self.controller.pointer_move(to) {
            PointerMove::Idle | PointerMove::Pending => {}
            PointerMove::Started => {
                self.begin_drag();
                self.refresh_preview();
            }
            PointerMove::Dragging => self.refresh_preview(),
        }
    }

    pub fn pointer_up(&mut self, at: Point) {
        let Some(release) = self.controller.pointer_up(at) else {
            return;
        };
        match release {
            Release::Click { target: None, at } => {
                self.seek(self.mapper.pixel_to_time(at.x));
                if !self.selection.is_empty() {
                    self.selection.clear();
                    self.notify_selection();
                }
            }
            Release::Click { target: Some(hit), .. } => {
                if self.selection.ids() != [hit.id] {
                    self.selection.select_only(hit.id);
                    self.notify_selection();
                }
            }
            Release::Commit { context, .. } => {
                self.update_preview(context);
                self.commit_preview(context);
            }
        }
        self.drag = None;
        self.preview = None;
    }

    /// Window lost focus: abort the gesture without touching the store.
    pub fn blur(&mut self) {
        if !self.controller.blur() {
            return;
        }
        if let Some(DragSession::Marquee { initial, .. }) = self.drag.take() {
            self.replace_selection(initial);
        }
        self.drag = None;
        self.preview = None;
    }

    fn begin_drag(&mut self) {
        let state = *self.controller.state();
        self.drag = match state {
            GestureState::Moving(hit) => self.store.span(hit.id).cloned().map(|original| {
                let snap_points = if self.modes.snap {
                    let exclude = Some(hit.id);
                    match hit.kind {
                        ClipKind::Video => {
                            collect_snap_points(self.store.video_clips(), exclude, self.playhead)
                        }
                        ClipKind::Audio => {
                            collect_snap_points(self.store.audio_clips(), exclude, self.playhead)
                        }
                    }
                } else {
                    Vec::new()
                };
                DragSession::Move {
                    hit,
                    tracker: LayerTracker::new(
                        original.layer,
                        self.config.track_height_px,
                        self.config.layer_hysteresis_px,
                    ),
                    max_layer: self.store.max_layer(hit.kind),
                    original,
                    snap_points,
                }
            }),
            GestureState::TrimmingLeft(hit) => self.trim_session(hit, TrimEdge::Left),
            GestureState::TrimmingRight(hit) => self.trim_session(hit, TrimEdge::Right),
            GestureState::MarqueeSelecting { additive } => Some(DragSession::Marquee {
                initial: self.selection.ids().to_vec(),
                additive,
            }),
            GestureState::Idle | GestureState::Candidate { .. } => None,
        };
    }

    fn trim_session(&self, hit: Hit, edge: TrimEdge) -> Option<DragSession> {
        let (original, bounds) = match hit.kind {
            ClipKind::Video => self
                .store
                .video(hit.id)
                .map(|c| (c.span.clone(), TrimBounds::around(self.store.video_clips(), c)))?,
            ClipKind::Audio => self
                .store
                .audio(hit.id)
                .map(|c| (c.span.clone(), TrimBounds::around(self.store.audio_clips(), c)))?,
        };
        Some(DragSession::Trim {
            hit,
            edge,
            original,
            bounds,
        })
    }

    fn refresh_preview(&mut self) {
        if let Some(context) = self.controller.context().copied() {
            self.update_preview(context);
        }
    }

    fn update_preview(&mut self, context: GestureContext) {
        let dt = self.mapper.pixels_to_duration(context.dx());
        let mut marquee_selection = None;
        let preview = match self.drag.as_mut() {
            None => None,
            Some(DragSession::Move {
                hit,
                original,
                tracker,
                max_layer,
                snap_points,
            }) => {
                let travel_up = context.dy() * TrackLayout::upward_sign(hit.kind);
                let layer = tracker.update(travel_up, *max_layer);
                let duration = original.duration();
                let mut start = (original.start_time + dt).max(0.0);
                if !snap_points.is_empty() {
                    let threshold = self.mapper.pixels_to_duration(self.config.snap_threshold_px);
                    start = snap_clip_start(start, duration, snap_points, threshold);
                }
                Some(Preview::Move {
                    id: hit.id,
                    kind: hit.kind,
                    layer,
                    start_time: start,
                    end_time: start + duration,
                })
            }
            Some(DragSession::Trim {
                hit,
                edge,
                original,
                bounds,
            }) => Some(Preview::Trim {
                id: hit.id,
                kind: hit.kind,
                edge: *edge,
                span: trim(original, *edge, dt, self.config.min_duration, *bounds),
            }),
            Some(DragSession::Marquee { initial, additive }) => {
                let rect = Rect::from_points(
                    (context.origin.x, context.origin.y),
                    (context.latest.x, context.latest.y),
                );
                let hits = clips_intersecting_box(&self.store, &rect, &self.mapper, &self.layout);
                let mut ids = if *additive { initial.clone() } else { Vec::new() };
                ids.extend(hits);
                marquee_selection = Some(ids);
                Some(Preview::Marquee { rect })
            }
        };
        debug!("preview: {preview:?}");
        self.preview = preview;
        if let Some(ids) = marquee_selection {
            self.replace_selection(ids);
        }
    }

    fn commit_preview(&mut self, context: GestureContext) {
        match self.preview.take() {
            Some(Preview::Move {
                id, layer, start_time, ..
            }) => {
                let modes = self.modes;
                self.commit("Move clip", |store| {
                    edit::move_clip(store, id, layer, start_time, modes)
                });
            }
            Some(Preview::Trim { id, edge, .. }) => {
                let dt = self.mapper.pixels_to_duration(context.dx());
                let min = self.config.min_duration;
                self.commit("Trim clip", |store| edit::trim_clip(store, id, edge, dt, min));
            }
            Some(Preview::Marquee { .. }) | None => {}
        }
    }

    // ---- keyboard and commands ----

    /// Run the command bound to `input`. Keys are ignored while a gesture is
    /// in flight.
    pub fn handle_key(&mut self, input: KeyInput) -> Option<EditorCommand> {
        let command = input.command_binding()?;
        if !self.controller.state().is_idle() {
            debug!("{command:?} ignored during a gesture");
            return None;
        }
        self.run(command);
        Some(command)
    }

    pub fn run(&mut self, command: EditorCommand) -> EditOutcome {
        match command {
            EditorCommand::Delete => self.delete_selected(),
            EditorCommand::Split => self.split_at_playhead(),
            EditorCommand::RippleLeft => self.ripple(edit::RippleSide::Left),
            EditorCommand::RippleRight => self.ripple(edit::RippleSide::Right),
            EditorCommand::Copy => {
                self.copy();
                EditOutcome::default()
            }
            EditorCommand::Paste => self.paste(),
            EditorCommand::Unlink => self.unlink_selected(),
            EditorCommand::Merge => self.merge_selected(),
            EditorCommand::Undo => {
                self.undo();
                EditOutcome::default()
            }
            EditorCommand::Redo => {
                self.redo();
                EditOutcome::default()
            }
        }
    }

    pub fn delete_selected(&mut self) -> EditOutcome {
        let ids = self.selection.ids().to_vec();
        if ids.is_empty() {
            return EditOutcome::default();
        }
        let magnet = self.modes.magnet;
        self.commit("Delete clips", |store| Ok(edit::delete_clips(store, &ids, magnet)))
    }

    /// Split every selected clip under the playhead, or the base-layer video
    /// clip under it when nothing is selected.
    pub fn split_at_playhead(&mut self) -> EditOutcome {
        let targets = self.playhead_targets();
        if targets.is_empty() {
            debug!("split: nothing under the playhead");
            return EditOutcome::default();
        }
        let (t, min) = (self.playhead, self.config.min_duration);
        self.commit("Split clip", |store| {
            let mut total = EditOutcome::default();
            for id in targets {
                // Linked audio may already have been split with its video.
                if store.contains(id) {
                    total.absorb(edit::split_clip(store, id, t, min)?);
                }
            }
            Ok(total)
        })
    }

    fn ripple(&mut self, side: edit::RippleSide) -> EditOutcome {
        let target = self.selection.primary().or_else(|| self.base_clip_under_playhead());
        let Some(id) = target else {
            return EditOutcome::default();
        };
        let (playhead, min) = (self.playhead, self.config.min_duration);
        self.commit("Ripple trim", |store| edit::ripple(store, id, side, playhead, min))
    }

    pub fn ripple_extend_start(&mut self, id: Uuid, delta: f64) -> EditOutcome {
        self.commit("Extend clip start", |store| edit::ripple_extend_start(store, id, delta))
    }

    pub fn copy(&mut self) {
        let Some(id) = self.selection.primary() else {
            return;
        };
        self.clipboard = edit::copy_clip(&self.store, id);
        if self.clipboard.is_some() {
            info!("copied clip {id}");
        }
    }

    pub fn paste(&mut self) -> EditOutcome {
        let Some(entry) = self.clipboard.clone() else {
            return EditOutcome::default();
        };
        let playhead = self.playhead;
        let outcome = self.commit("Paste clip", |store| edit::paste_clip(store, &entry, playhead));
        if let Some(&id) = outcome.created.first() {
            self.selection.select_only(id);
            self.notify_selection();
        }
        outcome
    }

    pub fn unlink_selected(&mut self) -> EditOutcome {
        let ids: Vec<Uuid> = self
            .selection
            .ids()
            .iter()
            .copied()
            .filter(|&id| self.store.video(id).is_some_and(|v| v.has_audio))
            .collect();
        if ids.is_empty() {
            return EditOutcome::default();
        }
        self.commit("Unlink audio", |store| {
            let mut total = EditOutcome::default();
            for id in ids {
                total.absorb(edit::unlink_audio(store, id)?);
            }
            Ok(total)
        })
    }

    pub fn merge_selected(&mut self) -> EditOutcome {
        let ids: Vec<Uuid> = self
            .selection
            .ids()
            .iter()
            .copied()
            .filter(|&id| self.store.audio(id).is_some())
            .collect();
        if ids.is_empty() {
            return EditOutcome::default();
        }
        let magnet = self.modes.magnet;
        self.commit("Merge audio", |store| Ok(edit::merge_audio(store, &ids, magnet)))
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                info!("undo");
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                info!("redo");
                true
            }
            None => false,
        }
    }

    // ---- selection ----

    pub fn select(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        let ids: Vec<Uuid> = ids.into_iter().filter(|&id| self.store.contains(id)).collect();
        self.replace_selection(ids);
    }

    fn replace_selection(&mut self, ids: Vec<Uuid>) {
        let mut next = Selection::new();
        next.set(ids);
        if next != self.selection {
            self.selection = next;
            self.notify_selection();
        }
    }

    fn prune_selection(&mut self) {
        if self.selection.prune(&self.store) {
            self.notify_selection();
        }
    }

    fn notify_selection(&mut self) {
        self.observer.on_selection_changed(self.selection.ids());
    }

    // ---- metadata ----

    /// Slots the extractor still has to fill.
    pub fn extraction_requests(&self) -> Vec<ExtractionRequest> {
        metadata::pending_requests(&self.store)
    }

    /// Write an extractor result if its clip still wants it. Returns whether
    /// it was applied.
    pub fn apply_metadata(&mut self, update: MetadataUpdate) -> bool {
        let Some(kind) = metadata::apply_update(&mut self.store, update) else {
            return false;
        };
        let mut outcome = EditOutcome::default();
        match kind {
            ClipKind::Video => outcome.video_changed = true,
            ClipKind::Audio => outcome.audio_changed = true,
        }
        self.emit(&outcome);
        true
    }

    // ---- commit plumbing ----

    fn playhead_targets(&self) -> Vec<Uuid> {
        if self.selection.is_empty() {
            return self.base_clip_under_playhead().into_iter().collect();
        }
        self.selection
            .ids()
            .iter()
            .copied()
            .filter(|&id| self.store.span(id).is_some_and(|s| s.contains_strictly(self.playhead)))
            .collect()
    }

    fn base_clip_under_playhead(&self) -> Option<Uuid> {
        self.store
            .video_clips()
            .iter()
            .find(|c| c.span.layer == 0 && c.span.contains_strictly(self.playhead))
            .map(|c| c.id)
    }

    /// Apply an edit, then announce it, record it and re-validate the
    /// selection. Failed edits leave the store as it was.
    fn commit<F>(&mut self, description: &str, edit: F) -> EditOutcome
    where
        F: FnOnce(&mut ClipStore) -> Result<EditOutcome>,
    {
        let before = self.store.snapshot();
        let outcome = match edit(&mut self.store) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("{description} failed: {err}");
                self.store.restore(before);
                return EditOutcome::default();
            }
        };
        if outcome.is_noop() {
            return outcome;
        }
        if cfg!(debug_assertions) {
            if let Err(err) = self.store.validate(self.config.min_duration) {
                warn!("{description} rolled back: {err}");
                self.store.restore(before);
                return EditOutcome::default();
            }
        }

        self.history
            .record(EditCommand::new(description, before, self.store.snapshot()));
        self.emit(&outcome);
        self.prune_selection();
        outcome
    }

    fn restore(&mut self, snapshot: StoreSnapshot) {
        let outcome = EditOutcome {
            video_changed: self.store.video_clips() != snapshot.video.as_slice(),
            audio_changed: self.store.audio_clips() != snapshot.audio.as_slice(),
            ..EditOutcome::default()
        };
        self.store.restore(snapshot);
        self.emit(&outcome);
        self.prune_selection();
    }

    fn emit(&mut self, outcome: &EditOutcome) {
        if outcome.video_changed {
            self.observer.on_update_video_clips(self.store.video_clips());
        }
        if outcome.audio_changed {
            self.observer.on_update_audio_clips(self.store.audio_clips());
        }
    }
}
