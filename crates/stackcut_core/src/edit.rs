use crate::config::EditModes;
use crate::error::{CoreError, Result};
use crate::placement::{close_gap, lowest_free_layer, resolve_collision, shift_after};
use crate::store::{ClipStore, RemovedClip, StoredClip};
use crate::trim::{trim, TrimBounds, TrimEdge};
use crate::types::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// EditOutcome
// ---------------------------------------------------------------------------

/// What a committed edit changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOutcome {
    pub video_changed: bool,
    pub audio_changed: bool,
    /// Ids of clips the edit created, in creation order.
    pub created: Vec<Uuid>,
    pub removed: Vec<Uuid>,
}

impl EditOutcome {
    pub fn is_noop(&self) -> bool {
        !self.video_changed && !self.audio_changed
    }

    /// Fold a later edit of the same commit into this one.
    pub fn absorb(&mut self, other: EditOutcome) {
        self.video_changed |= other.video_changed;
        self.audio_changed |= other.audio_changed;
        self.created.extend(other.created);
        self.removed.extend(other.removed);
    }

    fn mark(&mut self, kind: ClipKind) {
        match kind {
            ClipKind::Video => self.video_changed = true,
            ClipKind::Audio => self.audio_changed = true,
        }
    }
}

fn position_of<C: StoredClip>(store: &ClipStore, id: Uuid) -> Result<usize> {
    store
        .clips::<C>()
        .iter()
        .position(|c| c.id() == id)
        .ok_or(CoreError::ClipNotFound(id))
}

fn kind_of(store: &ClipStore, id: Uuid) -> Result<ClipKind> {
    store.kind_of(id).ok_or(CoreError::ClipNotFound(id))
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// Commit a move of `id` to `layer` near `desired_start`.
///
/// Collisions on the target layer are resolved through the gap search. With
/// magnet on, a clip that left its old range closes the gap behind it. With
/// link on, audio separated from a moved video clip follows by the same time
/// delta on its own layer.
pub fn move_clip(
    store: &mut ClipStore,
    id: Uuid,
    layer: u32,
    desired_start: f64,
    modes: EditModes,
) -> Result<EditOutcome> {
    let mut outcome = EditOutcome::default();
    match kind_of(store, id)? {
        ClipKind::Video => {
            let Some(delta) =
                move_in::<VideoClip>(store, id, layer, desired_start, modes.magnet)?
            else {
                return Ok(outcome);
            };
            outcome.mark(ClipKind::Video);
            if modes.link {
                let linked: Vec<(Uuid, u32, f64)> = store
                    .linked_audio(id)
                    .map(|a| (a.id, a.span.layer, a.span.start_time))
                    .collect();
                for (audio_id, audio_layer, audio_start) in linked {
                    let target = audio_start + delta;
                    let moved = move_in::<AudioClip>(store, audio_id, audio_layer, target, false)?;
                    if moved.is_some() {
                        outcome.mark(ClipKind::Audio);
                    }
                }
            }
        }
        ClipKind::Audio => {
            if move_in::<AudioClip>(store, id, layer, desired_start, modes.magnet)?.is_none() {
                return Ok(outcome);
            }
            outcome.mark(ClipKind::Audio);
        }
    }
    if let Some(span) = store.span(id) {
        info!("moved clip {id} to layer {} at {:.3}", span.layer, span.start_time);
    }
    Ok(outcome)
}

/// Returns the applied time delta, or `None` when the clip stayed put.
fn move_in<C: StoredClip>(
    store: &mut ClipStore,
    id: Uuid,
    layer: u32,
    desired_start: f64,
    magnet: bool,
) -> Result<Option<f64>> {
    let pos = position_of::<C>(store, id)?;
    let old = store.clips::<C>()[pos].span().clone();
    let start = resolve_collision(
        store.clips::<C>(),
        layer,
        desired_start,
        old.duration(),
        Some(id),
    );
    if layer == old.layer && (start - old.start_time).abs() < TIME_EPSILON {
        return Ok(None);
    }

    let clips = store.clips_mut::<C>();
    let span = clips[pos].span_mut();
    span.layer = layer;
    span.move_to(start);
    let moved_away = layer != old.layer || !span.overlaps_range(old.start_time, old.end_time);

    if magnet && moved_away {
        let shift = close_gap(clips, old.layer, old.start_time, old.duration());
        if shift > 0.0 {
            debug!("magnet closed {shift:.3}s on layer {}", old.layer);
        }
    }
    Ok(Some(clips[pos].span().start_time - old.start_time))
}

// ---------------------------------------------------------------------------
// Trim
// ---------------------------------------------------------------------------

/// Commit a trim of `id` by `dt` seconds on `edge`.
pub fn trim_clip(
    store: &mut ClipStore,
    id: Uuid,
    edge: TrimEdge,
    dt: f64,
    min_duration: f64,
) -> Result<EditOutcome> {
    let kind = kind_of(store, id)?;
    let changed = match kind {
        ClipKind::Video => trim_in::<VideoClip>(store, id, edge, dt, min_duration)?,
        ClipKind::Audio => trim_in::<AudioClip>(store, id, edge, dt, min_duration)?,
    };
    let mut outcome = EditOutcome::default();
    if changed {
        outcome.mark(kind);
        if let Some(span) = store.span(id) {
            info!(
                "trimmed clip {id} ({edge:?}) to [{:.3}, {:.3})",
                span.start_time, span.end_time
            );
        }
    }
    Ok(outcome)
}

fn trim_in<C: StoredClip>(
    store: &mut ClipStore,
    id: Uuid,
    edge: TrimEdge,
    dt: f64,
    min_duration: f64,
) -> Result<bool> {
    let pos = position_of::<C>(store, id)?;
    let clips = store.clips::<C>();
    let bounds = TrimBounds::around(clips, &clips[pos]);
    let old = clips[pos].span();
    let trimmed = trim(old, edge, dt, min_duration, bounds);
    if &trimmed == old {
        return Ok(false);
    }
    *store.clips_mut::<C>()[pos].span_mut() = trimmed;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

/// Split `id` at timeline time `t`.
///
/// Both halves get new ids and the original is removed. Splitting a video
/// clip also splits the audio separated from it at the same ratio and points
/// each audio half at the matching video half. A `t` outside the clip's open
/// interval, or one that would leave a half shorter than `min_duration`, is
/// a no-op.
pub fn split_clip(
    store: &mut ClipStore,
    id: Uuid,
    t: f64,
    min_duration: f64,
) -> Result<EditOutcome> {
    let mut outcome = EditOutcome::default();
    match kind_of(store, id)? {
        ClipKind::Video => {
            let Some((left, right, ratio)) = split_in::<VideoClip>(store, id, t, min_duration)?
            else {
                return Ok(outcome);
            };
            outcome.mark(ClipKind::Video);
            outcome.removed.push(id);
            outcome.created.extend([left, right]);

            let linked: Vec<(Uuid, f64)> = store
                .linked_audio(id)
                .map(|a| (a.id, a.span.start_time + ratio * a.span.duration()))
                .collect();
            for (audio_id, audio_t) in linked {
                outcome.mark(ClipKind::Audio);
                match split_in::<AudioClip>(store, audio_id, audio_t, min_duration)? {
                    Some((audio_left, audio_right, _)) => {
                        relink(store, audio_left, left);
                        relink(store, audio_right, right);
                        outcome.removed.push(audio_id);
                        outcome.created.extend([audio_left, audio_right]);
                    }
                    // Too short to split: it follows the half holding most of it.
                    None => relink(store, audio_id, if ratio >= 0.5 { left } else { right }),
                }
            }
        }
        ClipKind::Audio => {
            let Some((left, right, _)) = split_in::<AudioClip>(store, id, t, min_duration)? else {
                return Ok(outcome);
            };
            outcome.mark(ClipKind::Audio);
            outcome.removed.push(id);
            outcome.created.extend([left, right]);
        }
    }
    info!("split clip {id} at {t:.3}");
    Ok(outcome)
}

fn relink(store: &mut ClipStore, audio_id: Uuid, video_id: Uuid) {
    if let Some(audio) = store.audio_mut(audio_id) {
        audio.video_clip_id = Some(video_id);
    }
}

/// Returns `(left_id, right_id, ratio)` when the split happened.
fn split_in<C: StoredClip>(
    store: &mut ClipStore,
    id: Uuid,
    t: f64,
    min_duration: f64,
) -> Result<Option<(Uuid, Uuid, f64)>> {
    let pos = position_of::<C>(store, id)?;
    let clips = store.clips_mut::<C>();
    let span = clips[pos].span().clone();
    if !span.contains_strictly(t) {
        return Ok(None);
    }
    let floor = min_duration - TIME_EPSILON;
    if t - span.start_time < floor || span.end_time - t < floor {
        warn!("split of {id} at {t:.3} would leave a half shorter than {min_duration}s");
        return Ok(None);
    }

    let ratio = (t - span.start_time) / span.duration();
    let source_split = span.source_start + ratio * span.source_len();

    let original = clips.remove(pos);
    let mut left = original.duplicate();
    let mut right = original.duplicate();
    {
        let l = left.span_mut();
        l.end_time = t;
        l.source_end = source_split;
    }
    {
        let r = right.span_mut();
        r.start_time = t;
        r.source_start = source_split;
    }
    left.split_metadata(&mut right, ratio);

    let ids = (left.id(), right.id(), ratio);
    clips.insert(pos, right);
    clips.insert(pos, left);
    Ok(Some(ids))
}

// ---------------------------------------------------------------------------
// Ripple
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RippleSide {
    /// Remove `[start, playhead)`.
    Left,
    /// Remove `(playhead, end]`.
    Right,
}

/// Cut one side of `id` at the playhead and pull later clips on the same
/// layer left by the removed length.
pub fn ripple(
    store: &mut ClipStore,
    id: Uuid,
    side: RippleSide,
    playhead: f64,
    min_duration: f64,
) -> Result<EditOutcome> {
    let kind = kind_of(store, id)?;
    let changed = match kind {
        ClipKind::Video => ripple_in::<VideoClip>(store, id, side, playhead, min_duration)?,
        ClipKind::Audio => ripple_in::<AudioClip>(store, id, side, playhead, min_duration)?,
    };
    let mut outcome = EditOutcome::default();
    if changed {
        outcome.mark(kind);
        info!("ripple {side:?} on clip {id} at {playhead:.3}");
    }
    Ok(outcome)
}

pub fn ripple_left(
    store: &mut ClipStore,
    id: Uuid,
    playhead: f64,
    min_duration: f64,
) -> Result<EditOutcome> {
    ripple(store, id, RippleSide::Left, playhead, min_duration)
}

pub fn ripple_right(
    store: &mut ClipStore,
    id: Uuid,
    playhead: f64,
    min_duration: f64,
) -> Result<EditOutcome> {
    ripple(store, id, RippleSide::Right, playhead, min_duration)
}

fn ripple_in<C: StoredClip>(
    store: &mut ClipStore,
    id: Uuid,
    side: RippleSide,
    playhead: f64,
    min_duration: f64,
) -> Result<bool> {
    let pos = position_of::<C>(store, id)?;
    let clips = store.clips_mut::<C>();
    let old = clips[pos].span().clone();
    if !old.contains_strictly(playhead) {
        debug!("ripple skipped: playhead {playhead:.3} outside clip {id}");
        return Ok(false);
    }

    let (removed, remainder) = match side {
        RippleSide::Left => (playhead - old.start_time, old.end_time - playhead),
        RippleSide::Right => (old.end_time - playhead, playhead - old.start_time),
    };
    if remainder < min_duration - TIME_EPSILON {
        warn!("ripple on {id} rejected: {remainder:.3}s would remain, minimum is {min_duration}s");
        return Ok(false);
    }

    let span = clips[pos].span_mut();
    match side {
        RippleSide::Left => span.source_start += removed,
        RippleSide::Right => span.source_end -= removed,
    }
    span.end_time -= removed;
    shift_after(clips, old.layer, old.end_time, -removed);
    Ok(true)
}

/// Put back `delta` seconds of earlier source at the head of `id`, pushing
/// later clips on the layer right. Undoes a ripple-left of the same length.
/// The delta is limited by how much source precedes the clip.
pub fn ripple_extend_start(store: &mut ClipStore, id: Uuid, delta: f64) -> Result<EditOutcome> {
    let kind = kind_of(store, id)?;
    let changed = match kind {
        ClipKind::Video => extend_start_in::<VideoClip>(store, id, delta)?,
        ClipKind::Audio => extend_start_in::<AudioClip>(store, id, delta)?,
    };
    let mut outcome = EditOutcome::default();
    if changed {
        outcome.mark(kind);
        info!("extended start of clip {id} by {delta:.3}");
    }
    Ok(outcome)
}

fn extend_start_in<C: StoredClip>(store: &mut ClipStore, id: Uuid, delta: f64) -> Result<bool> {
    let pos = position_of::<C>(store, id)?;
    let clips = store.clips_mut::<C>();
    let old = clips[pos].span().clone();
    let delta = delta.min(old.source_start);
    if delta <= TIME_EPSILON {
        return Ok(false);
    }

    shift_after(clips, old.layer, old.end_time, delta);
    let span = clips[pos].span_mut();
    span.source_start -= delta;
    span.end_time += delta;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Delete every id in `ids`; unknown ids are skipped. Audio separated from a
/// deleted video clip stays as an independent clip.
pub fn delete_clips(store: &mut ClipStore, ids: &[Uuid], magnet: bool) -> EditOutcome {
    let mut outcome = EditOutcome::default();
    for &id in ids {
        let Ok(removed) = store.remove(id) else {
            debug!("delete skipped unknown clip {id}");
            continue;
        };
        outcome.mark(removed.kind());
        outcome.removed.push(id);
        if magnet {
            close_removed_gap(store, &removed);
        }
        info!("deleted clip {id}");
    }
    outcome
}

fn close_removed_gap(store: &mut ClipStore, removed: &RemovedClip) {
    let span = removed.span();
    let shift = match removed {
        RemovedClip::Video(_) => close_gap(
            store.clips_mut::<VideoClip>(),
            span.layer,
            span.start_time,
            span.duration(),
        ),
        RemovedClip::Audio(_) => close_gap(
            store.clips_mut::<AudioClip>(),
            span.layer,
            span.start_time,
            span.duration(),
        ),
    };
    if shift > 0.0 {
        debug!("magnet closed {shift:.3}s on {:?} layer {}", removed.kind(), span.layer);
    }
}

// ---------------------------------------------------------------------------
// Audio link / unlink / merge
// ---------------------------------------------------------------------------

/// Separate the embedded audio of `video_id` into its own clip on the lowest
/// audio layer free over the clip's range.
pub fn unlink_audio(store: &mut ClipStore, video_id: Uuid) -> Result<EditOutcome> {
    let video = store.video(video_id).ok_or(CoreError::ClipNotFound(video_id))?;
    if !video.has_audio {
        debug!("clip {video_id} has no embedded audio to unlink");
        return Ok(EditOutcome::default());
    }

    let layer = lowest_free_layer(store.audio_clips(), video.span.start_time, video.span.end_time);
    let mut audio = AudioClip::new(ClipSpan {
        layer,
        ..video.span.clone()
    });
    audio.video_clip_id = Some(video_id);
    audio.volume = video.volume;
    audio.waveform = video.waveform.clone();
    let audio_id = audio.id;

    store.insert_audio(audio)?;
    if let Some(video) = store.video_mut(video_id) {
        video.has_audio = false;
    }
    info!("unlinked audio {audio_id} from clip {video_id} onto audio layer {layer}");

    Ok(EditOutcome {
        video_changed: true,
        audio_changed: true,
        created: vec![audio_id],
        removed: Vec::new(),
    })
}

/// Fold each audio clip in `audio_ids` back into the video clip it was
/// separated from. Independent and orphaned audio is left alone.
pub fn merge_audio(store: &mut ClipStore, audio_ids: &[Uuid], magnet: bool) -> EditOutcome {
    let mut outcome = EditOutcome::default();
    for &audio_id in audio_ids {
        let Some(audio) = store.audio(audio_id) else {
            continue;
        };
        let Some(video_id) = audio.video_clip_id else {
            debug!("audio {audio_id} is independent, nothing to merge");
            continue;
        };
        if store.video(video_id).is_none() {
            debug!("audio {audio_id} is orphaned, nothing to merge");
            continue;
        }

        let Ok(removed) = store.remove(audio_id) else {
            continue;
        };
        let volume = match &removed {
            RemovedClip::Audio(audio) => audio.volume,
            RemovedClip::Video(video) => video.volume,
        };
        if let Some(video) = store.video_mut(video_id) {
            video.has_audio = true;
            video.volume = volume;
        }
        // Other pieces of the same separated audio become independent.
        for other in store.clips_mut::<AudioClip>() {
            if other.video_clip_id == Some(video_id) {
                other.video_clip_id = None;
            }
        }
        if magnet {
            close_removed_gap(store, &removed);
        }

        outcome.video_changed = true;
        outcome.audio_changed = true;
        outcome.removed.push(audio_id);
        info!("merged audio {audio_id} into clip {video_id}");
    }
    outcome
}

// ---------------------------------------------------------------------------
// Clipboard
// ---------------------------------------------------------------------------

/// A copied clip, held by value so later edits don't change it.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardEntry {
    Video(VideoClip),
    Audio(AudioClip),
}

impl ClipboardEntry {
    pub fn span(&self) -> &ClipSpan {
        match self {
            ClipboardEntry::Video(clip) => &clip.span,
            ClipboardEntry::Audio(clip) => &clip.span,
        }
    }
}

pub fn copy_clip(store: &ClipStore, id: Uuid) -> Option<ClipboardEntry> {
    store
        .video(id)
        .cloned()
        .map(ClipboardEntry::Video)
        .or_else(|| store.audio(id).cloned().map(ClipboardEntry::Audio))
}

/// Insert a copy of `entry` with a new id at the playhead. Video copied from
/// the base layer goes to layer 1; the collision search then picks the slot.
/// Pasted audio is always independent.
pub fn paste_clip(
    store: &mut ClipStore,
    entry: &ClipboardEntry,
    playhead: f64,
) -> Result<EditOutcome> {
    let mut outcome = EditOutcome::default();
    let id = match entry {
        ClipboardEntry::Video(clip) => {
            let mut copy = clip.duplicate();
            copy.span.layer = copy.span.layer.max(1);
            place(store.video_clips(), &mut copy, playhead);
            let id = copy.id;
            store.insert_video(copy)?;
            outcome.mark(ClipKind::Video);
            id
        }
        ClipboardEntry::Audio(clip) => {
            let mut copy = clip.duplicate();
            copy.video_clip_id = None;
            place(store.audio_clips(), &mut copy, playhead);
            let id = copy.id;
            store.insert_audio(copy)?;
            outcome.mark(ClipKind::Audio);
            id
        }
    };
    if let Some(span) = store.span(id) {
        info!("pasted clip {id} on layer {} at {:.3}", span.layer, span.start_time);
    }
    outcome.created.push(id);
    Ok(outcome)
}

fn place<C: TimelineClip>(clips: &[C], clip: &mut C, desired_start: f64) {
    let span = clip.span();
    let start = resolve_collision(clips, span.layer, desired_start, span.duration(), None);
    clip.span_mut().move_to(start);
}
