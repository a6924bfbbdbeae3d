use crate::store::ClipStore;
use crate::types::{ClipKind, MediaArray};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    Thumbnails,
    Waveform,
}

/// Work the extractor should do for one clip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionRequest {
    pub clip_id: Uuid,
    pub kind: MetadataKind,
    pub source_start: f64,
    pub source_end: f64,
}

/// A finished extraction, delivered some time after it was requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataUpdate {
    Thumbnails { clip_id: Uuid, items: Vec<String> },
    Waveform { clip_id: Uuid, peaks: Vec<f32> },
}

impl MetadataUpdate {
    pub fn clip_id(&self) -> Uuid {
        match self {
            MetadataUpdate::Thumbnails { clip_id, .. }
            | MetadataUpdate::Waveform { clip_id, .. } => *clip_id,
        }
    }

    pub fn kind(&self) -> MetadataKind {
        match self {
            MetadataUpdate::Thumbnails { .. } => MetadataKind::Thumbnails,
            MetadataUpdate::Waveform { .. } => MetadataKind::Waveform,
        }
    }
}

/// Every slot still waiting for extractor output. Video waveforms are only
/// requested while the audio is embedded.
pub fn pending_requests(store: &ClipStore) -> Vec<ExtractionRequest> {
    let mut requests = Vec::new();
    let mut push = |clip_id: Uuid, kind: MetadataKind, start: f64, end: f64| {
        requests.push(ExtractionRequest {
            clip_id,
            kind,
            source_start: start,
            source_end: end,
        })
    };
    for clip in store.video_clips() {
        let (start, end) = (clip.span.source_start, clip.span.source_end);
        if clip.thumbnails.needs_extraction() {
            push(clip.id, MetadataKind::Thumbnails, start, end);
        }
        if clip.has_audio && clip.waveform.needs_extraction() {
            push(clip.id, MetadataKind::Waveform, start, end);
        }
    }
    for clip in store.audio_clips() {
        if clip.waveform.needs_extraction() {
            push(clip.id, MetadataKind::Waveform, clip.span.source_start, clip.span.source_end);
        }
    }
    requests
}

/// Write an extractor result, but only into a clip that still exists and
/// whose slot has no final data. Returns the namespace that changed.
pub fn apply_update(store: &mut ClipStore, update: MetadataUpdate) -> Option<ClipKind> {
    let clip_id = update.clip_id();
    let kind = update.kind();
    let written = match (store.kind_of(clip_id), update) {
        (Some(ClipKind::Video), MetadataUpdate::Thumbnails { items, .. }) => {
            store.video_mut(clip_id).and_then(|clip| fill(&mut clip.thumbnails, items))
        }
        (Some(ClipKind::Video), MetadataUpdate::Waveform { peaks, .. }) => {
            store.video_mut(clip_id).and_then(|clip| fill(&mut clip.waveform, peaks))
        }
        (Some(ClipKind::Audio), MetadataUpdate::Waveform { peaks, .. }) => {
            store.audio_mut(clip_id).and_then(|clip| fill(&mut clip.waveform, peaks))
        }
        (Some(ClipKind::Audio), MetadataUpdate::Thumbnails { .. }) | (None, _) => None,
    };
    let changed = written.and(store.kind_of(clip_id));
    if changed.is_none() {
        warn!("discarded {kind:?} result for clip {clip_id}");
    }
    changed
}

fn fill<T>(slot: &mut MediaArray<T>, items: Vec<T>) -> Option<()>
where
    T: Clone,
{
    if !slot.needs_extraction() {
        return None;
    }
    *slot = MediaArray::Ready(items);
    Some(())
}
