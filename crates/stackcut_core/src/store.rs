use crate::error::{CoreError, Result};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// StoreSnapshot
// ---------------------------------------------------------------------------

/// A deep copy of both clip collections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreSnapshot {
    pub video: Vec<VideoClip>,
    pub audio: Vec<AudioClip>,
}

// ---------------------------------------------------------------------------
// RemovedClip
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RemovedClip {
    Video(VideoClip),
    Audio(AudioClip),
}

impl RemovedClip {
    pub fn span(&self) -> &ClipSpan {
        match self {
            RemovedClip::Video(clip) => &clip.span,
            RemovedClip::Audio(clip) => &clip.span,
        }
    }

    pub fn kind(&self) -> ClipKind {
        match self {
            RemovedClip::Video(_) => ClipKind::Video,
            RemovedClip::Audio(_) => ClipKind::Audio,
        }
    }
}

// ---------------------------------------------------------------------------
// ClipStore
// ---------------------------------------------------------------------------

/// The authoritative clip collections. Video and audio layers are separate
/// namespaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipStore {
    video: Vec<VideoClip>,
    audio: Vec<AudioClip>,
}

/// Gives generic code access to the collection a clip type lives in.
pub trait StoredClip: TimelineClip {
    fn collection(store: &ClipStore) -> &Vec<Self>;
    fn collection_mut(store: &mut ClipStore) -> &mut Vec<Self>;
}

impl StoredClip for VideoClip {
    fn collection(store: &ClipStore) -> &Vec<Self> {
        &store.video
    }

    fn collection_mut(store: &mut ClipStore) -> &mut Vec<Self> {
        &mut store.video
    }
}

impl StoredClip for AudioClip {
    fn collection(store: &ClipStore) -> &Vec<Self> {
        &store.audio
    }

    fn collection_mut(store: &mut ClipStore) -> &mut Vec<Self> {
        &mut store.audio
    }
}

impl ClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from imported clips, rejecting any broken invariant.
    pub fn from_clips(
        video: Vec<VideoClip>,
        audio: Vec<AudioClip>,
        min_duration: f64,
    ) -> Result<Self> {
        let store = Self { video, audio };
        store.validate(min_duration)?;
        Ok(store)
    }

    pub fn video_clips(&self) -> &[VideoClip] {
        &self.video
    }

    pub fn audio_clips(&self) -> &[AudioClip] {
        &self.audio
    }

    pub fn clips<C: StoredClip>(&self) -> &[C] {
        C::collection(self)
    }

    pub(crate) fn clips_mut<C: StoredClip>(&mut self) -> &mut Vec<C> {
        C::collection_mut(self)
    }

    pub fn get<C: StoredClip>(&self, id: Uuid) -> Option<&C> {
        C::collection(self).iter().find(|c| c.id() == id)
    }

    pub fn get_mut<C: StoredClip>(&mut self, id: Uuid) -> Option<&mut C> {
        C::collection_mut(self).iter_mut().find(|c| c.id() == id)
    }

    pub fn video(&self, id: Uuid) -> Option<&VideoClip> {
        self.get(id)
    }

    pub fn audio(&self, id: Uuid) -> Option<&AudioClip> {
        self.get(id)
    }

    pub fn video_mut(&mut self, id: Uuid) -> Option<&mut VideoClip> {
        self.get_mut(id)
    }

    pub fn audio_mut(&mut self, id: Uuid) -> Option<&mut AudioClip> {
        self.get_mut(id)
    }

    pub fn kind_of(&self, id: Uuid) -> Option<ClipKind> {
        if self.video(id).is_some() {
            Some(ClipKind::Video)
        } else if self.audio(id).is_some() {
            Some(ClipKind::Audio)
        } else {
            None
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.kind_of(id).is_some()
    }

    pub fn span(&self, id: Uuid) -> Option<&ClipSpan> {
        self.video(id)
            .map(|c| &c.span)
            .or_else(|| self.audio(id).map(|c| &c.span))
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }

    /// Add a video clip. Returns error if it would overlap a clip on its layer.
    pub fn insert_video(&mut self, clip: VideoClip) -> Result<()> {
        self.insert(clip)
    }

    /// Add an audio clip. Returns error if it would overlap a clip on its layer.
    pub fn insert_audio(&mut self, clip: AudioClip) -> Result<()> {
        self.insert(clip)
    }

    fn insert<C: StoredClip>(&mut self, clip: C) -> Result<()> {
        if self.contains(clip.id()) {
            return Err(CoreError::DuplicateClip(clip.id()));
        }
        if let Some(existing) = find_overlap(self.clips::<C>(), clip.span(), None) {
            return Err(CoreError::OverlapDetected {
                layer: clip.span().layer,
                a: existing,
                b: clip.id(),
            });
        }
        self.clips_mut::<C>().push(clip);
        Ok(())
    }

    /// Remove a clip of either kind by its id. Returns the removed clip.
    pub fn remove(&mut self, id: Uuid) -> Result<RemovedClip> {
        if let Some(pos) = self.video.iter().position(|c| c.id == id) {
            return Ok(RemovedClip::Video(self.video.remove(pos)));
        }
        if let Some(pos) = self.audio.iter().position(|c| c.id == id) {
            return Ok(RemovedClip::Audio(self.audio.remove(pos)));
        }
        Err(CoreError::ClipNotFound(id))
    }

    /// Audio clips whose back-reference points at `video_id`.
    pub fn linked_audio(&self, video_id: Uuid) -> impl Iterator<Item = &AudioClip> + '_ {
        self.audio
            .iter()
            .filter(move |a| a.video_clip_id == Some(video_id))
    }

    pub fn max_layer(&self, kind: ClipKind) -> Option<u32> {
        match kind {
            ClipKind::Video => self.video.iter().map(|c| c.span.layer).max(),
            ClipKind::Audio => self.audio.iter().map(|c| c.span.layer).max(),
        }
    }

    /// Check every store invariant: per-clip bounds, unique ids, per-layer
    /// non-overlap in each namespace and audio link exclusivity.
    pub fn validate(&self, min_duration: f64) -> Result<()> {
        let mut seen = HashSet::new();
        let ids = self
            .video
            .iter()
            .map(|c| c.id)
            .chain(self.audio.iter().map(|c| c.id));
        for id in ids {
            if !seen.insert(id) {
                return Err(CoreError::DuplicateClip(id));
            }
        }

        validate_namespace(&self.video, min_duration)?;
        validate_namespace(&self.audio, min_duration)?;

        for audio in &self.audio {
            let Some(video_id) = audio.video_clip_id else {
                continue;
            };
            if self.video(video_id).is_some_and(|v| v.has_audio) {
                return Err(CoreError::InvalidClip {
                    id: audio.id,
                    reason: format!("video clip {video_id} still has embedded audio"),
                });
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            video: self.video.clone(),
            audio: self.audio.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        self.video = snapshot.video;
        self.audio = snapshot.audio;
    }
}

// ---------------------------------------------------------------------------
// Namespace helpers
// ---------------------------------------------------------------------------

/// Spans on `layer`, sorted by start time, optionally skipping one clip.
pub fn layer_spans<C: TimelineClip>(
    clips: &[C],
    layer: u32,
    exclude: Option<Uuid>,
) -> Vec<&ClipSpan> {
    let mut spans: Vec<&ClipSpan> = clips
        .iter()
        .filter(|c| c.span().layer == layer && Some(c.id()) != exclude)
        .map(|c| c.span())
        .collect();
    spans.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    spans
}

/// Id of the first clip on `span`'s layer intersecting it.
pub fn find_overlap<C: TimelineClip>(
    clips: &[C],
    span: &ClipSpan,
    exclude: Option<Uuid>,
) -> Option<Uuid> {
    clips
        .iter()
        .filter(|c| Some(c.id()) != exclude)
        .find(|c| c.span().overlaps(span))
        .map(|c| c.id())
}

fn validate_namespace<C: TimelineClip>(clips: &[C], min_duration: f64) -> Result<()> {
    for clip in clips {
        if let Some(reason) = clip.span().check(min_duration) {
            return Err(CoreError::InvalidClip {
                id: clip.id(),
                reason,
            });
        }
    }
    for (i, a) in clips.iter().enumerate() {
        for b in &clips[i + 1..] {
            if a.span().overlaps(b.span()) {
                return Err(CoreError::OverlapDetected {
                    layer: a.span().layer,
                    a: a.id(),
                    b: b.id(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(start: f64, len: f64, layer: u32) -> VideoClip {
        VideoClip::new(ClipSpan::new(start, 0.0, len, len, layer))
    }

    fn audio(start: f64, len: f64, layer: u32) -> AudioClip {
        AudioClip::new(ClipSpan::new(start, 0.0, len, len, layer))
    }

    // -----------------------------------------------------------------------
    // insert
    // -----------------------------------------------------------------------

    #[test]
    fn insert_into_empty_store_succeeds() {
        let mut store = ClipStore::new();
        assert!(store.insert_video(video(0.0, 5.0, 0)).is_ok());
        assert_eq!(store.video_clips().len(), 1);
    }

    #[test]
    fn insert_with_overlap_fails() {
        let mut store = ClipStore::new();
        store.insert_video(video(0.0, 5.0, 0)).unwrap();
        let result = store.insert_video(video(2.0, 5.0, 0));
        assert!(matches!(
            result.unwrap_err(),
            CoreError::OverlapDetected { layer: 0, .. }
        ));
    }

    #[test]
    fn insert_adjacent_succeeds() {
        let mut store = ClipStore::new();
        store.insert_video(video(0.0, 5.0, 0)).unwrap();
        assert!(store.insert_video(video(5.0, 5.0, 0)).is_ok());
    }

    #[test]
    fn namespaces_do_not_collide() {
        let mut store = ClipStore::new();
        store.insert_video(video(0.0, 5.0, 0)).unwrap();
        assert!(store.insert_audio(audio(0.0, 5.0, 0)).is_ok());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut store = ClipStore::new();
        let clip = video(0.0, 5.0, 0);
        let mut copy = clip.clone();
        copy.span.layer = 3;
        store.insert_video(clip).unwrap();
        assert!(matches!(
            store.insert_video(copy).unwrap_err(),
            CoreError::DuplicateClip(_)
        ));
    }

    // -----------------------------------------------------------------------
    // remove / lookup
    // -----------------------------------------------------------------------

    #[test]
    fn remove_works_for_both_kinds() {
        let mut store = ClipStore::new();
        let v = video(0.0, 5.0, 0);
        let a = audio(0.0, 5.0, 0);
        let (vid, aid) = (v.id, a.id);
        store.insert_video(v).unwrap();
        store.insert_audio(a).unwrap();

        assert_eq!(store.kind_of(aid), Some(ClipKind::Audio));
        assert!(matches!(store.remove(vid).unwrap(), RemovedClip::Video(_)));
        assert!(matches!(store.remove(aid).unwrap(), RemovedClip::Audio(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn remove_with_bad_id_fails() {
        let mut store = ClipStore::new();
        let result = store.remove(Uuid::new_v4());
        assert!(matches!(result.unwrap_err(), CoreError::ClipNotFound(_)));
    }

    #[test]
    fn layer_spans_are_sorted_and_filtered() {
        let clips = vec![video(10.0, 2.0, 0), video(0.0, 2.0, 0), video(4.0, 2.0, 1)];
        let spans = layer_spans(&clips, 0, None);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].start_time, 0.0);
        assert_eq!(spans[1].start_time, 10.0);

        let spans = layer_spans(&clips, 0, Some(clips[1].id));
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn max_layer_per_namespace() {
        let mut store = ClipStore::new();
        assert_eq!(store.max_layer(ClipKind::Video), None);
        store.insert_video(video(0.0, 1.0, 3)).unwrap();
        store.insert_audio(audio(0.0, 1.0, 1)).unwrap();
        assert_eq!(store.max_layer(ClipKind::Video), Some(3));
        assert_eq!(store.max_layer(ClipKind::Audio), Some(1));
    }

    // -----------------------------------------------------------------------
    // validate
    // -----------------------------------------------------------------------

    #[test]
    fn from_clips_rejects_overlap() {
        let result = ClipStore::from_clips(
            vec![video(0.0, 5.0, 0), video(4.0, 5.0, 0)],
            vec![],
            DEFAULT_MIN_DURATION,
        );
        assert!(matches!(
            result.unwrap_err(),
            CoreError::OverlapDetected { .. }
        ));
    }

    #[test]
    fn validate_catches_link_violation() {
        let v = video(0.0, 5.0, 0);
        let mut a = audio(0.0, 5.0, 0);
        a.video_clip_id = Some(v.id);
        let result = ClipStore::from_clips(vec![v], vec![a], DEFAULT_MIN_DURATION);
        assert!(matches!(result.unwrap_err(), CoreError::InvalidClip { .. }));
    }

    #[test]
    fn from_clips_rejects_nan_times() {
        let mut v = video(0.0, 5.0, 0);
        v.span = ClipSpan {
            start_time: f64::NAN,
            end_time: f64::NAN,
            source_start: f64::NAN,
            source_end: f64::NAN,
            source_duration: f64::NAN,
            layer: 0,
        };
        let result = ClipStore::from_clips(vec![v], vec![], DEFAULT_MIN_DURATION);
        assert!(matches!(result.unwrap_err(), CoreError::InvalidClip { .. }));
    }

    #[test]
    fn orphaned_audio_is_valid() {
        let mut a = audio(0.0, 5.0, 0);
        a.video_clip_id = Some(Uuid::new_v4());
        assert!(ClipStore::from_clips(vec![], vec![a], DEFAULT_MIN_DURATION).is_ok());
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let mut store = ClipStore::new();
        store.insert_video(video(0.0, 5.0, 0)).unwrap();
        let snap = store.snapshot();

        store.insert_video(video(5.0, 5.0, 0)).unwrap();
        assert_eq!(store.video_clips().len(), 2);

        store.restore(snap);
        assert_eq!(store.video_clips().len(), 1);
    }
}
