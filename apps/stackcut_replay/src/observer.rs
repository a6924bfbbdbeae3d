use stackcut_core::{AudioClip, EditorObserver, VideoClip};
use tracing::info;
use uuid::Uuid;

/// Logs everything the editor reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl EditorObserver for LogObserver {
    fn on_update_video_clips(&mut self, clips: &[VideoClip]) {
        info!("video clips: {}", clips.len());
    }

    fn on_update_audio_clips(&mut self, clips: &[AudioClip]) {
        info!("audio clips: {}", clips.len());
    }

    fn on_seek(&mut self, time: f64) {
        info!("playhead at {time:.3}s");
    }

    fn on_selection_changed(&mut self, ids: &[Uuid]) {
        info!("selection: {ids:?}");
    }
}
