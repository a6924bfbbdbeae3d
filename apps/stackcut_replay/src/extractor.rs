use stackcut_core::{ExtractionRequest, MetadataKind, MetadataUpdate};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

const PEAKS_PER_SECOND: f64 = 10.0;

/// Stand-in for the thumbnail and waveform extractor. Every request is
/// answered from a spawned task after `delay`, so results arrive while the
/// script keeps editing.
pub struct Extractor {
    tx: mpsc::UnboundedSender<MetadataUpdate>,
    rx: mpsc::UnboundedReceiver<MetadataUpdate>,
    delay: Duration,
    in_flight: HashSet<(Uuid, MetadataKind)>,
}

impl Extractor {
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            delay,
            in_flight: HashSet::new(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start work for every request not already running.
    pub fn request(&mut self, requests: Vec<ExtractionRequest>) {
        for request in requests {
            if !self.in_flight.insert((request.clip_id, request.kind)) {
                continue;
            }
            debug!("extracting {:?} for clip {}", request.kind, request.clip_id);
            let tx = self.tx.clone();
            let delay = self.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // The receiver is gone once the replay has finished.
                let _ = tx.send(synthesize(&request));
            });
        }
    }

    /// Results delivered so far, without waiting.
    pub fn drain(&mut self) -> Vec<MetadataUpdate> {
        let mut done = Vec::new();
        while let Ok(update) = self.rx.try_recv() {
            self.finish(&update);
            done.push(update);
        }
        done
    }

    /// Wait for everything in flight.
    pub async fn settle(&mut self) -> Vec<MetadataUpdate> {
        let mut done = Vec::new();
        while !self.in_flight.is_empty() {
            let Some(update) = self.rx.recv().await else {
                break;
            };
            self.finish(&update);
            done.push(update);
        }
        done
    }

    fn finish(&mut self, update: &MetadataUpdate) {
        self.in_flight.remove(&(update.clip_id(), update.kind()));
    }
}

/// Deterministic output sized to the requested source range: one thumbnail
/// per started second and a fixed number of peaks per second.
fn synthesize(request: &ExtractionRequest) -> MetadataUpdate {
    let length = (request.source_end - request.source_start).max(0.0);
    match request.kind {
        MetadataKind::Thumbnails => {
            let count = length.ceil().max(1.0) as usize;
            MetadataUpdate::Thumbnails {
                clip_id: request.clip_id,
                items: (0..count)
                    .map(|i| {
                        let at = request.source_start + i as f64;
                        format!("{}-{at:.1}.jpg", request.clip_id)
                    })
                    .collect(),
            }
        }
        MetadataKind::Waveform => {
            let count = (length * PEAKS_PER_SECOND).ceil().max(1.0) as usize;
            MetadataUpdate::Waveform {
                clip_id: request.clip_id,
                peaks: (0..count)
                    .map(|i| {
                        let t = request.source_start + i as f64 / PEAKS_PER_SECOND;
                        (t * 3.0).sin().abs() as f32
                    })
                    .collect(),
            }
        }
    }
}
