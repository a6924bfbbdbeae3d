use crate::extractor::Extractor;
use crate::observer::LogObserver;
use crate::script::{ReplayScript, Step};
use anyhow::Result;
use stackcut_core::{Editor, EngineConfig, History, Point, StoreSnapshot};
use std::time::Duration;
use tracing::{debug, info};

pub struct ReplayOptions {
    pub extract_delay: Duration,
    pub history_depth: usize,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            extract_delay: Duration::from_millis(50),
            history_depth: 100,
        }
    }
}

/// Feed a script through a fresh editor and return the final clip state.
/// Extraction runs alongside; finished results are applied between steps.
pub async fn run(
    script: ReplayScript,
    config: EngineConfig,
    options: ReplayOptions,
) -> Result<StoreSnapshot> {
    let mut editor = Editor::new(config)?
        .with_observer(LogObserver)
        .with_history(History::new(options.history_depth));
    if let Some(modes) = script.modes {
        editor.set_modes(modes);
    }
    editor.load(script.video, script.audio)?;

    let mut extractor = Extractor::new(options.extract_delay);
    extractor.request(editor.extraction_requests());

    for (index, step) in script.steps.into_iter().enumerate() {
        debug!("step {index}: {step:?}");
        match step {
            Step::PointerDown { x, y, modifier } => {
                editor.pointer_down(Point::new(x, y), modifier)
            }
            Step::PointerMove { x, y } => editor.pointer_move(Point::new(x, y)),
            Step::PointerUp { x, y } => editor.pointer_up(Point::new(x, y)),
            Step::Blur => editor.blur(),
            Step::Key(input) => {
                if let Some(command) = editor.handle_key(input) {
                    info!("key ran {command:?}");
                }
            }
            Step::Seek { time } => editor.seek(time),
            Step::Command { command } => {
                editor.run(command);
            }
            Step::Zoom { steps } => editor.zoom(steps),
            Step::Modes(modes) => editor.set_modes(modes),
            Step::WaitExtraction => {
                for update in extractor.settle().await {
                    editor.apply_metadata(update);
                }
            }
        }

        for update in extractor.drain() {
            editor.apply_metadata(update);
        }
        extractor.request(editor.extraction_requests());
    }

    info!(
        "replay finished with {} video and {} audio clips, {} extractions pending",
        editor.store().video_clips().len(),
        editor.store().audio_clips().len(),
        extractor.in_flight()
    );
    Ok(editor.snapshot())
}
