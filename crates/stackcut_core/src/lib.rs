//! Multi-track clip arrangement for a video editor timeline.
//!
//! [`Editor`] is the entry point: it owns the clips of both namespaces, turns
//! pointer and keyboard input into previews and committed edits, and reports
//! changes through an [`EditorObserver`]. The pure operations it is built on
//! live in [`edit`], [`placement`] and [`trim`] and can be used directly on a
//! [`ClipStore`].

pub mod config;
pub mod coords;
pub mod edit;
pub mod editor;
pub mod error;
pub mod gesture;
pub mod history;
pub mod metadata;
pub mod placement;
pub mod selection;
pub mod store;
pub mod trim;
pub mod types;

pub use config::{EditModes, EngineConfig};
pub use coords::{CoordinateMapper, TrackLayout};
pub use edit::{ClipboardEntry, EditOutcome, RippleSide};
pub use editor::{Editor, EditorCommand, EditorObserver, Key, KeyInput, NoObserver, Preview};
pub use error::{CoreError, Result};
pub use gesture::{GestureState, Hit, HitZone, Point};
pub use history::{EditCommand, History, HistoryHook, NoHistory};
pub use metadata::{ExtractionRequest, MetadataKind, MetadataUpdate};
pub use selection::{Rect, Selection};
pub use store::{ClipStore, StoreSnapshot};
pub use trim::TrimEdge;
pub use types::{AudioClip, ClipKind, ClipSpan, MediaArray, VideoClip};
