use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Clip not found: {0}")]
    ClipNotFound(uuid::Uuid),

    #[error("Duplicate clip id: {0}")]
    DuplicateClip(uuid::Uuid),

    #[error("Overlap detected on layer {layer} between {a} and {b}")]
    OverlapDetected {
        layer: u32,
        a: uuid::Uuid,
        b: uuid::Uuid,
    },

    #[error("Invalid clip {id}: {reason}")]
    InvalidClip { id: uuid::Uuid, reason: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
