use thiserror::Error;

use crate::flow::RevealStage;

/// Everything that can go wrong while driving the room, book and ghost.
///
/// None of these are fatal: callers log them and leave the scene in its last
/// good state.
#[derive(Error, Debug)]
pub enum DemoError {
    #[error("missing element: {0}")]
    MissingElement(String),

    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("cannot read config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error("illegal reveal transition {from:?} -> {to:?}")]
    IllegalTransition { from: RevealStage, to: RevealStage },
}
