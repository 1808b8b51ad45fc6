//! Error types for the fallible boundaries of the editor.

use thiserror::Error;

/// Errors raised while loading markup, configuration or scripts.
///
/// Editing operations themselves never fail: stale targets degrade to
/// no-ops. Only data crossing into the core is validated.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Markup parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Script error: {0}")]
    Script(String),
}

/// Result type for editor boundary operations.
pub type EditorResult<T> = Result<T, EditorError>;
