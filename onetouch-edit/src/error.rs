//! Error types for onetouch-edit.
//!
//! Parse failures carry enough context to name the offending document. A selector that
//! matches nothing is only an error for operations that need a target; probes report zero
//! matches instead.

use thiserror::Error;

/// The top-level error type for document edits.
#[derive(Debug, Error)]
pub enum EditError {
    /// An XML document or fragment could not be parsed.
    #[error("xml parse error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// A property list could not be read or written.
    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    /// The Xcode project graph could not be parsed.
    #[error("xcode project parse error at byte {offset}: {message}")]
    Pbx { offset: usize, message: String },

    /// A structural lookup inside the Xcode project graph failed.
    #[error("xcode project: {message}")]
    PbxGraph { message: String },

    /// An operation needed a target and the selector matched nothing.
    #[error("no node matches {selector}")]
    TargetMissing { selector: String },

    /// A node was found but has the wrong shape for the operation.
    #[error("{selector}: {message}")]
    WrongShape { selector: String, message: String },

    /// A line-oriented edit could not find its anchor.
    #[error("marker {marker:?} not found")]
    MarkerMissing { marker: String },

    /// Output was not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl EditError {
    pub(crate) fn missing(selector: impl std::fmt::Display) -> Self {
        EditError::TargetMissing {
            selector: selector.to_string(),
        }
    }

    pub(crate) fn shape(selector: impl std::fmt::Display, message: impl Into<String>) -> Self {
        EditError::WrongShape {
            selector: selector.to_string(),
            message: message.into(),
        }
    }

    /// Returns true if the error means "the thing to edit is not there".
    pub fn is_missing_target(&self) -> bool {
        matches!(
            self,
            EditError::TargetMissing { .. } | EditError::MarkerMissing { .. }
        )
    }
}

/// Result type alias using EditError.
pub type EditResult<T> = Result<T, EditError>;
