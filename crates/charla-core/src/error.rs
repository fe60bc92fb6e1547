// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Charla messaging backend.

use thiserror::Error;

/// The primary error type used across all Charla crates.
#[derive(Debug, Error)]
pub enum CharlaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging provider errors (HTTP failure, rejected send, bad payload).
    /// Carries the provider's status code when one was received.
    #[error("provider error: {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// A state transition that is not permitted (e.g. reopening a closed
    /// conversation, holding a closed one, claiming an assigned one).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Provider media could not be retrieved and has likely expired.
    #[error("media gone (possibly expired): {0}")]
    MediaGone(String),

    /// Audio re-encoding failed; carries the external tool's diagnostics.
    #[error("transcode failed: {detail}")]
    Transcode { detail: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CharlaError {
    /// True for errors that map to a 409-equivalent at an API boundary.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CharlaError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_message() {
        let err = CharlaError::Provider {
            status: Some(400),
            message: "invalid recipient".into(),
        };
        assert_eq!(err.to_string(), "provider error: invalid recipient");
    }

    #[test]
    fn conflict_classification() {
        assert!(CharlaError::Conflict("closed".into()).is_conflict());
        assert!(!CharlaError::Internal("x".into()).is_conflict());
    }

    #[test]
    fn media_gone_is_distinguishable() {
        let err = CharlaError::MediaGone("media-1".into());
        assert!(matches!(err, CharlaError::MediaGone(_)));
        assert!(err.to_string().contains("possibly expired"));
    }
}
