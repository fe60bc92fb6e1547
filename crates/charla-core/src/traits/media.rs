// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media metadata/download collaborator.

use async_trait::async_trait;

use crate::error::CharlaError;
use crate::types::MediaInfo;

/// Resolves provider media references to bytes.
///
/// Provider download URLs are short-lived; callers must fetch bytes
/// promptly after resolving metadata. An expired reference surfaces
/// as [`CharlaError::MediaGone`].
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Resolve a remote media reference to a short-lived URL and MIME type.
    async fn media_info(&self, media_id: &str) -> Result<MediaInfo, CharlaError>;

    /// Download the raw bytes behind a previously resolved URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>, CharlaError>;
}
