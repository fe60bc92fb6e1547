// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound send collaborator consumed by the flow engine.
//!
//! The engine never blocks on delivery failures: a failed render is
//! reported to the caller but not retried here.

use async_trait::async_trait;

use crate::error::CharlaError;
use crate::types::SendReceipt;

/// Sends outbound messages to a single recipient channel.
///
/// Implemented by the WhatsApp Cloud API client; tests use the
/// recording mock from `charla-test-utils`.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, CharlaError>;

    /// Send an image hosted at a public URL, with an optional caption.
    async fn send_image_url(
        &self,
        to: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<SendReceipt, CharlaError>;

    /// Send a document hosted at a public URL.
    async fn send_document_url(
        &self,
        to: &str,
        url: &str,
        caption: Option<&str>,
        filename: &str,
    ) -> Result<SendReceipt, CharlaError>;

    /// Send a location pin.
    async fn send_location(
        &self,
        to: &str,
        latitude: f64,
        longitude: f64,
        name: &str,
        address: &str,
    ) -> Result<SendReceipt, CharlaError>;

    /// Send a pre-approved template, trying each language variant in
    /// order until one is accepted.
    async fn send_template(
        &self,
        to: &str,
        name: &str,
        language_variants: &[String],
        body_vars: &[String],
    ) -> Result<SendReceipt, CharlaError>;

    /// Upload and send an audio message. Rejects unsupported MIME
    /// types before attempting the upload.
    async fn send_audio(
        &self,
        to: &str,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<SendReceipt, CharlaError>;
}
