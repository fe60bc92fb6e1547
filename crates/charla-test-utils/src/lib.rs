// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles shared across the workspace.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use charla_core::{CharlaError, MediaFetcher, MediaInfo, OutboundSender, SendReceipt};

/// One send captured by [`RecordingSender`].
#[derive(Debug, Clone, PartialEq)]
pub enum SentMessage {
    Text {
        to: String,
        text: String,
    },
    Image {
        to: String,
        url: String,
        caption: Option<String>,
    },
    Document {
        to: String,
        url: String,
        caption: Option<String>,
        filename: String,
    },
    Location {
        to: String,
        latitude: f64,
        longitude: f64,
        name: String,
        address: String,
    },
    Template {
        to: String,
        name: String,
        language_variants: Vec<String>,
        body_vars: Vec<String>,
    },
    Audio {
        to: String,
        bytes: Vec<u8>,
        filename: String,
        mime_type: String,
    },
}

/// Outbound sender that records every call instead of delivering.
///
/// Optionally fails the first `fail_first` sends, for exercising the
/// no-retry behavior of callers.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentMessage>>,
    fail_first: Mutex<usize>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_first: Mutex::new(n),
        }
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Bodies of the text messages sent so far, in order.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SentMessage::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, message: SentMessage) -> Result<SendReceipt, CharlaError> {
        {
            let mut remaining = self.fail_first.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CharlaError::Provider {
                    status: Some(500),
                    message: "simulated delivery failure".into(),
                });
            }
        }
        self.sent.lock().unwrap().push(message);
        Ok(SendReceipt {
            status: 200,
            message_id: Some(format!("test-{}", self.sent.lock().unwrap().len())),
        })
    }
}

#[async_trait]
impl OutboundSender for RecordingSender {
    async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, CharlaError> {
        self.record(SentMessage::Text {
            to: to.into(),
            text: text.into(),
        })
    }

    async fn send_image_url(
        &self,
        to: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<SendReceipt, CharlaError> {
        self.record(SentMessage::Image {
            to: to.into(),
            url: url.into(),
            caption: caption.map(Into::into),
        })
    }

    async fn send_document_url(
        &self,
        to: &str,
        url: &str,
        caption: Option<&str>,
        filename: &str,
    ) -> Result<SendReceipt, CharlaError> {
        self.record(SentMessage::Document {
            to: to.into(),
            url: url.into(),
            caption: caption.map(Into::into),
            filename: filename.into(),
        })
    }

    async fn send_location(
        &self,
        to: &str,
        latitude: f64,
        longitude: f64,
        name: &str,
        address: &str,
    ) -> Result<SendReceipt, CharlaError> {
        self.record(SentMessage::Location {
            to: to.into(),
            latitude,
            longitude,
            name: name.into(),
            address: address.into(),
        })
    }

    async fn send_template(
        &self,
        to: &str,
        name: &str,
        language_variants: &[String],
        body_vars: &[String],
    ) -> Result<SendReceipt, CharlaError> {
        self.record(SentMessage::Template {
            to: to.into(),
            name: name.into(),
            language_variants: language_variants.to_vec(),
            body_vars: body_vars.to_vec(),
        })
    }

    async fn send_audio(
        &self,
        to: &str,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<SendReceipt, CharlaError> {
        self.record(SentMessage::Audio {
            to: to.into(),
            bytes,
            filename: filename.into(),
            mime_type: mime_type.into(),
        })
    }
}

/// Media fetcher serving a fixed set of in-memory objects.
#[derive(Default)]
pub struct StaticFetcher {
    objects: HashMap<String, (String, Vec<u8>)>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(
        mut self,
        media_id: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.objects.insert(media_id.into(), (mime_type.into(), bytes));
        self
    }
}

#[async_trait]
impl MediaFetcher for StaticFetcher {
    async fn media_info(&self, media_id: &str) -> Result<MediaInfo, CharlaError> {
        match self.objects.get(media_id) {
            Some((mime_type, bytes)) => Ok(MediaInfo {
                url: format!("static://{media_id}"),
                mime_type: mime_type.clone(),
                file_size: Some(bytes.len() as u64),
            }),
            None => Err(CharlaError::MediaGone(media_id.to_string())),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, CharlaError> {
        let media_id = url.strip_prefix("static://").unwrap_or(url);
        match self.objects.get(media_id) {
            Some((_, bytes)) => Ok(bytes.clone()),
            None => Err(CharlaError::MediaGone(media_id.to_string())),
        }
    }
}
