// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serde types for the Cloud API webhook envelope.
//!
//! Deliveries arrive as entries > changes > value; the value carries
//! routing metadata, optional contact profiles, and zero or more
//! messages. Status-only payloads (delivery receipts) parse to an
//! empty `messages` list and are ignored upstream.

use serde::Deserialize;

/// Top-level webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    pub value: ChangeValue,
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<WaContact>,
    #[serde(default)]
    pub messages: Vec<WaMessage>,
    /// Delivery receipts; present on status-only payloads.
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

/// Routing metadata. `phone_number_id` is the routing key that picks
/// which tenant's integration an event belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub display_phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaContact {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

/// A single inbound message object.
#[derive(Debug, Clone, Deserialize)]
pub struct WaMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    /// Unix seconds, string-encoded by the provider.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<TextPayload>,
    #[serde(default)]
    pub image: Option<MediaPayload>,
    #[serde(default)]
    pub audio: Option<MediaPayload>,
    #[serde(default)]
    pub video: Option<MediaPayload>,
    #[serde(default)]
    pub document: Option<MediaPayload>,
    #[serde(default)]
    pub sticker: Option<MediaPayload>,
    #[serde(default)]
    pub location: Option<LocationPayload>,
    #[serde(default)]
    pub button: Option<ButtonPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextPayload {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Quick-reply button press; treated as text input by the flow engine.
#[derive(Debug, Clone, Deserialize)]
pub struct ButtonPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

impl WaMessage {
    /// The media payload matching this message's declared type, if any.
    pub fn media(&self) -> Option<&MediaPayload> {
        match self.kind.as_deref() {
            Some("image") => self.image.as_ref(),
            Some("audio") => self.audio.as_ref(),
            Some("video") => self.video.as_ref(),
            Some("document") => self.document.as_ref(),
            Some("sticker") => self.sticker.as_ref(),
            _ => None,
        }
    }

    /// Text content the flow engine should see: the text body, a media
    /// caption, or a button press.
    pub fn text_body(&self) -> Option<&str> {
        if let Some(text) = &self.text {
            return Some(&text.body);
        }
        if let Some(button) = &self.button {
            return button.text.as_deref();
        }
        self.media().and_then(|m| m.caption.as_deref())
    }

    /// Parse the provider's string-encoded Unix timestamp.
    pub fn sent_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let secs: i64 = self.timestamp.as_deref()?.parse().ok()?;
        chrono::DateTime::from_timestamp(secs, 0)
    }
}
