// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API client.
//!
//! One client instance per tenant integration. All sends go through
//! `POST /{version}/{phone_number_id}/messages`; audio additionally
//! uploads bytes through the media endpoint first.

use async_trait::async_trait;
use charla_core::{CharlaError, OutboundSender, SendReceipt};
use serde::Deserialize;
use tracing::{debug, warn};

/// MIME types the provider accepts for audio uploads.
pub const SUPPORTED_AUDIO_MIME: &[&str] = &[
    "audio/aac",
    "audio/mp4",
    "audio/mpeg",
    "audio/amr",
    "audio/ogg",
];

/// Cloud API client bound to a single integration.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    access_token: String,
    phone_number_id: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

impl WhatsAppClient {
    pub fn new(
        base_url: impl Into<String>,
        api_version: impl Into<String>,
        access_token: impl Into<String>,
        phone_number_id: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_version: api_version.into(),
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, self.phone_number_id
        )
    }

    fn media_upload_url(&self) -> String {
        format!(
            "{}/{}/{}/media",
            self.base_url, self.api_version, self.phone_number_id
        )
    }

    pub(crate) fn media_metadata_url(&self, media_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_version, media_id)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn access_token(&self) -> &str {
        &self.access_token
    }

    /// POST a message body and translate the provider's response into a
    /// [`SendReceipt`] or a structured provider failure.
    async fn post_message(&self, body: serde_json::Value) -> Result<SendReceipt, CharlaError> {
        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CharlaError::Provider {
                status: None,
                message: format!("send request failed: {e}"),
            })?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            let parsed: SendResponse = response.json().await.unwrap_or(SendResponse {
                messages: Vec::new(),
            });
            let message_id = parsed.messages.into_iter().next().map(|m| m.id);
            debug!(status, ?message_id, "message accepted by provider");
            Ok(SendReceipt { status, message_id })
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(CharlaError::Provider {
                status: Some(status),
                message,
            })
        }
    }
}

#[async_trait]
impl OutboundSender for WhatsAppClient {
    async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, CharlaError> {
        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": text },
        }))
        .await
    }

    async fn send_image_url(
        &self,
        to: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<SendReceipt, CharlaError> {
        let mut image = serde_json::json!({ "link": url });
        if let Some(caption) = caption {
            image["caption"] = serde_json::Value::String(caption.to_string());
        }
        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "image",
            "image": image,
        }))
        .await
    }

    async fn send_document_url(
        &self,
        to: &str,
        url: &str,
        caption: Option<&str>,
        filename: &str,
    ) -> Result<SendReceipt, CharlaError> {
        let mut document = serde_json::json!({ "link": url, "filename": filename });
        if let Some(caption) = caption {
            document["caption"] = serde_json::Value::String(caption.to_string());
        }
        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "document",
            "document": document,
        }))
        .await
    }

    async fn send_location(
        &self,
        to: &str,
        latitude: f64,
        longitude: f64,
        name: &str,
        address: &str,
    ) -> Result<SendReceipt, CharlaError> {
        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "location",
            "location": {
                "latitude": latitude,
                "longitude": longitude,
                "name": name,
                "address": address,
            },
        }))
        .await
    }

    async fn send_template(
        &self,
        to: &str,
        name: &str,
        language_variants: &[String],
        body_vars: &[String],
    ) -> Result<SendReceipt, CharlaError> {
        if language_variants.is_empty() {
            return Err(CharlaError::Provider {
                status: None,
                message: "no template language variants configured".into(),
            });
        }

        let mut last_err = None;
        for language in language_variants {
            let mut template = serde_json::json!({
                "name": name,
                "language": { "code": language },
            });
            if !body_vars.is_empty() {
                let parameters: Vec<serde_json::Value> = body_vars
                    .iter()
                    .map(|v| serde_json::json!({ "type": "text", "text": v }))
                    .collect();
                template["components"] = serde_json::json!([
                    { "type": "body", "parameters": parameters }
                ]);
            }
            let result = self
                .post_message(serde_json::json!({
                    "messaging_product": "whatsapp",
                    "to": to,
                    "type": "template",
                    "template": template,
                }))
                .await;
            match result {
                Ok(receipt) => return Ok(receipt),
                Err(e) => {
                    warn!(template = name, language, error = %e,
                          "template variant rejected, trying next");
                    last_err = Some(e);
                }
            }
        }
        // Loop ran at least once, so last_err is populated.
        Err(last_err.unwrap_or(CharlaError::Internal(
            "template fallback exhausted without an error".into(),
        )))
    }

    async fn send_audio(
        &self,
        to: &str,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<SendReceipt, CharlaError> {
        if !SUPPORTED_AUDIO_MIME.contains(&mime_type) {
            return Err(CharlaError::Provider {
                status: None,
                message: format!("unsupported audio mime type: {mime_type}"),
            });
        }

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| CharlaError::Internal(format!("invalid mime type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", mime_type.to_string())
            .part("file", part);

        let response = self
            .http
            .post(self.media_upload_url())
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CharlaError::Provider {
                status: None,
                message: format!("media upload failed: {e}"),
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CharlaError::Provider {
                status: Some(status),
                message,
            });
        }
        let uploaded: UploadResponse =
            response.json().await.map_err(|e| CharlaError::Provider {
                status: Some(status),
                message: format!("malformed upload response: {e}"),
            })?;

        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "audio",
            "audio": { "id": uploaded.id },
        }))
        .await
    }
}
