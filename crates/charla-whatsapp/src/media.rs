// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider media metadata and download.
//!
//! Media references resolve to short-lived URLs; bytes must be fetched
//! promptly. Expired references surface as [`CharlaError::MediaGone`].

use async_trait::async_trait;
use charla_core::{CharlaError, MediaFetcher, MediaInfo};
use serde::Deserialize;
use tracing::debug;

use crate::client::WhatsAppClient;

#[derive(Debug, Deserialize)]
struct MediaMetadataResponse {
    url: String,
    mime_type: String,
    #[serde(default)]
    file_size: Option<u64>,
}

#[async_trait]
impl MediaFetcher for WhatsAppClient {
    async fn media_info(&self, media_id: &str) -> Result<MediaInfo, CharlaError> {
        let response = self
            .http()
            .get(self.media_metadata_url(media_id))
            .bearer_auth(self.access_token())
            .send()
            .await
            .map_err(|e| CharlaError::Provider {
                status: None,
                message: format!("media metadata request failed: {e}"),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(CharlaError::MediaGone(media_id.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CharlaError::Provider {
                status: Some(status.as_u16()),
                message,
            });
        }

        let meta: MediaMetadataResponse =
            response.json().await.map_err(|e| CharlaError::Provider {
                status: Some(status.as_u16()),
                message: format!("malformed media metadata: {e}"),
            })?;
        Ok(MediaInfo {
            url: meta.url,
            mime_type: meta.mime_type,
            file_size: meta.file_size,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, CharlaError> {
        let response = self
            .http()
            .get(url)
            .bearer_auth(self.access_token())
            .send()
            .await
            .map_err(|e| CharlaError::Provider {
                status: None,
                message: format!("media download failed: {e}"),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(CharlaError::MediaGone(url.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CharlaError::Provider {
                status: Some(status.as_u16()),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(|e| CharlaError::Provider {
            status: None,
            message: format!("media body read failed: {e}"),
        })?;
        debug!(size = bytes.len(), "downloaded provider media");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WhatsAppClient {
        WhatsAppClient::new(server.uri(), "v20.0", "test-token", "111222333")
    }

    #[tokio::test]
    async fn metadata_then_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v20.0/media-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": format!("{}/files/media-1", server.uri()),
                "mime_type": "image/jpeg",
                "file_size": 3
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/media-1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let info = client.media_info("media-1").await.unwrap();
        assert_eq!(info.mime_type, "image/jpeg");
        let bytes = client.download(&info.url).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn expired_media_is_gone_not_generic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v20.0/media-old"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).media_info("media-old").await.unwrap_err();
        assert!(matches!(err, CharlaError::MediaGone(_)));
    }
}
