// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment materialization and on-demand reads.
//!
//! Inbound media is fetched best-effort at ingestion time: the row is
//! written either way, carrying the provider reference so content can
//! still be fetched later if the initial download fails. On-demand
//! reads never write back; an expired provider reference surfaces as
//! [`CharlaError::MediaGone`] so callers can tell the user the content
//! is no longer available rather than retrying forever.

use charla_core::{CharlaError, MediaFetcher};
use charla_storage::database::{now_rfc3339, Database};
use charla_storage::models::Attachment;
use charla_storage::queries::attachments;
use tracing::{debug, warn};
use uuid::Uuid;

/// Descriptor of a media object referenced by an inbound message.
#[derive(Debug, Clone)]
pub struct InboundMedia {
    /// Provider media id.
    pub media_id: String,
    /// MIME type declared in the webhook payload.
    pub mime_type: String,
    /// Original filename, when the provider supplies one.
    pub filename: Option<String>,
}

/// Fetch inbound media and persist the attachment row.
///
/// Download failure is logged and swallowed: the row is still written
/// with NULL data and the provider reference, and ingestion continues.
pub async fn materialize_inbound(
    db: &Database,
    fetcher: &dyn MediaFetcher,
    message_id: &str,
    media: &InboundMedia,
) -> Result<Attachment, CharlaError> {
    let mut data = None;
    let mut byte_size = None;
    match fetch_bytes(fetcher, &media.media_id).await {
        Ok(bytes) => {
            byte_size = Some(bytes.len() as i64);
            data = Some(bytes);
        }
        Err(e) => {
            warn!(media_id = %media.media_id, error = %e,
                  "inbound media fetch failed, keeping remote reference");
        }
    }

    let attachment = Attachment {
        id: Uuid::new_v4().to_string(),
        message_id: message_id.to_string(),
        filename: media.filename.clone(),
        mime_type: media.mime_type.clone(),
        byte_size,
        data,
        storage: "whatsapp".to_string(),
        media_ref: Some(media.media_id.clone()),
        uploaded_at: now_rfc3339(),
    };
    attachments::create_attachment(db, &attachment).await?;
    debug!(attachment_id = %attachment.id, inline = attachment.data.is_some(),
           "attachment recorded");
    Ok(attachment)
}

/// Resolve an attachment's bytes for a read.
///
/// Inline bytes are served directly. Remote-only rows are re-fetched
/// from the provider without persisting the result.
pub async fn read_attachment(
    db: &Database,
    fetcher: &dyn MediaFetcher,
    attachment_id: &str,
) -> Result<(Vec<u8>, String), CharlaError> {
    let attachment = attachments::get_attachment(db, attachment_id)
        .await?
        .ok_or_else(|| CharlaError::NotFound(format!("attachment {attachment_id}")))?;

    if let Some(data) = attachment.data {
        return Ok((data, attachment.mime_type));
    }

    let media_ref = attachment.media_ref.ok_or_else(|| {
        CharlaError::Internal(format!(
            "attachment {attachment_id} has neither inline data nor a remote reference"
        ))
    })?;
    let bytes = fetch_bytes(fetcher, &media_ref).await?;
    Ok((bytes, attachment.mime_type))
}

async fn fetch_bytes(fetcher: &dyn MediaFetcher, media_id: &str) -> Result<Vec<u8>, CharlaError> {
    let info = fetcher.media_info(media_id).await?;
    fetcher.download(&info.url).await
}
