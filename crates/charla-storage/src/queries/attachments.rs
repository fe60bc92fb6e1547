// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment rows. Inline bytes are nullable: a remote reference with
//! NULL data means the content is fetched from the provider on demand.

use charla_core::CharlaError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::Attachment;

const COLUMNS: &str =
    "id, message_id, filename, mime_type, byte_size, data, storage, media_ref, uploaded_at";

fn row_to_attachment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get(0)?,
        message_id: row.get(1)?,
        filename: row.get(2)?,
        mime_type: row.get(3)?,
        byte_size: row.get(4)?,
        data: row.get(5)?,
        storage: row.get(6)?,
        media_ref: row.get(7)?,
        uploaded_at: row.get(8)?,
    })
}

/// Insert an attachment row.
pub async fn create_attachment(db: &Database, attachment: &Attachment) -> Result<(), CharlaError> {
    let attachment = attachment.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO attachments (id, message_id, filename, mime_type, byte_size,
                     data, storage, media_ref, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    attachment.id,
                    attachment.message_id,
                    attachment.filename,
                    attachment.mime_type,
                    attachment.byte_size,
                    attachment.data,
                    attachment.storage,
                    attachment.media_ref,
                    attachment.uploaded_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get an attachment by id.
pub async fn get_attachment(db: &Database, id: &str) -> Result<Option<Attachment>, CharlaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM attachments WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_attachment) {
                Ok(attachment) => Ok(Some(attachment)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_rfc3339;
    use crate::queries::{contacts, conversations, messages};
    use tempfile::tempdir;

    #[tokio::test]
    async fn attachment_without_bytes_keeps_remote_ref() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let contact = contacts::upsert_inbound(&db, "t1", "5215550001111", None)
            .await
            .unwrap();
        let conv = conversations::ensure_open_for_incoming(&db, "t1", &contact.id)
            .await
            .unwrap();
        let msg = crate::models::MessageRecord {
            id: "m1".into(),
            tenant_id: "t1".into(),
            conversation_id: conv.id.clone(),
            contact_id: contact.id.clone(),
            sender: charla_core::Sender::Contact,
            kind: "image".into(),
            body: None,
            sent_at: now_rfc3339(),
            latitude: None,
            longitude: None,
            location_name: None,
            location_address: None,
            created_at: now_rfc3339(),
        };
        messages::insert_message(&db, &msg).await.unwrap();

        let attachment = Attachment {
            id: "a1".into(),
            message_id: "m1".into(),
            filename: None,
            mime_type: "image/jpeg".into(),
            byte_size: Some(2048),
            data: None,
            storage: "whatsapp".into(),
            media_ref: Some("wamid.123".into()),
            uploaded_at: now_rfc3339(),
        };
        create_attachment(&db, &attachment).await.unwrap();

        let loaded = get_attachment(&db, "a1").await.unwrap().unwrap();
        assert!(loaded.data.is_none());
        assert_eq!(loaded.media_ref.as_deref(), Some("wamid.123"));
        assert_eq!(loaded.storage, "whatsapp");
    }
}
