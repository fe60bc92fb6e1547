// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message append operations.
//!
//! A message insert and the conversation counter bump are one
//! transaction: either both land or neither does.

use charla_core::{CharlaError, Sender};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::MessageRecord;

const COLUMNS: &str = "id, tenant_id, conversation_id, contact_id, sender, kind, body,
     sent_at, latitude, longitude, location_name, location_address, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    let sender: Sender = row.get::<_, String>(4)?.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(MessageRecord {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        conversation_id: row.get(2)?,
        contact_id: row.get(3)?,
        sender,
        kind: row.get(5)?,
        body: row.get(6)?,
        sent_at: row.get(7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
        location_name: row.get(10)?,
        location_address: row.get(11)?,
        created_at: row.get(12)?,
    })
}

/// Insert a message and bump the conversation's counters atomically.
///
/// `total_messages` always increments; `bot_messages` additionally
/// increments when the sender is the bot.
pub async fn insert_message(db: &Database, msg: &MessageRecord) -> Result<(), CharlaError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, tenant_id, conversation_id, contact_id,
                     sender, kind, body, sent_at, latitude, longitude,
                     location_name, location_address, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    msg.id,
                    msg.tenant_id,
                    msg.conversation_id,
                    msg.contact_id,
                    msg.sender.to_string(),
                    msg.kind,
                    msg.body,
                    msg.sent_at,
                    msg.latitude,
                    msg.longitude,
                    msg.location_name,
                    msg.location_address,
                    msg.created_at,
                ],
            )?;
            let bot_bump = i64::from(msg.sender == Sender::Bot);
            tx.execute(
                "UPDATE conversations
                 SET total_messages = total_messages + 1,
                     bot_messages = bot_messages + ?1
                 WHERE id = ?2",
                params![bot_bump, msg.conversation_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Messages for a conversation in chronological order.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<MessageRecord>, CharlaError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {COLUMNS} FROM messages WHERE conversation_id = ?1
                         ORDER BY created_at ASC LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![conversation_id, lim], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {COLUMNS} FROM messages WHERE conversation_id = ?1
                         ORDER BY created_at ASC"
                    ))?;
                    let rows = stmt.query_map(params![conversation_id], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_rfc3339;
    use crate::queries::{contacts, conversations};
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir, String, String) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let contact = contacts::upsert_inbound(&db, "t1", "5215550001111", None)
            .await
            .unwrap();
        let conv = conversations::ensure_open_for_incoming(&db, "t1", &contact.id)
            .await
            .unwrap();
        (db, dir, contact.id, conv.id)
    }

    fn make_message(conversation_id: &str, contact_id: &str, sender: Sender) -> MessageRecord {
        MessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: "t1".to_string(),
            conversation_id: conversation_id.to_string(),
            contact_id: contact_id.to_string(),
            sender,
            kind: "text".to_string(),
            body: Some("hola".to_string()),
            sent_at: now_rfc3339(),
            latitude: None,
            longitude: None,
            location_name: None,
            location_address: None,
            created_at: now_rfc3339(),
        }
    }

    #[tokio::test]
    async fn insert_bumps_counters_atomically() {
        let (db, _dir, contact_id, conv_id) = setup().await;
        insert_message(&db, &make_message(&conv_id, &contact_id, Sender::Contact))
            .await
            .unwrap();
        insert_message(&db, &make_message(&conv_id, &contact_id, Sender::Bot))
            .await
            .unwrap();

        let conv = conversations::get(&db, &conv_id).await.unwrap().unwrap();
        assert_eq!(conv.total_messages, 2);
        assert_eq!(conv.bot_messages, 1);

        let stored = get_messages_for_conversation(&db, &conv_id, None).await.unwrap();
        assert_eq!(stored[0].sender, Sender::Contact);
        assert_eq!(stored[1].sender, Sender::Bot);
    }

    #[tokio::test]
    async fn location_fields_roundtrip() {
        let (db, _dir, contact_id, conv_id) = setup().await;
        let mut msg = make_message(&conv_id, &contact_id, Sender::Contact);
        msg.kind = "location".to_string();
        msg.body = None;
        msg.latitude = Some(19.4326);
        msg.longitude = Some(-99.1332);
        msg.location_name = Some("Zócalo".to_string());
        insert_message(&db, &msg).await.unwrap();

        let messages = get_messages_for_conversation(&db, &conv_id, None)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].latitude, Some(19.4326));
        assert_eq!(messages[0].location_name.as_deref(), Some("Zócalo"));
    }

    #[tokio::test]
    async fn messages_come_back_in_order() {
        let (db, _dir, contact_id, conv_id) = setup().await;
        for _ in 0..3 {
            insert_message(&db, &make_message(&conv_id, &contact_id, Sender::Contact))
                .await
                .unwrap();
        }
        let all = get_messages_for_conversation(&db, &conv_id, None).await.unwrap();
        assert_eq!(all.len(), 3);
        let limited = get_messages_for_conversation(&db, &conv_id, Some(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
    }
}
