// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle transitions.
//!
//! Every transition re-reads the current status inside the
//! single-writer closure before writing, which makes the
//! read-then-write linearizable per conversation. Closed conversations
//! are never reopened: the guard sits here, at the data layer, so a
//! stale caller cannot resurrect one through any entry point.

use charla_core::{CharlaError, ConversationStatus};
use rusqlite::params;

use crate::database::{map_tr_err, now_rfc3339, Database};
use crate::models::{Conversation, User};

const COLUMNS: &str = "id, tenant_id, contact_id, status, started_at, last_activity_at,
     ended_at, on_hold, hold_reason, held_by, held_at, agent_requested_at,
     assigned_user, assigned_at, assigned_by, closed_by, total_messages, bot_messages";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let status: ConversationStatus = row.get::<_, String>(3)?.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Conversation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        contact_id: row.get(2)?,
        status,
        started_at: row.get(4)?,
        last_activity_at: row.get(5)?,
        ended_at: row.get(6)?,
        on_hold: row.get::<_, i64>(7)? != 0,
        hold_reason: row.get(8)?,
        held_by: row.get(9)?,
        held_at: row.get(10)?,
        agent_requested_at: row.get(11)?,
        assigned_user: row.get(12)?,
        assigned_at: row.get(13)?,
        assigned_by: row.get(14)?,
        closed_by: row.get(15)?,
        total_messages: row.get(16)?,
        bot_messages: row.get(17)?,
    })
}

fn select_by_id(
    conn: &rusqlite::Connection,
    id: &str,
) -> rusqlite::Result<Option<Conversation>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"))?;
    match stmt.query_row(params![id], row_to_conversation) {
        Ok(conv) => Ok(Some(conv)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn select_open_for_contact(
    conn: &rusqlite::Connection,
    tenant_id: &str,
    contact_id: &str,
) -> rusqlite::Result<Option<Conversation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM conversations
         WHERE tenant_id = ?1 AND contact_id = ?2 AND status = 'open'
         ORDER BY started_at DESC LIMIT 1"
    ))?;
    match stmt.query_row(params![tenant_id, contact_id], row_to_conversation) {
        Ok(conv) => Ok(Some(conv)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Result of a guarded transition, resolved to `CharlaError` by [`finish`].
enum Outcome<T> {
    Done(T),
    Missing,
    Closed,
    Denied(String),
}

fn finish<T>(outcome: Outcome<T>, id: &str) -> Result<T, CharlaError> {
    match outcome {
        Outcome::Done(value) => Ok(value),
        Outcome::Missing => Err(CharlaError::NotFound(format!("conversation {id}"))),
        Outcome::Closed => Err(CharlaError::Conflict(format!(
            "conversation {id} is closed"
        ))),
        Outcome::Denied(reason) => Err(CharlaError::Conflict(reason)),
    }
}

/// Get a conversation by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Conversation>, CharlaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| select_by_id(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// Newest open conversation for a contact, if any.
pub async fn find_open_by_contact(
    db: &Database,
    tenant_id: &str,
    contact_id: &str,
) -> Result<Option<Conversation>, CharlaError> {
    let tenant_id = tenant_id.to_string();
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| select_open_for_contact(conn, &tenant_id, &contact_id))
        .await
        .map_err(map_tr_err)
}

/// Return the open conversation for the contact, creating one if none
/// exists. Idempotent per inbound batch.
pub async fn ensure_open_for_incoming(
    db: &Database,
    tenant_id: &str,
    contact_id: &str,
) -> Result<Conversation, CharlaError> {
    let tenant_id = tenant_id.to_string();
    let contact_id = contact_id.to_string();
    let new_id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    db.connection()
        .call(move |conn| {
            if let Some(open) = select_open_for_contact(conn, &tenant_id, &contact_id)? {
                return Ok(open);
            }
            conn.execute(
                "INSERT INTO conversations (id, tenant_id, contact_id, status,
                     started_at, last_activity_at, on_hold, total_messages, bot_messages)
                 VALUES (?1, ?2, ?3, 'open', ?4, ?4, 0, 0, 0)",
                params![new_id, tenant_id, contact_id, now],
            )?;
            match select_by_id(conn, &new_id)? {
                Some(conv) => Ok(conv),
                None => Err(rusqlite::Error::QueryReturnedNoRows),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Bump last_activity_at. On a closed conversation this does NOT
/// reopen: it only sets ended_at when still unset.
pub async fn touch(db: &Database, id: &str) -> Result<(), CharlaError> {
    let id_owned = id.to_string();
    let now = now_rfc3339();
    db.connection()
        .call(move |conn| {
            match select_by_id(conn, &id_owned)? {
                None => Ok(Outcome::Missing),
                Some(conv) if conv.status == ConversationStatus::Closed => {
                    conn.execute(
                        "UPDATE conversations SET ended_at = ?1
                         WHERE id = ?2 AND ended_at IS NULL",
                        params![now, id_owned],
                    )?;
                    Ok(Outcome::Done(()))
                }
                Some(_) => {
                    conn.execute(
                        "UPDATE conversations SET last_activity_at = ?1
                         WHERE id = ?2 AND status != 'closed'",
                        params![now, id_owned],
                    )?;
                    Ok(Outcome::Done(()))
                }
            }
        })
        .await
        .map_err(map_tr_err)
        .and_then(|o| finish(o, id))
}

/// Record a hand-off request. Sets agent_requested_at once; a second
/// call is a no-op. Rejected on closed conversations.
pub async fn mark_agent_requested(db: &Database, id: &str) -> Result<(), CharlaError> {
    let id_owned = id.to_string();
    let now = now_rfc3339();
    db.connection()
        .call(move |conn| {
            match select_by_id(conn, &id_owned)? {
                None => Ok(Outcome::Missing),
                Some(conv) if conv.status == ConversationStatus::Closed => Ok(Outcome::Closed),
                Some(_) => {
                    conn.execute(
                        "UPDATE conversations SET agent_requested_at = ?1
                         WHERE id = ?2 AND status != 'closed'
                         AND agent_requested_at IS NULL",
                        params![now, id_owned],
                    )?;
                    Ok(Outcome::Done(()))
                }
            }
        })
        .await
        .map_err(map_tr_err)
        .and_then(|o| finish(o, id))
}

/// Hand the conversation back to the bot by clearing the hand-off
/// request (and any assignment). Rejected on closed conversations.
pub async fn clear_agent_requested(db: &Database, id: &str) -> Result<(), CharlaError> {
    let id_owned = id.to_string();
    db.connection()
        .call(move |conn| {
            match select_by_id(conn, &id_owned)? {
                None => Ok(Outcome::Missing),
                Some(conv) if conv.status == ConversationStatus::Closed => Ok(Outcome::Closed),
                Some(_) => {
                    conn.execute(
                        "UPDATE conversations
                         SET agent_requested_at = NULL, assigned_user = NULL,
                             assigned_at = NULL, assigned_by = NULL
                         WHERE id = ?1 AND status != 'closed'",
                        params![id_owned],
                    )?;
                    Ok(Outcome::Done(()))
                }
            }
        })
        .await
        .map_err(map_tr_err)
        .and_then(|o| finish(o, id))
}

/// Assign the conversation to `target`.
///
/// Only permitted once a hand-off was requested. A non-privileged
/// actor may only claim an unassigned conversation for themselves; an
/// admin may reassign freely. The target user must exist.
pub async fn assign(
    db: &Database,
    id: &str,
    target_user_id: &str,
    actor: &User,
) -> Result<(), CharlaError> {
    let id_owned = id.to_string();
    let target = target_user_id.to_string();
    let actor_id = actor.id.clone();
    let actor_is_admin = actor.is_admin();
    let now = now_rfc3339();

    db.connection()
        .call(move |conn| {
            let conv = match select_by_id(conn, &id_owned)? {
                None => return Ok(Outcome::Missing),
                Some(conv) => conv,
            };
            if conv.status == ConversationStatus::Closed {
                return Ok(Outcome::Closed);
            }
            if conv.agent_requested_at.is_none() {
                return Ok(Outcome::Denied(
                    "no hand-off has been requested for this conversation".into(),
                ));
            }
            let target_exists: bool = conn
                .query_row(
                    "SELECT count(*) FROM users WHERE id = ?1",
                    params![target],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n > 0)?;
            if !target_exists {
                return Ok(Outcome::Denied(format!("user {target} does not exist")));
            }
            if !actor_is_admin {
                if conv.assigned_user.is_some() {
                    return Ok(Outcome::Denied(
                        "conversation is already assigned".into(),
                    ));
                }
                if target != actor_id {
                    return Ok(Outcome::Denied(
                        "non-privileged actors may only claim for themselves".into(),
                    ));
                }
            }
            conn.execute(
                "UPDATE conversations
                 SET assigned_user = ?1, assigned_at = ?2, assigned_by = ?3
                 WHERE id = ?4 AND status != 'closed'",
                params![target, now, actor_id, id_owned],
            )?;
            Ok(Outcome::Done(()))
        })
        .await
        .map_err(map_tr_err)
        .and_then(|o| finish(o, id))
}

/// Release the current assignment.
///
/// A non-privileged actor may only release a conversation assigned to
/// themselves; an admin may release any.
pub async fn release(db: &Database, id: &str, actor: &User) -> Result<(), CharlaError> {
    let id_owned = id.to_string();
    let actor_id = actor.id.clone();
    let actor_is_admin = actor.is_admin();

    db.connection()
        .call(move |conn| {
            let conv = match select_by_id(conn, &id_owned)? {
                None => return Ok(Outcome::Missing),
                Some(conv) => conv,
            };
            if conv.status == ConversationStatus::Closed {
                return Ok(Outcome::Closed);
            }
            if conv.agent_requested_at.is_none() {
                return Ok(Outcome::Denied(
                    "no hand-off has been requested for this conversation".into(),
                ));
            }
            if !actor_is_admin && conv.assigned_user.as_deref() != Some(actor_id.as_str()) {
                return Ok(Outcome::Denied(
                    "non-privileged actors may only release their own assignment".into(),
                ));
            }
            conn.execute(
                "UPDATE conversations
                 SET assigned_user = NULL, assigned_at = NULL, assigned_by = NULL
                 WHERE id = ?1 AND status != 'closed'",
                params![id_owned],
            )?;
            Ok(Outcome::Done(()))
        })
        .await
        .map_err(map_tr_err)
        .and_then(|o| finish(o, id))
}

/// Put the conversation on hold. Rejected on closed conversations.
pub async fn hold(
    db: &Database,
    id: &str,
    reason: Option<&str>,
    actor_id: &str,
) -> Result<(), CharlaError> {
    let id_owned = id.to_string();
    let reason = reason.map(String::from);
    let actor_id = actor_id.to_string();
    let now = now_rfc3339();
    db.connection()
        .call(move |conn| {
            match select_by_id(conn, &id_owned)? {
                None => Ok(Outcome::Missing),
                Some(conv) if conv.status == ConversationStatus::Closed => Ok(Outcome::Closed),
                Some(_) => {
                    conn.execute(
                        "UPDATE conversations
                         SET on_hold = 1, hold_reason = ?1, held_by = ?2, held_at = ?3
                         WHERE id = ?4 AND status != 'closed'",
                        params![reason, actor_id, now, id_owned],
                    )?;
                    Ok(Outcome::Done(()))
                }
            }
        })
        .await
        .map_err(map_tr_err)
        .and_then(|o| finish(o, id))
}

/// Clear the hold flag and metadata. Rejected on closed conversations.
pub async fn resume(db: &Database, id: &str) -> Result<(), CharlaError> {
    let id_owned = id.to_string();
    db.connection()
        .call(move |conn| {
            match select_by_id(conn, &id_owned)? {
                None => Ok(Outcome::Missing),
                Some(conv) if conv.status == ConversationStatus::Closed => Ok(Outcome::Closed),
                Some(_) => {
                    conn.execute(
                        "UPDATE conversations
                         SET on_hold = 0, hold_reason = NULL, held_by = NULL, held_at = NULL
                         WHERE id = ?1 AND status != 'closed'",
                        params![id_owned],
                    )?;
                    Ok(Outcome::Done(()))
                }
            }
        })
        .await
        .map_err(map_tr_err)
        .and_then(|o| finish(o, id))
}

/// Close the conversation: status=closed, ended_at=now (if unset),
/// hold fields cleared, closing actor recorded.
///
/// Idempotent toward closed: returns `Ok(false)` when the conversation
/// was already closed, `Ok(true)` when this call transitioned it.
pub async fn close(
    db: &Database,
    id: &str,
    closed_by: Option<&str>,
) -> Result<bool, CharlaError> {
    let id_owned = id.to_string();
    let closed_by = closed_by.map(String::from);
    let now = now_rfc3339();
    db.connection()
        .call(move |conn| {
            match select_by_id(conn, &id_owned)? {
                None => Ok(Outcome::Missing),
                Some(conv) if conv.status == ConversationStatus::Closed => Ok(Outcome::Done(false)),
                Some(_) => {
                    conn.execute(
                        "UPDATE conversations
                         SET status = 'closed',
                             ended_at = COALESCE(ended_at, ?1),
                             on_hold = 0, hold_reason = NULL, held_by = NULL,
                             held_at = NULL, closed_by = ?2
                         WHERE id = ?3 AND status != 'closed'",
                        params![now, closed_by, id_owned],
                    )?;
                    Ok(Outcome::Done(true))
                }
            }
        })
        .await
        .map_err(map_tr_err)
        .and_then(|o| finish(o, id))
}
