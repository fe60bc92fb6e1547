// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact find-or-create, keyed by (tenant, phone).

use charla_core::CharlaError;
use rusqlite::params;

use crate::database::{map_tr_err, now_rfc3339, Database};
use crate::models::Contact;

const COLUMNS: &str = "id, tenant_id, name, phone, country, status, last_message_at,
     welcome_sent, created_at, updated_at";

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        country: row.get(4)?,
        status: row.get(5)?,
        last_message_at: row.get(6)?,
        welcome_sent: row.get::<_, i64>(7)? != 0,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn select_by_phone(
    conn: &rusqlite::Connection,
    tenant_id: &str,
    phone: &str,
) -> rusqlite::Result<Option<Contact>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM contacts WHERE tenant_id = ?1 AND phone = ?2"
    ))?;
    match stmt.query_row(params![tenant_id, phone], row_to_contact) {
        Ok(contact) => Ok(Some(contact)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Find a contact by phone number within a tenant.
pub async fn find_by_phone(
    db: &Database,
    tenant_id: &str,
    phone: &str,
) -> Result<Option<Contact>, CharlaError> {
    let tenant_id = tenant_id.to_string();
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| select_by_phone(conn, &tenant_id, &phone))
        .await
        .map_err(map_tr_err)
}

/// Find-or-create the sender's contact for an inbound event.
///
/// If absent: created with status=active, welcome_sent=false. If
/// present: display name is refreshed (the provider-supplied profile
/// name wins when non-empty), last_message_at bumped, and status
/// forced back to active.
pub async fn upsert_inbound(
    db: &Database,
    tenant_id: &str,
    phone: &str,
    profile_name: Option<&str>,
) -> Result<Contact, CharlaError> {
    let tenant_id = tenant_id.to_string();
    let phone = phone.to_string();
    let profile_name = profile_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);
    let now = now_rfc3339();
    let new_id = uuid::Uuid::new_v4().to_string();

    db.connection()
        .call(move |conn| {
            if let Some(existing) = select_by_phone(conn, &tenant_id, &phone)? {
                let name = profile_name.or(existing.name);
                conn.execute(
                    "UPDATE contacts
                     SET name = ?1, status = 'active', last_message_at = ?2, updated_at = ?2
                     WHERE id = ?3",
                    params![name, now, existing.id],
                )?;
            } else {
                conn.execute(
                    "INSERT INTO contacts (id, tenant_id, name, phone, country, status,
                         last_message_at, welcome_sent, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, NULL, 'active', ?5, 0, ?5, ?5)",
                    params![new_id, tenant_id, profile_name, phone, now],
                )?;
            }
            // Re-select so the caller sees exactly what was written.
            match select_by_phone(conn, &tenant_id, &phone)? {
                Some(contact) => Ok(contact),
                None => Err(rusqlite::Error::QueryReturnedNoRows),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Record that the first bot response has been sent to this contact.
pub async fn mark_welcome_sent(db: &Database, contact_id: &str) -> Result<(), CharlaError> {
    let contact_id = contact_id.to_string();
    let now = now_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts SET welcome_sent = 1, updated_at = ?1 WHERE id = ?2",
                params![now, contact_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn first_inbound_creates_active_contact() {
        let (db, _dir) = setup_db().await;
        let contact = upsert_inbound(&db, "t1", "5215550001111", Some("Ana"))
            .await
            .unwrap();
        assert_eq!(contact.status, "active");
        assert_eq!(contact.name.as_deref(), Some("Ana"));
        assert!(!contact.welcome_sent);
        assert!(contact.last_message_at.is_some());
    }

    #[tokio::test]
    async fn second_inbound_updates_not_duplicates() {
        let (db, _dir) = setup_db().await;
        let first = upsert_inbound(&db, "t1", "5215550001111", Some("Ana"))
            .await
            .unwrap();
        let second = upsert_inbound(&db, "t1", "5215550001111", Some("Ana Maria"))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name.as_deref(), Some("Ana Maria"));
    }

    #[tokio::test]
    async fn empty_profile_name_does_not_clobber_existing() {
        let (db, _dir) = setup_db().await;
        upsert_inbound(&db, "t1", "5215550001111", Some("Ana"))
            .await
            .unwrap();
        let updated = upsert_inbound(&db, "t1", "5215550001111", Some("  "))
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn contacts_are_tenant_scoped() {
        let (db, _dir) = setup_db().await;
        let a = upsert_inbound(&db, "t1", "5215550001111", None).await.unwrap();
        let b = upsert_inbound(&db, "t2", "5215550001111", None).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn welcome_flag_sticks() {
        let (db, _dir) = setup_db().await;
        let contact = upsert_inbound(&db, "t1", "5215550001111", None)
            .await
            .unwrap();
        mark_welcome_sent(&db, &contact.id).await.unwrap();
        let reloaded = find_by_phone(&db, "t1", "5215550001111")
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.welcome_sent);
    }
}
