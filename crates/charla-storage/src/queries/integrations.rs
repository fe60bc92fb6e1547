// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration lookup: tenant resolution and webhook handshake checks.

use charla_core::CharlaError;
use rusqlite::params;

use crate::database::{map_tr_err, now_rfc3339, Database};
use crate::models::Integration;

const COLUMNS: &str = "id, tenant_id, provider, phone_number_id, base_url, api_version,
     access_token, verify_token, flow_key, active, created_at";

fn row_to_integration(row: &rusqlite::Row<'_>) -> rusqlite::Result<Integration> {
    Ok(Integration {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        provider: row.get(2)?,
        phone_number_id: row.get(3)?,
        base_url: row.get(4)?,
        api_version: row.get(5)?,
        access_token: row.get(6)?,
        verify_token: row.get(7)?,
        flow_key: row.get(8)?,
        active: row.get::<_, i64>(9)? != 0,
        created_at: row.get(10)?,
    })
}

/// Look up the unique active integration for a routing key.
///
/// Returns `None` on a routing miss -- unknown routes are expected
/// noise, not an error.
pub async fn find_active_by_routing_key(
    db: &Database,
    phone_number_id: &str,
) -> Result<Option<Integration>, CharlaError> {
    let phone_number_id = phone_number_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM integrations
                 WHERE phone_number_id = ?1 AND active = 1"
            ))?;
            let result = stmt.query_row(params![phone_number_id], row_to_integration);
            match result {
                Ok(integration) => Ok(Some(integration)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Side-effect-free handshake check: true iff an active integration
/// exists for the routing key and its stored verification secret
/// equals the supplied one.
pub async fn verify_handshake(
    db: &Database,
    phone_number_id: &str,
    verify_token: &str,
) -> Result<bool, CharlaError> {
    let integration = find_active_by_routing_key(db, phone_number_id).await?;
    Ok(matches!(integration, Some(i) if i.verify_token == verify_token))
}

/// Register a new integration.
pub async fn create_integration(
    db: &Database,
    integration: &Integration,
) -> Result<(), CharlaError> {
    let integration = integration.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO integrations (id, tenant_id, provider, phone_number_id,
                     base_url, api_version, access_token, verify_token, flow_key,
                     active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    integration.id,
                    integration.tenant_id,
                    integration.provider,
                    integration.phone_number_id,
                    integration.base_url,
                    integration.api_version,
                    integration.access_token,
                    integration.verify_token,
                    integration.flow_key,
                    integration.active as i64,
                    integration.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Convenience constructor used by tests and seeding.
pub fn new_integration(tenant_id: &str, phone_number_id: &str, verify_token: &str) -> Integration {
    Integration {
        id: uuid::Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        provider: "whatsapp".to_string(),
        phone_number_id: phone_number_id.to_string(),
        base_url: "https://graph.facebook.com".to_string(),
        api_version: "v20.0".to_string(),
        access_token: "test-token".to_string(),
        verify_token: verify_token.to_string(),
        flow_key: "catalog_menu".to_string(),
        active: true,
        created_at: now_rfc3339(),
    }
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
    async fn routing_key_resolves_active_integration() {
        let (db, _dir) = setup_db().await;
        let integration = new_integration("tenant-1", "15550001111", "secret");
        create_integration(&db, &integration).await.unwrap();

        let found = find_active_by_routing_key(&db, "15550001111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.tenant_id, "tenant-1");
        assert_eq!(found.flow_key, "catalog_menu");
    }

    #[tokio::test]
    async fn routing_miss_returns_none() {
        let (db, _dir) = setup_db().await;
        let found = find_active_by_routing_key(&db, "00000000000").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn inactive_integration_is_not_resolved() {
        let (db, _dir) = setup_db().await;
        let mut integration = new_integration("tenant-1", "15550001111", "secret");
        integration.active = false;
        create_integration(&db, &integration).await.unwrap();

        let found = find_active_by_routing_key(&db, "15550001111").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn handshake_requires_matching_secret() {
        let (db, _dir) = setup_db().await;
        let integration = new_integration("tenant-1", "15550001111", "secret");
        create_integration(&db, &integration).await.unwrap();

        assert!(verify_handshake(&db, "15550001111", "secret").await.unwrap());
        assert!(!verify_handshake(&db, "15550001111", "wrong").await.unwrap());
        assert!(!verify_handshake(&db, "99999999999", "secret").await.unwrap());
    }
}
