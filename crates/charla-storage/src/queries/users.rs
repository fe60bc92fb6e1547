// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal console-user queries, used to validate assignment targets.

use charla_core::CharlaError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::User;

/// Insert a user.
pub async fn create_user(db: &Database, user: &User) -> Result<(), CharlaError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, tenant_id, name, role) VALUES (?1, ?2, ?3, ?4)",
                params![user.id, user.tenant_id, user.name, user.role],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a user by id.
pub async fn get_user(db: &Database, id: &str) -> Result<Option<User>, CharlaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT id, tenant_id, name, role FROM users WHERE id = ?1")?;
            match stmt.query_row(params![id], |row| {
                Ok(User {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    name: row.get(2)?,
                    role: row.get(3)?,
                })
            }) {
                Ok(user) => Ok(Some(user)),
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
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_and_get_user() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let user = User {
            id: "u1".into(),
            tenant_id: "t1".into(),
            name: "Luisa".into(),
            role: "admin".into(),
        };
        create_user(&db, &user).await.unwrap();
        let loaded = get_user(&db, "u1").await.unwrap().unwrap();
        assert!(loaded.is_admin());
        assert!(get_user(&db, "missing").await.unwrap().is_none());
    }
}
