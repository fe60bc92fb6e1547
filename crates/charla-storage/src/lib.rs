// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Charla messaging backend.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed
//! query modules for integrations, contacts, conversations, messages,
//! attachments, and users.
//!
//! Conversation invariants are enforced here, not only in callers: a
//! partial unique index allows at most one open conversation per
//! (tenant, contact), and every state transition re-checks the current
//! status inside the single-writer closure, so a closed conversation
//! cannot be resurrected through any entry point.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
