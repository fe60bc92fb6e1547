// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! All timestamps are RFC 3339 strings in UTC. Ids are UUIDv4 strings.

use charla_core::{ConversationStatus, Sender};
use serde::{Deserialize, Serialize};

/// A tenant's messaging provider integration, looked up by routing key
/// (`phone_number_id`) on every inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub id: String,
    pub tenant_id: String,
    pub provider: String,
    pub phone_number_id: String,
    pub base_url: String,
    pub api_version: String,
    pub access_token: String,
    pub verify_token: String,
    /// Selects which registered flow handles this tenant's conversations.
    pub flow_key: String,
    pub active: bool,
    pub created_at: String,
}

/// A WhatsApp contact, unique by (tenant, phone).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub tenant_id: String,
    pub name: Option<String>,
    pub phone: String,
    pub country: Option<String>,
    pub status: String,
    pub last_message_at: Option<String>,
    pub welcome_sent: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A conversation between a contact and the system.
///
/// At most one open conversation exists per (tenant, contact); a closed
/// conversation never transitions back to open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    pub contact_id: String,
    pub status: ConversationStatus,
    pub started_at: String,
    pub last_activity_at: String,
    pub ended_at: Option<String>,
    pub on_hold: bool,
    pub hold_reason: Option<String>,
    pub held_by: Option<String>,
    pub held_at: Option<String>,
    /// Presence signals a pending human hand-off request.
    pub agent_requested_at: Option<String>,
    pub assigned_user: Option<String>,
    pub assigned_at: Option<String>,
    pub assigned_by: Option<String>,
    pub closed_by: Option<String>,
    pub total_messages: i64,
    pub bot_messages: i64,
}

impl Conversation {
    /// True while a hand-off has been requested and the conversation is
    /// still open, independent of whether an agent has claimed it.
    pub fn handoff_active(&self) -> bool {
        self.agent_requested_at.is_some() && self.status == ConversationStatus::Open
    }
}

/// A single message inside a conversation. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub tenant_id: String,
    pub conversation_id: String,
    pub contact_id: String,
    pub sender: Sender,
    /// Provider message type (`text`, `image`, `audio`, ...).
    pub kind: String,
    pub body: Option<String>,
    pub sent_at: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub created_at: String,
}

/// Binary payload attached to a message.
///
/// When `storage` is `whatsapp` and `data` is NULL, content is fetched
/// from the provider on demand and never persisted back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub message_id: String,
    pub filename: Option<String>,
    pub mime_type: String,
    pub byte_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    pub storage: String,
    pub media_ref: Option<String>,
    pub uploaded_at: String,
}

/// Minimal console user record, just enough to validate assignment
/// targets and distinguish privileged actors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub role: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
