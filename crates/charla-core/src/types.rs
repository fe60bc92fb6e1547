// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Charla workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The end user on WhatsApp.
    Contact,
    /// A human agent replying from the console.
    Agent,
    /// The automated flow engine.
    Bot,
}

/// Lifecycle status of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Open,
    Closed,
}

/// Languages the flow engine can render prompts in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Es,
    En,
}

/// Result of a successful outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// HTTP status returned by the provider.
    pub status: u16,
    /// Provider-assigned message id, when one was returned.
    pub message_id: Option<String>,
}

/// Short-lived download handle for provider-hosted media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    /// Temporary URL the bytes can be fetched from.
    pub url: String,
    /// MIME type reported by the provider.
    pub mime_type: String,
    /// Size in bytes, when reported.
    pub file_size: Option<u64>,
}
