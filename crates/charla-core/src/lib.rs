// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Charla messaging backend.
//!
//! Provides the shared error type, common types, and the adapter
//! traits (outbound sender, media fetcher) that sit at the seams
//! between the ingestion pipeline, the flow engine, and the
//! WhatsApp Cloud API client.

pub mod error;
pub mod traits;
pub mod types;

pub use error::CharlaError;
pub use traits::{MediaFetcher, OutboundSender};
pub use types::{ConversationStatus, Language, MediaInfo, SendReceipt, Sender};
