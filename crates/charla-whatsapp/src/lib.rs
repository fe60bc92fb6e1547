// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API integration for the Charla messaging backend.
//!
//! Provides the outbound client (implementing [`charla_core::OutboundSender`]
//! and [`charla_core::MediaFetcher`]) and the serde types for inbound
//! webhook deliveries.

pub mod client;
pub mod media;
pub mod webhook;

pub use client::{WhatsAppClient, SUPPORTED_AUDIO_MIME};
pub use webhook::{ChangeValue, WaMessage, WebhookPayload};
