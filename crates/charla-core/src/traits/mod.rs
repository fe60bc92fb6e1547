// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the seams of the ingestion pipeline.

pub mod media;
pub mod sender;

pub use media::MediaFetcher;
pub use sender::OutboundSender;
