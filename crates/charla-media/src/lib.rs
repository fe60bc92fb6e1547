// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media pipeline for the Charla messaging backend: inbound attachment
//! materialization, on-demand reads, and outbound audio transcoding.

pub mod resolver;
pub mod transcode;

pub use resolver::{materialize_inbound, read_attachment, InboundMedia};
pub use transcode::{transcode_to_aac, TranscodeConfig, OUTPUT_MIME};
