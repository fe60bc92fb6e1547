// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook gateway: the HTTP surface and the inbound pipeline behind
//! it. Tenant resolution, contact/conversation persistence, attachment
//! materialization, auto-close arming, and flow dispatch all hang off
//! one POSTed delivery; the provider is always answered with 200.

pub mod autoclose;
pub mod ingest;
pub mod server;

pub use autoclose::{AutoCloseScheduler, AutoCloseSettings};
pub use ingest::{ClientFactory, CloudApiFactory, TenantCtx};
pub use server::{router, AppState};
