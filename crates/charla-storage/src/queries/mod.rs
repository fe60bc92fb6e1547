// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and runs on the
//! single background writer thread.

pub mod attachments;
pub mod contacts;
pub mod conversations;
pub mod integrations;
pub mod messages;
pub mod users;
