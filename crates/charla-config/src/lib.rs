// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Charla messaging backend.
//!
//! Layered TOML configuration (compiled defaults, system, XDG user,
//! local directory) with `CHARLA_*` environment variable overrides.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CharlaConfig;
