// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Charla messaging backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject
//! unrecognized config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Charla configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with
/// environment variable overrides. All sections are optional and
/// default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CharlaConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Webhook HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Idle auto-close settings.
    #[serde(default)]
    pub autoclose: AutoCloseConfig,

    /// Media download and transcode settings.
    #[serde(default)]
    pub media: MediaConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the service.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "charla".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Webhook HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8085
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("charla").join("charla.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "charla.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Idle auto-close configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoCloseConfig {
    /// Idle window in hours before an untouched conversation is closed.
    #[serde(default = "default_idle_hours")]
    pub idle_hours: u64,

    /// Template sent (best-effort) when a conversation auto-closes.
    #[serde(default = "default_farewell_template")]
    pub farewell_template: String,

    /// Language variants tried, in order, when sending templates.
    #[serde(default = "default_template_languages")]
    pub template_languages: Vec<String>,
}

impl Default for AutoCloseConfig {
    fn default() -> Self {
        Self {
            idle_hours: default_idle_hours(),
            farewell_template: default_farewell_template(),
            template_languages: default_template_languages(),
        }
    }
}

fn default_idle_hours() -> u64 {
    23
}

fn default_farewell_template() -> String {
    "conversation_closed".to_string()
}

fn default_template_languages() -> Vec<String> {
    vec!["es".to_string(), "en_US".to_string()]
}

/// Media download and transcode configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Path to the ffmpeg binary used for audio re-encoding.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Hard wall-clock timeout for a single transcode run, in seconds.
    #[serde(default = "default_transcode_timeout_secs")]
    pub transcode_timeout_secs: u64,

    /// Maximum payload the provider accepts for an upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            transcode_timeout_secs: default_transcode_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_transcode_timeout_secs() -> u64 {
    20
}

fn default_max_upload_bytes() -> u64 {
    16 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = CharlaConfig::default();
        assert_eq!(config.agent.name, "charla");
        assert_eq!(config.server.port, 8085);
        assert_eq!(config.autoclose.idle_hours, 23);
        assert_eq!(config.media.max_upload_bytes, 16 * 1024 * 1024);
        assert!(config.storage.wal_mode);
    }

    #[test]
    fn template_languages_default_spanish_first() {
        let config = AutoCloseConfig::default();
        assert_eq!(config.template_languages, vec!["es", "en_US"]);
    }
}
