// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound audio re-encoding.
//!
//! Agent-submitted audio of arbitrary codec is forced through ffmpeg
//! to mono/48kHz AAC-LC in an MP4 container before upload. The child
//! process runs with a hard wall-clock timeout and private scratch
//! files; every exit path cleans up via the temp handles' Drop.

use std::process::Stdio;
use std::time::Duration;

use charla_core::CharlaError;
use tokio::process::Command;
use tracing::debug;

/// Settings for a single transcode run.
#[derive(Debug, Clone)]
pub struct TranscodeConfig {
    /// Path to the ffmpeg binary.
    pub ffmpeg_path: String,
    /// Hard wall-clock limit for the child process.
    pub timeout: Duration,
    /// Provider's maximum payload size; the run fails before any
    /// upload is attempted when the output exceeds it.
    pub max_output_bytes: u64,
}

/// MIME type of the transcode output.
pub const OUTPUT_MIME: &str = "audio/mp4";

/// Re-encode `input` to mono/48kHz AAC-LC in an MP4 container.
///
/// On non-zero exit the error carries ffmpeg's stderr. On timeout the
/// child is killed and a [`CharlaError::Timeout`] is returned.
pub async fn transcode_to_aac(
    config: &TranscodeConfig,
    input: &[u8],
) -> Result<Vec<u8>, CharlaError> {
    let scratch = tempfile::tempdir().map_err(|e| CharlaError::Internal(format!(
        "failed to create transcode scratch dir: {e}"
    )))?;
    let in_path = scratch.path().join("in.bin");
    let out_path = scratch.path().join("out.m4a");

    tokio::fs::write(&in_path, input)
        .await
        .map_err(|e| CharlaError::Internal(format!("failed to write scratch input: {e}")))?;

    let mut cmd = Command::new(&config.ffmpeg_path);
    cmd.arg("-hide_banner")
        .arg("-y")
        .arg("-i")
        .arg(&in_path)
        .args(["-ac", "1", "-ar", "48000", "-c:a", "aac", "-profile:a", "aac_low"])
        .arg(&out_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        // Dropping the wait future on timeout must take the child with it.
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| CharlaError::Transcode {
        detail: format!("failed to launch {}: {e}", config.ffmpeg_path),
    })?;

    let output = tokio::time::timeout(config.timeout, child.wait_with_output())
        .await
        .map_err(|_| CharlaError::Timeout {
            duration: config.timeout,
        })?
        .map_err(|e| CharlaError::Transcode {
            detail: format!("failed to collect ffmpeg output: {e}"),
        })?;

    if !output.status.success() {
        return Err(CharlaError::Transcode {
            detail: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let bytes = tokio::fs::read(&out_path)
        .await
        .map_err(|e| CharlaError::Transcode {
            detail: format!("ffmpeg produced no readable output: {e}"),
        })?;

    if bytes.len() as u64 > config.max_output_bytes {
        return Err(CharlaError::Transcode {
            detail: format!(
                "encoded output is {} bytes, exceeding the provider limit of {}",
                bytes.len(),
                config.max_output_bytes
            ),
        });
    }

    debug!(input = input.len(), output = bytes.len(), "audio transcoded");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable shell script standing in for ffmpeg.
    fn fake_tool(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("fake-ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn config(ffmpeg_path: String) -> TranscodeConfig {
        TranscodeConfig {
            ffmpeg_path,
            timeout: Duration::from_millis(500),
            max_output_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn successful_run_returns_output_bytes() {
        let dir = tempfile::tempdir().unwrap();
        // The output path is the last argument.
        let tool = fake_tool(&dir, r#"for last; do :; done; printf encoded > "$last""#);
        let out = transcode_to_aac(&config(tool), b"raw audio").await.unwrap();
        assert_eq!(out, b"encoded");
    }

    #[tokio::test]
    async fn nonzero_exit_surfaces_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(&dir, r#"echo "unknown codec" >&2; exit 1"#);
        let err = transcode_to_aac(&config(tool), b"raw").await.unwrap_err();
        match err {
            CharlaError::Transcode { detail } => assert!(detail.contains("unknown codec")),
            other => panic!("expected Transcode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hung_tool_hits_the_wall_clock_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(&dir, "sleep 30");
        let err = transcode_to_aac(&config(tool), b"raw").await.unwrap_err();
        assert!(matches!(err, CharlaError::Timeout { .. }));
    }

    #[tokio::test]
    async fn oversized_output_fails_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(
            &dir,
            r#"for last; do :; done; head -c 2048 /dev/zero > "$last""#,
        );
        let err = transcode_to_aac(&config(tool), b"raw").await.unwrap_err();
        match err {
            CharlaError::Transcode { detail } => {
                assert!(detail.contains("exceeding the provider limit"))
            }
            other => panic!("expected Transcode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_a_clean_failure() {
        let err = transcode_to_aac(&config("/nonexistent/ffmpeg".into()), b"raw")
            .await
            .unwrap_err();
        assert!(matches!(err, CharlaError::Transcode { .. }));
    }
}
