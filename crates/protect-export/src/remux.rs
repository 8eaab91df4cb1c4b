//! Lossless container remuxing through an external ffmpeg process.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::ExportError;

/// Copies already-encoded streams into a different container, without
/// re-encoding. Implementations must never delete the input file; the caller
/// does that, and only after a successful remux.
#[async_trait]
pub trait Remuxer: Send + Sync {
    async fn remux(&self, input: &Path, output: &Path) -> Result<(), ExportError>;

    /// Version banner of the backing tool, when one can be probed.
    fn version(&self) -> Option<String> {
        None
    }
}

/// Remuxer backed by the `ffmpeg` binary (`-c copy`).
pub struct FfmpegRemuxer {
    binary: String,
}

impl FfmpegRemuxer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

}

impl Default for FfmpegRemuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    /// Probe the configured binary, returning its first banner line when it
    /// is runnable.
    fn version(&self) -> Option<String> {
        std::process::Command::new(&self.binary)
            .arg("-version")
            .output()
            .ok()
            .and_then(|output| {
                String::from_utf8(output.stdout)
                    .ok()
                    .and_then(|s| s.lines().next().map(|l| l.to_owned()))
            })
    }

    async fn remux(&self, input: &Path, output: &Path) -> Result<(), ExportError> {
        debug!(
            input = %input.display(),
            output = %output.display(),
            "remuxing container"
        );

        let result = tokio::process::Command::new(&self.binary)
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .arg("-i")
            .arg(input)
            .args(["-c", "copy"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ExportError::remux(input, format!("failed to spawn {}: {e}", self.binary)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ExportError::remux(
                input,
                format!("{} exited with {}: {}", self.binary, result.status, stderr.trim()),
            ));
        }

        info!(output = %output.display(), "remux complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_probe_reports_missing_binary_as_none() {
        let remuxer = FfmpegRemuxer::new("ffmpeg-binary-that-does-not-exist");
        assert_eq!(remuxer.version(), None);
    }

    #[test]
    fn version_probe_reads_first_output_line() {
        // `echo` stands in for ffmpeg: the probe passes `-version` and keeps
        // the first stdout line.
        let remuxer = FfmpegRemuxer::new("echo");
        assert_eq!(remuxer.version(), Some("-version".to_owned()));
    }
}
