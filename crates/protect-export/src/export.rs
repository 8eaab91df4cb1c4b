//! Drives a whole export job: windows × cameras, sequentially.
//!
//! Each (window, camera) pair is authenticated, downloaded and optionally
//! remuxed to completion before the next begins; the appliance gets one
//! active session at a time and destination files are never contended.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{Credential, authenticate};
use crate::client::HttpClient;
use crate::config::ExportConfig;
use crate::download::download;
use crate::error::ExportError;
use crate::planner::split_windows;
use crate::remux::{FfmpegRemuxer, Remuxer};
use crate::status::{StatusEvent, StatusSink, format_throughput};

/// A camera managed by the appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraRef {
    /// Appliance-side camera id, used in export URLs.
    pub id: String,
    /// Display name, used only for file naming and status labels.
    pub name: Option<String>,
}

impl CameraRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    /// Display label, falling back to the id when no name is set.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Record of one completed download/convert step.
///
/// `start` and `end` are the job's overall requested range, not the chunk's
/// window; consumers group records by job that way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFile {
    pub camera: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub path: PathBuf,
}

/// A configured export job, ready to run.
pub struct ExportJob {
    config: ExportConfig,
    credential: Credential,
    cameras: Vec<CameraRef>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    mp4: bool,
    remuxer: Box<dyn Remuxer>,
    sink: StatusSink,
}

impl ExportJob {
    pub fn new(
        config: ExportConfig,
        credential: Credential,
        cameras: Vec<CameraRef>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        let remuxer = FfmpegRemuxer::new(config.ffmpeg_path.clone());
        Self {
            config,
            credential,
            cameras,
            start,
            end,
            mp4: true,
            remuxer: Box::new(remuxer),
            sink: StatusSink::disabled(),
        }
    }

    /// Keep the downloaded `.mp4` files as-is (`true`, the default), or
    /// remux each chunk into `.mkv` and drop the original (`false`).
    pub fn with_mp4(mut self, mp4: bool) -> Self {
        self.mp4 = mp4;
        self
    }

    /// Swap the remux backend. Mainly a seam for tests and for callers with
    /// their own transcode service.
    pub fn with_remuxer(mut self, remuxer: Box<dyn Remuxer>) -> Self {
        self.remuxer = remuxer;
        self
    }

    /// Subscribe a status consumer; see [`StatusSink::channel`].
    pub fn with_status_sink(mut self, sink: StatusSink) -> Self {
        self.sink = sink;
        self
    }

    /// Run the job to completion.
    ///
    /// Windows are the outer loop: every camera is exported for a window
    /// before the job advances to the next window. Any fatal error aborts
    /// the remaining pairs; already-written files stay on disk, and a re-run
    /// skips every non-empty destination it finds.
    pub async fn run(&self) -> Result<Vec<OutputFile>, ExportError> {
        let client = HttpClient::new(&self.config)?;
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| self.fail(ExportError::Io { source: e }))?;

        info!(
            cameras = self.cameras.len(),
            start = %self.start,
            end = %self.end,
            "starting export job"
        );

        if !self.mp4 {
            match self.remuxer.version() {
                Some(version) => debug!(version = %version, "remux backend detected"),
                None => warn!("remux backend did not answer a version probe"),
            }
        }

        let mut outputs = Vec::new();
        for window in split_windows(self.start, self.end, self.config.max_window) {
            for camera in &self.cameras {
                let dest = self.config.destination(&window, camera.label());

                match existing_destination(&dest)
                    .await
                    .map_err(|e| self.fail(e))?
                {
                    Existing::Complete => {
                        info!(
                            camera = camera.label(),
                            dest = %dest.display(),
                            "destination already exists, skipping chunk"
                        );
                        continue;
                    }
                    Existing::Absent => {}
                }

                // A fresh session per chunk: appliance sessions expire over
                // multi-hour jobs, and a login round-trip is cheap next to a
                // chunk transfer.
                let jar = authenticate(&client, &self.config, &self.credential)
                    .await
                    .map_err(|e| self.fail(e))?;

                let url = self.config.export_url(&camera.id, &window);
                debug!(camera = camera.label(), url = %url, "downloading chunk");

                let started = Instant::now();
                let outcome = download(&client, &url, &jar, &dest, &self.sink).await?;
                let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);

                let rate = format_throughput(outcome.bytes_written as f64 / elapsed);
                info!(
                    camera = camera.label(),
                    bytes = outcome.bytes_written,
                    elapsed_secs = elapsed,
                    rate = %rate,
                    "chunk complete"
                );
                self.sink.emit(StatusEvent::Throughput { rate });

                let final_path = if self.mp4 {
                    dest
                } else {
                    self.convert_to_mkv(&dest).await?
                };

                outputs.push(OutputFile {
                    camera: camera.label().to_owned(),
                    start: self.start,
                    end: self.end,
                    path: final_path,
                });
            }
        }

        info!(outputs = outputs.len(), "export job finished");
        Ok(outputs)
    }

    /// Remux `dest` into an `.mkv` sibling, then remove the original.
    ///
    /// The source is only deleted once the remux reported success, so a
    /// failed conversion never loses downloaded footage.
    async fn convert_to_mkv(&self, dest: &Path) -> Result<PathBuf, ExportError> {
        self.sink.emit(StatusEvent::Converting);
        let mkv = dest.with_extension("mkv");
        self.remuxer
            .remux(dest, &mkv)
            .await
            .map_err(|e| self.fail(e))?;
        tokio::fs::remove_file(dest)
            .await
            .map_err(|e| self.fail(ExportError::Io { source: e }))?;
        Ok(mkv)
    }

    fn fail(&self, err: ExportError) -> ExportError {
        self.sink.emit(StatusEvent::Error {
            message: err.to_string(),
        });
        err
    }
}

enum Existing {
    /// A non-empty file is already there; the chunk is done.
    Complete,
    /// Nothing usable on disk; download the chunk.
    Absent,
}

/// Apply the skip-if-exists rule for one destination.
///
/// A non-empty file is a completed prior chunk and is kept untouched. A
/// zero-byte file is a failed prior attempt; it is deleted so the download
/// can start clean.
async fn existing_destination(dest: &Path) -> Result<Existing, ExportError> {
    match tokio::fs::metadata(dest).await {
        Ok(meta) if meta.len() > 0 => Ok(Existing::Complete),
        Ok(_) => {
            debug!(dest = %dest.display(), "removing zero-byte leftover");
            tokio::fs::remove_file(dest).await?;
            Ok(Existing::Absent)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Existing::Absent),
        Err(e) => Err(ExportError::Io { source: e }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_label_falls_back_to_id() {
        assert_eq!(CameraRef::new("abc123").label(), "abc123");
        assert_eq!(CameraRef::named("abc123", "Front Door").label(), "Front Door");
    }

    #[tokio::test]
    async fn missing_destination_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.mp4");
        assert!(matches!(
            existing_destination(&dest).await.unwrap(),
            Existing::Absent
        ));
    }

    #[tokio::test]
    async fn non_empty_destination_is_complete_and_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("done.mp4");
        std::fs::write(&dest, b"footage").unwrap();

        assert!(matches!(
            existing_destination(&dest).await.unwrap(),
            Existing::Complete
        ));
        assert_eq!(std::fs::read(&dest).unwrap(), b"footage");
    }

    #[tokio::test]
    async fn zero_byte_destination_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("failed.mp4");
        std::fs::write(&dest, b"").unwrap();

        assert!(matches!(
            existing_destination(&dest).await.unwrap(),
            Existing::Absent
        ));
        assert!(!dest.exists());
    }
}
