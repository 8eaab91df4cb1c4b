//! Chunked, session-authenticated video export client for NVR appliances.
//!
//! Splits a requested time range into appliance-sized windows, authenticates
//! a fresh session per chunk, streams each chunk to disk and optionally
//! remuxes the container losslessly. Progress is published as a finite
//! sequence of [`StatusEvent`]s over a channel.
//!
//! ```no_run
//! use chrono::{TimeZone, Utc};
//! use protect_export::{CameraRef, Credential, ExportConfig, ExportJob, StatusSink};
//!
//! # async fn run() -> Result<(), protect_export::ExportError> {
//! let config = ExportConfig::new("nvr.local")?
//!     .with_accept_invalid_certs(true)
//!     .with_output_dir("exports");
//! let (sink, _events) = StatusSink::channel();
//!
//! let outputs = ExportJob::new(
//!     config,
//!     Credential::new("viewer", "secret"),
//!     vec![CameraRef::named("abcdef012345", "Front Door")],
//!     Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2023, 1, 1, 2, 30, 0).unwrap(),
//! )
//! .with_status_sink(sink)
//! .run()
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod planner;
pub mod remux;
pub mod status;

pub use auth::Credential;
pub use client::{CookieJar, HttpClient};
pub use config::ExportConfig;
pub use download::DownloadOutcome;
pub use error::ExportError;
pub use export::{CameraRef, ExportJob, OutputFile};
pub use planner::{TimeWindow, split_windows};
pub use remux::{FfmpegRemuxer, Remuxer};
pub use status::{StatusEvent, StatusSink};
