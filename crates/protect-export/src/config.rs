use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use url::Url;

use crate::error::ExportError;
use crate::planner::TimeWindow;

pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Path of the appliance's session login endpoint.
const LOGIN_PATH: &str = "/api/auth/login";

/// Path of the appliance's bulk video export endpoint.
const EXPORT_PATH: &str = "/proxy/protect/api/video/export";

/// Configurable options for an export job.
///
/// Constructed with [`ExportConfig::new`] for a standard appliance
/// (`https://{host}:443`); the `with_*` builders adjust the rest.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Base URL of the appliance, normally `https://{host}:443`.
    base: Url,

    /// Trust the appliance's TLS certificate even when it does not verify.
    ///
    /// NVR appliances commonly present self-signed certificates. This is a
    /// deliberate, security-relevant trust decision, so it is off by default
    /// and must be enabled explicitly.
    pub accept_invalid_certs: bool,

    /// Connection timeout (time to establish the initial connection).
    pub connect_timeout: Duration,

    /// Overall timeout for an entire HTTP request. Zero disables it; export
    /// responses stream for minutes, so there is no overall cap by default.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Directory that downloaded chunk files are written into.
    pub output_dir: PathBuf,

    /// Maximum duration of a single export window.
    pub max_window: TimeDelta,

    /// Path of the ffmpeg binary used for container remuxing.
    pub ffmpeg_path: String,
}

impl ExportConfig {
    /// Create a configuration for an appliance reachable at `host`
    /// (hostname or IP address, without scheme or port).
    pub fn new(host: impl AsRef<str>) -> Result<Self, ExportError> {
        let host = host.as_ref();
        let base = Url::parse(&format!("https://{host}:443/"))
            .map_err(|e| ExportError::invalid_url(host, e.to_string()))?;
        Ok(Self::with_base_url(base))
    }

    /// Create a configuration from a full base URL. Intended for
    /// non-standard deployments (reverse proxies, alternate ports) and for
    /// tests running against an in-process appliance.
    pub fn with_base_url(base: Url) -> Self {
        Self {
            base,
            accept_invalid_certs: false,
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::ZERO,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            output_dir: PathBuf::from("."),
            max_window: TimeDelta::minutes(60),
            ffmpeg_path: "ffmpeg".to_owned(),
        }
    }

    /// Opt in to trusting the appliance's certificate without verification.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_max_window(mut self, max_window: TimeDelta) -> Self {
        self.max_window = max_window;
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// URL of the session login endpoint.
    pub fn login_url(&self) -> Url {
        let mut url = self.base.clone();
        url.set_path(LOGIN_PATH);
        url
    }

    /// URL of the export endpoint for one camera and one time window.
    ///
    /// Window boundaries are expressed as millisecond epoch timestamps, the
    /// only format the appliance accepts.
    pub fn export_url(&self, camera_id: &str, window: &TimeWindow) -> Url {
        let mut url = self.base.clone();
        url.set_path(EXPORT_PATH);
        url.query_pairs_mut()
            .append_pair("camera", camera_id)
            .append_pair("start", &window.start.timestamp_millis().to_string())
            .append_pair("end", &window.end.timestamp_millis().to_string());
        url
    }

    /// Destination path for one camera's chunk inside the output directory.
    pub fn destination(&self, window: &TimeWindow, camera_label: &str) -> PathBuf {
        self.output_dir
            .join(destination_name(window, camera_label))
    }
}

/// Date format used in destination filenames, e.g. `2023-01-01 12:00:00 AM`.
const FILENAME_DATE_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

/// Build the `{start}_{end}_{label}.mp4` filename for one window.
pub fn destination_name(window: &TimeWindow, camera_label: &str) -> String {
    format!(
        "{}_{}_{}.mp4",
        format_timestamp(window.start),
        format_timestamp(window.end),
        camera_label
    )
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(FILENAME_DATE_FORMAT).to_string()
}
