use std::path::PathBuf;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("authentication against {url} failed: {source}")]
    Authentication {
        url: String,
        #[source]
        source: Box<ExportError>,
    },

    #[error("error writing to the file {}", .path.display())]
    StreamWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading the response from the server")]
    StreamRead {
        #[source]
        source: reqwest::Error,
    },

    #[error("remux of {} failed: {reason}", .input.display())]
    Remux { input: PathBuf, reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl ExportError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn stream_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StreamWrite {
            path: path.into(),
            source,
        }
    }

    pub fn remux(input: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Remux {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
