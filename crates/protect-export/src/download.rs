//! Streams one chunk's export response straight to a destination file.
//!
//! The body is consumed chunk by chunk and never buffered whole; a one-hour
//! export easily runs to gigabytes.

use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};
use url::Url;

use crate::client::{CookieJar, HttpClient};
use crate::error::ExportError;
use crate::status::{StatusEvent, StatusSink, format_progress};

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Result of one completed chunk download.
#[derive(Debug)]
pub struct DownloadOutcome {
    /// The caller's jar updated with any cookies the response set.
    pub cookies: CookieJar,
    /// Bytes written to the destination file.
    pub bytes_written: u64,
}

/// GET `url` with `jar` attached and stream the response body to `dest`.
///
/// Emits `Waiting` before the request and a `Downloading` event per received
/// chunk (percentage when the total size is known, `"Unknown"` otherwise),
/// closing with `Downloading { progress: "100%" }`. Stream failures emit an
/// `Error` event and fail the download; whole-chunk retry is the caller's
/// decision, not this function's.
pub async fn download(
    client: &HttpClient,
    url: &Url,
    jar: &CookieJar,
    dest: &Path,
    sink: &StatusSink,
) -> Result<DownloadOutcome, ExportError> {
    sink.emit(StatusEvent::Waiting);

    let (response, cookies) = match client.get(url, jar).await {
        Ok(ok) => ok,
        Err(e) => {
            sink.emit(StatusEvent::Error {
                message: e.to_string(),
            });
            return Err(e);
        }
    };

    let total = response.content_length();
    match total {
        Some(total) => debug!(url = %url, total, "download size known"),
        None => debug!(url = %url, "content length not available"),
    }

    let file = File::create(dest)
        .await
        .map_err(|e| ExportError::stream_write(dest, e))
        .map_err(|e| report(sink, e))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    let mut stream = response.bytes_stream();
    let mut bytes_written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| ExportError::StreamRead { source: e })
            .map_err(|e| report(sink, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ExportError::stream_write(dest, e))
            .map_err(|e| report(sink, e))?;
        bytes_written += chunk.len() as u64;
        sink.emit(StatusEvent::Downloading {
            progress: format_progress(bytes_written, total),
        });
    }

    writer
        .flush()
        .await
        .map_err(|e| ExportError::stream_write(dest, e))
        .map_err(|e| report(sink, e))?;

    sink.emit(StatusEvent::Downloading {
        progress: "100%".to_owned(),
    });
    info!(dest = %dest.display(), bytes_written, "chunk downloaded");

    Ok(DownloadOutcome {
        cookies,
        bytes_written,
    })
}

fn report(sink: &StatusSink, err: ExportError) -> ExportError {
    sink.emit(StatusEvent::Error {
        message: err.to_string(),
    });
    err
}
