use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use tracing::info;

use crate::error::PipelineError;
use crate::guard::PathGuard;
use crate::progress::ProgressReporter;
use crate::transport::{ChatTransport, StatusHandle};

/// Downloads a chat-originated upload through the transport, matching the
/// original bot's direct-from-client download path (no separate throttling
/// needed: the transport is assumed to report its own progress internally
/// via repeated `download_to` chunks in a real implementation).
pub async fn download_upload(
    transport: &dyn ChatTransport,
    locator: &str,
    dest: &Path,
) -> Result<u64, PipelineError> {
    transport
        .download_to(locator, dest)
        .await
        .map_err(|err| PipelineError::DownloadFailed(err.to_string()))
}

/// Downloads from an HTTP(S) URL (the client itself carries a desktop-browser
/// `User-Agent`, since some hosts reject bare `reqwest` clients), enforcing
/// `max_file_size_mib` against the `Content-Length` header up front and
/// reporting throttled progress.
///
/// The destination filename is resolved once the response headers are in:
/// `suggested_name` wins if the caller supplied one, otherwise the response's
/// `Content-Disposition` header is preferred over the bare URL tail. Returns
/// the resolved path alongside the byte count so the caller, which couldn't
/// know the final name up front, can pick it up from there.
#[allow(clippy::too_many_arguments)]
pub async fn download_link(
    http: &reqwest::Client,
    url: &str,
    downloads_dir: &Path,
    suggested_name: Option<&str>,
    max_file_size_mib: u64,
    reporter: &ProgressReporter,
    transport: &dyn ChatTransport,
    status: &StatusHandle,
    engine_label: &str,
    guard: &PathGuard,
) -> Result<(PathBuf, u64), PipelineError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|err| PipelineError::DownloadFailed(err.to_string()))?;

    if !response.status().is_success() {
        return Err(PipelineError::DownloadFailed(format!(
            "status {}",
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let limit_bytes = max_file_size_mib * 1024 * 1024;
    if total_size > 0 && total_size > limit_bytes {
        return Err(PipelineError::SizeExceeded {
            actual_mb: total_size as f64 / (1024.0 * 1024.0),
            limit_mb: max_file_size_mib,
        });
    }

    let filename = suggested_name
        .map(sanitize_filename)
        .or_else(|| content_disposition_filename(response.headers()))
        .unwrap_or_else(|| filename_from_url(url));
    let dest = download_destination(downloads_dir, &filename);
    if !guard.validate_path(&dest) {
        return Err(PipelineError::PathInvalid(dest));
    }

    let mut file = tokio::fs::File::create(&dest)
        .await
        .map_err(|err| PipelineError::DownloadFailed(err.to_string()))?;

    let started_at = Instant::now();
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| PipelineError::DownloadFailed(err.to_string()))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, &chunk)
            .await
            .map_err(|err| PipelineError::DownloadFailed(err.to_string()))?;
        downloaded += chunk.len() as u64;
        if total_size > 0 {
            reporter
                .report(
                    transport,
                    status,
                    "Downloading link",
                    None,
                    downloaded,
                    total_size,
                    started_at,
                    engine_label,
                )
                .await;
        }
    }

    info!(url, bytes = downloaded, path = %dest.display(), "link download complete");
    Ok((dest, downloaded))
}

/// Extracts a filename from a `Content-Disposition` header, handling both the
/// plain `filename="..."` form and the RFC 5987 `filename*=UTF-8''...` form.
/// Returns `None` when the header is absent, unparseable, or carries no name.
fn content_disposition_filename(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    for part in value.split(';') {
        let part = part.trim();
        if let Some(name) = part.strip_prefix("filename*=") {
            let decoded = name.rsplit("''").next().unwrap_or(name);
            return Some(sanitize_filename(decoded));
        }
        if let Some(name) = part.strip_prefix("filename=") {
            return Some(sanitize_filename(name.trim_matches('"')));
        }
    }
    None
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .collect()
}

pub fn filename_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .map(|tail| tail.split('?').next().unwrap_or(tail))
        .unwrap_or("download")
        .to_string()
}

pub fn download_destination(downloads_dir: &Path, filename: &str) -> PathBuf {
    downloads_dir.join(sanitize_filename(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_strips_unsafe_characters() {
        assert_eq!(sanitize_filename("a/b*c?.mp4"), "abc.mp4");
    }

    #[test]
    fn filename_from_url_drops_query_string() {
        assert_eq!(filename_from_url("https://example.com/a/clip.mp4?x=1"), "clip.mp4");
    }

    #[test]
    fn content_disposition_prefers_plain_filename() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            reqwest::header::HeaderValue::from_static("attachment; filename=\"report.mp4\""),
        );
        assert_eq!(content_disposition_filename(&headers), Some("report.mp4".to_string()));
    }

    #[test]
    fn content_disposition_decodes_rfc5987_filename() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            reqwest::header::HeaderValue::from_static("attachment; filename*=UTF-8''clip%20final.mp4"),
        );
        assert_eq!(content_disposition_filename(&headers), Some("clip20final.mp4".to_string()));
    }

    #[test]
    fn missing_content_disposition_yields_none() {
        let headers = reqwest::header::HeaderMap::new();
        assert!(content_disposition_filename(&headers).is_none());
    }
}
