//! Post-upload "before/after" media-info report, matching `info()` and the
//! Telegraph posting in `upload_compressed_file`. Every failure here is
//! swallowed: a missing report link never fails the job.

use std::path::Path;
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tracing::warn;

/// Runs `ffprobe -show_format -show_streams` and renders a small HTML
/// summary, standing in for the original's `pymediainfo`-rendered HTML.
async fn probe_media_info_html(path: &Path) -> Option<String> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-show_format", "-show_streams", "-of", "json"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
    Some(format!("<pre>{}</pre>", serde_json::to_string_pretty(&json).ok()?))
}

#[derive(Serialize)]
struct CreatePageRequest<'a> {
    access_token: &'a str,
    title: &'a str,
    author_name: &'a str,
    content: String,
    return_content: bool,
}

/// Posts `html` to the configured paste host (Telegraph-compatible
/// `createPage` API) and returns the resulting page URL.
async fn post_to_paste_host(http: &reqwest::Client, api_base: &str, access_token: &str, title: &str, html: &str) -> Option<String> {
    let content = serde_json::to_string(&[serde_json::json!({"tag": "p", "children": [html]})]).ok()?;
    let request = CreatePageRequest {
        access_token,
        title,
        author_name: "clipforge",
        content,
        return_content: false,
    };
    let response = http
        .post(format!("{api_base}/createPage"))
        .json(&request)
        .send()
        .await
        .ok()?;
    let body: serde_json::Value = response.json().await.ok()?;
    body.get("result")?.get("url")?.as_str().map(str::to_string)
}

/// Media-info links for the original and compressed files. `None` for
/// either side on any probe/post failure; the caller treats both as
/// optional caption enrichment.
pub struct MediaInfoLinks {
    pub before_url: Option<String>,
    pub after_url: Option<String>,
}

pub async fn build_media_info_links(
    http: &reqwest::Client,
    paste_api_base: &str,
    paste_access_token: &str,
    original: &Path,
    compressed: &Path,
) -> MediaInfoLinks {
    let before_html = probe_media_info_html(original).await;
    let after_html = probe_media_info_html(compressed).await;

    let before_url = match before_html {
        Some(html) => post_to_paste_host(http, paste_api_base, paste_access_token, "Mediainfo (Before)", &html).await,
        None => None,
    };
    let after_url = match after_html {
        Some(html) => post_to_paste_host(http, paste_api_base, paste_access_token, "Mediainfo (After)", &html).await,
        None => None,
    };

    if before_url.is_none() || after_url.is_none() {
        warn!("media-info report links incomplete; continuing without them");
    }

    MediaInfoLinks { before_url, after_url }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_no_html() {
        assert!(probe_media_info_html(Path::new("/nonexistent")).await.is_none());
    }
}
