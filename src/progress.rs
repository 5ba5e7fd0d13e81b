//! Progress Reporter: turns a `(current, total)` stream into throttled
//! status-message edits, grounded in the original bot's `progress()` /
//! `ts()` / `hbs()` helpers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::transport::{ChatTransport, EditStatusError, StatusHandle};

/// Padding added on top of a platform-hinted retry-after delay, so the
/// retried edit doesn't land right at the edge of the rate-limit window.
const RATE_LIMIT_PAD: Duration = Duration::from_millis(500);

/// Per-message-handle throttle plus formatting. One instance is shared by a
/// job's download and upload stages; `compress` progress comes from ffmpeg's
/// own `-progress` stream and is reported through the same `report` call.
pub struct ProgressReporter {
    interval: Duration,
    last_update: Mutex<HashMap<StatusHandle, Instant>>,
}

impl ProgressReporter {
    pub fn new(interval: Duration) -> Self {
        ProgressReporter {
            interval,
            last_update: Mutex::new(HashMap::new()),
        }
    }

    /// Reports `current` of `total` bytes/units under `label` (and an
    /// optional filename), editing `handle` through `transport`. Throttled
    /// to `interval` except for the final call (`current == total`), which
    /// always goes through so the status message never gets stuck mid-bar.
    pub async fn report(
        &self,
        transport: &dyn ChatTransport,
        handle: &StatusHandle,
        label: &str,
        file: Option<&str>,
        current: u64,
        total: u64,
        started_at: Instant,
        engine_label: &str,
    ) {
        if total == 0 {
            return;
        }
        let is_final = current >= total;
        if !is_final && !self.should_update(handle) {
            return;
        }

        let elapsed = started_at.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }
        let percentage = (current as f64 * 100.0 / total as f64).min(100.0);
        let speed = current as f64 / elapsed;
        let eta_secs = if speed > 0.0 {
            ((total - current) as f64 / speed).round() as u64
        } else {
            0
        };

        let text = render(label, file, percentage, current, total, speed, eta_secs, engine_label);

        match transport.edit_status(handle, &text).await {
            Ok(()) => {}
            Err(EditStatusError::Swallowed) => {}
            Err(EditStatusError::RateLimited { retry_after }) => {
                let wait = retry_after + RATE_LIMIT_PAD;
                warn!(?wait, "progress edit rate limited, backing off");
                tokio::time::sleep(wait).await;
                if let Err(err) = transport.edit_status(handle, &text).await {
                    warn!(%err, "progress edit failed after rate-limit backoff");
                }
            }
            Err(err) => warn!(%err, "progress edit failed"),
        }
    }

    fn should_update(&self, handle: &StatusHandle) -> bool {
        let mut map = self.last_update.lock().unwrap();
        let now = Instant::now();
        match map.get(handle) {
            Some(last) if now.duration_since(*last) < self.interval => false,
            _ => {
                map.insert(handle.clone(), now);
                true
            }
        }
    }

    /// Drops the throttle entry for a handle once its job is done, so the
    /// map doesn't grow across a process's whole uptime.
    pub fn forget(&self, handle: &StatusHandle) {
        self.last_update.lock().unwrap().remove(handle);
    }
}

/// Renders a ten-block progress bar plus size/speed/ETA line, matching the
/// original bot's `progress()` text layout (minus the emoji, kept as plain
/// filled/empty block characters so it renders consistently across clients).
fn render(
    label: &str,
    file: Option<&str>,
    percentage: f64,
    current: u64,
    total: u64,
    speed: f64,
    eta_secs: u64,
    engine_label: &str,
) -> String {
    let filled = (percentage / 10.0).floor() as usize;
    let filled = filled.min(10);
    let bar: String = "#".repeat(filled) + &"-".repeat(10 - filled);

    let mut text = format!("{label}\n");
    if let Some(file) = file {
        text.push_str(&format!("File: {file}\n"));
    }
    text.push_str(&format!("[{bar}] {percentage:.2}%\n"));
    text.push_str(&format!("{} of {}\n", human_bytes(current as f64), human_bytes(total as f64)));
    text.push_str(&format!("Speed: {}/s\n", human_bytes(speed)));
    text.push_str(&format!("ETA: {}\n", format_duration(eta_secs)));
    if engine_label != "cpu" {
        text.push_str(&format!("Engine: {}\n", engine_label.to_uppercase()));
    }
    text
}

/// Human-readable byte size (`hbs` in the original).
pub fn human_bytes(size: f64) -> String {
    if size <= 0.0 {
        return String::new();
    }
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = size;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Human-readable duration (`ts` in the original), e.g. `1h, 02m, 03s`.
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86400;
    let hours = (total_secs % 86400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeTransport;

    #[test]
    fn human_bytes_scales_units() {
        assert_eq!(human_bytes(0.0), "");
        assert_eq!(human_bytes(512.0), "512.00 B");
        assert_eq!(human_bytes(1536.0), "1.50 KB");
        assert_eq!(human_bytes(1024.0 * 1024.0 * 3.0), "3.00 MB");
    }

    #[test]
    fn format_duration_covers_all_units() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(65), "1m, 5s");
        assert_eq!(format_duration(3661), "1h, 1m, 1s");
        assert_eq!(format_duration(90061), "1d, 1h, 1m, 1s");
    }

    #[tokio::test]
    async fn final_report_bypasses_throttle() {
        let transport = FakeTransport::new();
        let reporter = ProgressReporter::new(Duration::from_secs(3600));
        let handle = StatusHandle("h1".to_string());
        let started = Instant::now() - Duration::from_secs(1);

        reporter
            .report(&transport, &handle, "Downloading", None, 50, 100, started, "cpu")
            .await;
        reporter
            .report(&transport, &handle, "Downloading", None, 60, 100, started, "cpu")
            .await;
        reporter
            .report(&transport, &handle, "Downloading", None, 100, 100, started, "cpu")
            .await;

        assert_eq!(transport.edits.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rate_limited_edit_is_retried_after_backoff() {
        let transport = FakeTransport::new();
        *transport.next_edit_error.lock().unwrap() =
            Some(EditStatusError::RateLimited { retry_after: Duration::from_millis(5) });
        let reporter = ProgressReporter::new(Duration::from_secs(3600));
        let handle = StatusHandle("h1".to_string());
        let started = Instant::now() - Duration::from_secs(1);

        reporter
            .report(&transport, &handle, "Downloading", None, 100, 100, started, "cpu")
            .await;

        assert_eq!(transport.edits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn swallowed_edit_error_is_not_retried_or_logged_as_failure() {
        let transport = FakeTransport::new();
        *transport.next_edit_error.lock().unwrap() = Some(EditStatusError::Swallowed);
        let reporter = ProgressReporter::new(Duration::from_secs(3600));
        let handle = StatusHandle("h1".to_string());
        let started = Instant::now() - Duration::from_secs(1);

        reporter
            .report(&transport, &handle, "Downloading", None, 100, 100, started, "cpu")
            .await;

        assert!(transport.edits.lock().unwrap().is_empty());
    }
}
