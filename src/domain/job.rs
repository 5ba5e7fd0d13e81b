use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::transport::StatusHandle;

pub type JobSeq = u64;

/// What the job actually is: a chat upload already sitting with the
/// transport, or a link the pipeline still has to fetch itself.
#[derive(Debug, Clone)]
pub enum JobPayload {
    Upload {
        /// Opaque transport-side locator (e.g. a file/document id).
        locator: String,
        suggested_name: Option<String>,
        size: Option<u64>,
    },
    Link {
        url: String,
        suggested_name: Option<String>,
    },
}

/// Who submitted the job and where progress/results should go.
#[derive(Debug, Clone)]
pub struct JobOrigin {
    pub user_id: i64,
    pub chat_id: i64,
    pub status: StatusHandle,
}

/// A per-job cooperative cancellation flag. The Transcode Driver observes it
/// at the next suspension point (the child `wait`) rather than polling it
/// continuously.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One unit of submitted work. A `dedupe_key` of `Upload` is the transport
/// locator; for `Link` it is the URL itself — at most one live `Job` may
/// exist for a given key (see `Queue::enqueue`).
#[derive(Debug, Clone)]
pub struct Job {
    pub seq: JobSeq,
    pub dedupe_key: String,
    pub payload: JobPayload,
    pub origin: JobOrigin,
    pub cancel: CancelToken,
    /// Ad-hoc profile overrides supplied via `/custom -k v ...`; merged on
    /// top of the resolved active profile for this run only.
    pub overrides: Vec<(String, String)>,
}

impl Job {
    pub fn dedupe_key_for(payload: &JobPayload) -> String {
        match payload {
            JobPayload::Upload { locator, .. } => locator.clone(),
            JobPayload::Link { url, .. } => url.clone(),
        }
    }
}

/// Per-stage timing and size statistics, reported back to the user at the
/// end of a successful run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub download_ms: u64,
    pub compress_ms: u64,
    pub upload_ms: u64,
    pub engine_label: String,
}

impl RunStats {
    /// Percentage size reduction, matching `100 - compressed/original*100`
    /// from the original bot; returns 0 when `original_bytes` is 0 to avoid
    /// a division by zero.
    pub fn reduction_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        100.0 - (self.compressed_bytes as f64 / self.original_bytes as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_observes_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn dedupe_key_for_upload_is_locator() {
        let payload = JobPayload::Upload {
            locator: "doc123".to_string(),
            suggested_name: None,
            size: None,
        };
        assert_eq!(Job::dedupe_key_for(&payload), "doc123");
    }

    #[test]
    fn dedupe_key_for_link_is_url() {
        let payload = JobPayload::Link {
            url: "https://example.com/a.mp4".to_string(),
            suggested_name: None,
        };
        assert_eq!(Job::dedupe_key_for(&payload), "https://example.com/a.mp4");
    }

    #[test]
    fn reduction_percent_matches_original_formula() {
        let stats = RunStats {
            original_bytes: 1000,
            compressed_bytes: 400,
            ..Default::default()
        };
        assert!((stats.reduction_percent() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn reduction_percent_zero_original_is_zero() {
        let stats = RunStats::default();
        assert_eq!(stats.reduction_percent(), 0.0);
    }
}
