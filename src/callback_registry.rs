//! Opaque-key registry for inline-button payloads.
//!
//! Chat platforms cap callback-data payloads at a small number of bytes, far
//! too small to carry an output path, an input path, and a job sequence
//! number. The original bot's `code`/`decode` pair works around this by
//! stashing the real payload in memory and handing back a short numeric key;
//! this is that pattern, process-lifetime and bounded to live jobs rather
//! than growing forever.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::JobSeq;

/// The `out;dl;seq` triple a `skip<key>` callback needs: the in-progress
/// output path, the original input path, and the job's sequence number (so
/// the queue entry, if still pending, can be located and dropped).
#[derive(Debug, Clone)]
pub struct SkipPayload {
    pub output_path: String,
    pub input_path: String,
    pub job_seq: JobSeq,
}

#[derive(Default)]
pub struct CallbackRegistry {
    next: AtomicU64,
    entries: Mutex<HashMap<u64, SkipPayload>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a payload and returns the opaque key to embed in a
    /// `skip<key>` callback button.
    pub fn register(&self, payload: SkipPayload) -> String {
        let key = self.next.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().insert(key, payload);
        key.to_string()
    }

    pub fn resolve(&self, key: &str) -> Option<SkipPayload> {
        let key: u64 = key.parse().ok()?;
        self.entries.lock().unwrap().get(&key).cloned()
    }

    /// Drops a key once its job has finished, successfully or not, so the
    /// registry doesn't grow past the number of jobs that ever ran. There is
    /// no proactive sweep: a `skip<key>` for a job that already completed
    /// simply fails to resolve.
    pub fn forget(&self, key: &str) {
        if let Ok(key) = key.parse::<u64>() {
            self.entries.lock().unwrap().remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(seq: JobSeq) -> SkipPayload {
        SkipPayload {
            output_path: format!("encode/{seq}.mp4"),
            input_path: format!("downloads/{seq}.mp4"),
            job_seq: seq,
        }
    }

    #[test]
    fn register_then_resolve_round_trips() {
        let registry = CallbackRegistry::new();
        let key = registry.register(payload(7));
        let resolved = registry.resolve(&key).unwrap();
        assert_eq!(resolved.job_seq, 7);
    }

    #[test]
    fn forget_makes_key_unresolvable() {
        let registry = CallbackRegistry::new();
        let key = registry.register(payload(1));
        registry.forget(&key);
        assert!(registry.resolve(&key).is_none());
    }

    #[test]
    fn unknown_or_malformed_key_resolves_to_none() {
        let registry = CallbackRegistry::new();
        assert!(registry.resolve("not-a-number").is_none());
        assert!(registry.resolve("999").is_none());
    }

    #[test]
    fn keys_are_monotonic_and_distinct() {
        let registry = CallbackRegistry::new();
        let a = registry.register(payload(1));
        let b = registry.register(payload(2));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }
}
