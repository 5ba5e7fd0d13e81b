//! Job Queue & Lifecycle: FIFO admission with dedup, a single-worker lease,
//! and per-job cancellation. Grounded in the original bot's
//! `ThreadSafeState` (`_queue`, `_working`), trimmed to a single
//! `VecDeque` since this engine has exactly one worker.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::domain::Job;
use crate::error::AdmissionError;

struct Inner {
    queued: VecDeque<Job>,
    dedupe: HashSet<String>,
    working: Option<Job>,
}

pub struct Queue {
    max_size: usize,
    inner: Mutex<Inner>,
}

impl Queue {
    pub fn new(max_size: usize) -> Self {
        Queue {
            max_size,
            inner: Mutex::new(Inner {
                queued: VecDeque::new(),
                dedupe: HashSet::new(),
                working: None,
            }),
        }
    }

    /// Admits `job` at the back of the queue. Rejects when full or when a
    /// live Job (queued or running) already shares its `dedupe_key`.
    pub fn enqueue(&self, job: Job) -> Result<(), AdmissionError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.dedupe.contains(&job.dedupe_key) {
            return Err(AdmissionError::Duplicate);
        }
        if inner.queued.len() >= self.max_size {
            return Err(AdmissionError::QueueFull { max: self.max_size });
        }
        inner.dedupe.insert(job.dedupe_key.clone());
        inner.queued.push_back(job);
        Ok(())
    }

    /// Atomically takes the front of the queue and marks it as the running
    /// Job, or returns `None` if the queue is empty or a Job is already
    /// running. Safe to call on every worker tick without external locking.
    pub fn take_next(&self) -> Option<Job> {
        let mut inner = self.inner.lock().unwrap();
        if inner.working.is_some() {
            return None;
        }
        let job = inner.queued.pop_front()?;
        inner.working = Some(job.clone());
        Some(job)
    }

    /// Clears the running slot and its dedupe entry. Called unconditionally
    /// once a job's pipeline run terminates, on every exit path (success,
    /// failure, or cancellation) so the worker never gets stuck.
    pub fn finish(&self, dedupe_key: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.dedupe.remove(dedupe_key);
        if inner.working.as_ref().map(|j| j.dedupe_key.as_str()) == Some(dedupe_key) {
            inner.working = None;
        }
    }

    /// Drops a still-queued job (not yet running) by sequence number, used
    /// by the skip-callback when a user cancels before their job was picked
    /// up. No-op if the job has already started running or no longer
    /// exists.
    pub fn remove_queued(&self, seq: crate::domain::JobSeq) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if let Some(pos) = inner.queued.iter().position(|j| j.seq == seq) {
            let job = inner.queued.remove(pos).unwrap();
            inner.dedupe.remove(&job.dedupe_key);
            true
        } else {
            false
        }
    }

    /// Cancels `seq`: drops it from the queue if it hasn't started yet, or
    /// flips its `CancelToken` if it's the job currently running (the
    /// `working` entry shares the same token with the copy the pipeline is
    /// actually driving, so this is observed at the transcoder's next poll).
    /// No-op, returning `false`, if no job with this sequence number is
    /// queued or running.
    pub fn cancel(&self, seq: crate::domain::JobSeq) -> bool {
        if self.remove_queued(seq) {
            return true;
        }
        let inner = self.inner.lock().unwrap();
        match inner.working.as_ref() {
            Some(job) if job.seq == seq => {
                job.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn is_working(&self) -> bool {
        self.inner.lock().unwrap().working.is_some()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.lock().unwrap().queued.len()
    }

    pub fn working_job(&self) -> Option<Job> {
        self.inner.lock().unwrap().working.clone()
    }
}
