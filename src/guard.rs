//! Path & Resource Guard: confines every file the pipeline touches to the
//! working directory's managed subtrees, and periodically reclaims
//! abandoned temp files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

/// Subtrees the pipeline is allowed to read or write under the working
/// directory. Anything resolving outside these is refused.
pub const MANAGED_DIRS: [&str; 3] = ["downloads", "encode", "temp"];

/// How long an unreferenced file may sit in a managed directory before the
/// sweeper reclaims it, matching the original bot's `cleanup_temp_files`.
pub const MAX_FILE_AGE: Duration = Duration::from_secs(3600);

pub struct PathGuard {
    working_dir: PathBuf,
}

impl PathGuard {
    pub fn new(working_dir: PathBuf) -> Self {
        PathGuard { working_dir }
    }

    pub fn managed_dir(&self, name: &str) -> PathBuf {
        self.working_dir.join(name)
    }

    pub async fn ensure_managed_dirs(&self) -> std::io::Result<()> {
        for dir in MANAGED_DIRS {
            tokio::fs::create_dir_all(self.managed_dir(dir)).await?;
        }
        Ok(())
    }

    /// True iff `path`, once resolved against the working directory,
    /// actually lies under one of the managed subtrees. Symlink escapes and
    /// `..` traversal are both rejected because this resolves the path
    /// rather than inspecting it lexically.
    pub fn validate_path(&self, path: &Path) -> bool {
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        };
        let resolved = match candidate.canonicalize().or_else(|_| {
            // The file may not exist yet (e.g. a destination path about to
            // be created); fall back to lexical normalization of the parent.
            lexical_normalize(&candidate)
        }) {
            Ok(p) => p,
            Err(_) => return false,
        };

        MANAGED_DIRS.iter().any(|dir| {
            let allowed = match self.managed_dir(dir).canonicalize() {
                Ok(p) => p,
                Err(_) => self.managed_dir(dir),
            };
            resolved.starts_with(&allowed)
        })
    }

    /// Deletes files older than [`MAX_FILE_AGE`] from every managed
    /// directory. Errors reading or removing an individual entry are logged
    /// and skipped rather than aborting the whole sweep.
    pub async fn sweep_once(&self) {
        for dir in MANAGED_DIRS {
            let path = self.managed_dir(dir);
            let mut entries = match tokio::fs::read_dir(&path).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(err) => {
                        warn!(%err, dir = %path.display(), "sweep: failed to read directory entry");
                        break;
                    }
                };
                let metadata = match entry.metadata().await {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                if !metadata.is_file() {
                    continue;
                }
                let age = metadata
                    .modified()
                    .ok()
                    .and_then(|m| m.elapsed().ok())
                    .unwrap_or_default();
                if age > MAX_FILE_AGE {
                    if let Err(err) = tokio::fs::remove_file(entry.path()).await {
                        warn!(path = %entry.path().display(), %err, "sweep: failed to remove stale file");
                    } else {
                        info!(path = %entry.path().display(), "sweep: removed stale file");
                    }
                }
            }
        }
    }

    /// Runs [`Self::sweep_once`] on an hourly tick, forever. Intended to be
    /// spawned as its own task for the life of the process.
    pub async fn run_sweeper(self: std::sync::Arc<Self>) {
        let mut ticker = interval(Duration::from_secs(3600));
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }
}

fn lexical_normalize(path: &Path) -> std::io::Result<PathBuf> {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
