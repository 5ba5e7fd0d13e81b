//! Post-transcode artifact generation: thumbnail, preview reel, screenshots.

mod preview;
mod probe;
mod screenshots;
mod thumbnail;

pub use preview::generate_preview;
pub use probe::probe_duration_secs;
pub use screenshots::generate_screenshots;
pub use thumbnail::generate_thumbnail;

use std::path::PathBuf;

/// All artifacts produced for one completed job, attached to the upload.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    pub thumbnail: Option<PathBuf>,
    pub preview: Option<PathBuf>,
    pub screenshots: Vec<PathBuf>,
}
