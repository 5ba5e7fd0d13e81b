//! Layered settings: a global document plus sparse per-user overrides,
//! persisted as JSON next to the working directory.

mod hardware;
mod io;
mod store;
mod types;

pub use hardware::{EngineKind, detect_engine};
pub use store::SettingsStore;
pub use types::{AdvancedSettings, OutputSettings, PreviewSettings, ThumbnailSettings};
