mod driver;

pub use driver::{TranscodeOutcome, TranscodeRunner};
