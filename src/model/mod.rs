pub mod feature;
pub mod gene;
pub mod transcript;
pub mod types;

pub use types::{RegionKind, TranscriptType, TranscriptTypes};
