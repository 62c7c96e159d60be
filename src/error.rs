use thiserror::Error;

/// Errors raised while deriving regions from a feature tree.
#[derive(Debug, Error)]
pub enum RegionError {
    /// Strand-dependent arithmetic was requested on a feature with no strand.
    #[error("feature '{id}' has no strand (+1 or -1 required to derive regions)")]
    UnstrandedFeature { id: String },

    #[error("unknown region kind '{0}'")]
    UnknownRegionKind(String),

    #[error("unknown transcript type '{0}'")]
    UnknownTranscriptType(String),
}

pub type Result<T, E = RegionError> = std::result::Result<T, E>;
