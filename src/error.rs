//! Error taxonomy shared by the replay buffer, estimator and trainer.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DqnError {
    /// The buffer holds fewer experiences than a batch needs.
    #[error("insufficient data: requested {requested} samples but only {available} are stored")]
    InsufficientData { requested: usize, available: usize },

    /// An observation does not match the schema the networks were built for.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Sampling failed after the size check passed. This is an ordering bug in the caller.
    #[error("sampling exhausted: requested {requested} distinct samples from {available} stored")]
    SamplingExhaustion { requested: usize, available: usize },

    #[error("invalid experience: {0}")]
    InvalidExperience(String),

    #[error("estimator error: {0}")]
    Estimator(String),

    /// An update produced a non-finite loss or gradient and was not applied.
    #[error("training diverged: {0}")]
    Divergence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DqnError>;
