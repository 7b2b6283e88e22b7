use thiserror::Error;

/// Errors surfaced by `fit` and `transform`
///
/// Worker threads never panic on these conditions; failures are carried back
/// to the coordinating thread and returned from the public entry points.
#[derive(Debug, Error)]
pub enum TsneError {
    /// Malformed caller input: non-finite distances, mismatched shapes,
    /// perplexity too large for the dataset, unsupported dimensionality or
    /// empty data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The optimisation diverged: NaN/Inf in the gradient or a non-finite
    /// KL divergence estimate.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    /// A buffer or grid could not be sized (the FFT grid arithmetic
    /// overflowed, or a scratch allocation was impossibly large).
    #[error("resource failure: {0}")]
    ResourceFailure(String),

    /// An option combination outside the supported set, e.g. Barnes-Hut
    /// with a 1-D embedding.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, TsneError>;
