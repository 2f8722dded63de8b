//! Error types for model loading and embedding computation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the embedding engine.
///
/// Load-time failures (`OpenFailed` through `BackendInitFailed`) are terminal:
/// any partially constructed state is released before the error is returned.
/// Call-time failures (`BatchTooLong`, `EmptyBatch`, `OutputBufferTooSmall`)
/// leave the embedder usable.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Model file could not be opened.
    #[error("failed to open model file {}: {}", .path.display(), .source)]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required metadata key is absent from the container, or its value
    /// does not convert to the expected type.
    #[error("missing required metadata key: {key}")]
    MissingKey { key: String },

    /// A tensor named by the weight schema is absent from the container.
    #[error("missing tensor: {name}")]
    MissingTensor { name: String },

    /// A hyperparameter or tensor shape violates the model contract.
    #[error("bad shape: {message}")]
    BadShape { message: String },

    /// A tensor's storage type cannot be materialized on the target device.
    #[error("unsupported dtype for tensor {name}: {message}")]
    UnsupportedDtype { name: String, message: String },

    /// The container ended early or a blob read/seek failed.
    #[error("container read failed: {message}")]
    ReadTruncated { message: String },

    /// The requested compute backend could not be initialized.
    #[error("backend init failed: {message}")]
    BackendInitFailed { message: String },

    /// A device buffer allocation failed.
    #[error("allocation failed: {message}")]
    AllocFailed { message: String },

    /// The longest sequence in the batch exceeds the model's position count.
    #[error("batch sequence of {actual} tokens exceeds model maximum {max}")]
    BatchTooLong { actual: usize, max: usize },

    /// The batch contains no sequences (or only empty ones).
    #[error("empty batch")]
    EmptyBatch,

    /// The caller-provided output slice cannot hold the batch result.
    #[error("output buffer too small: need {needed} floats, got {got}")]
    OutputBufferTooSmall { needed: usize, got: usize },

    /// A tensor-runtime operation failed mid-forward.
    #[error("compute failed: {message}")]
    Compute { message: String },
}

/// Result alias used throughout the crate.
pub type EmbedResult<T> = Result<T, EmbedError>;
