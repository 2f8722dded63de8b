//! Load-time configuration: backend selection, thread pool sizing, warmup.

use candle_core::Device;

use crate::error::{EmbedError, EmbedResult};

/// Compute backend to bind the model to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceRequest {
    /// CPU backend (always available).
    #[default]
    Cpu,
    /// CUDA device by ordinal. Requires the `cuda` cargo feature.
    Cuda(usize),
    /// Metal device by ordinal. Requires the `metal` cargo feature.
    Metal(usize),
}

/// Options applied once at [`crate::BertEmbedder::load_with`].
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Backend the parameter and compute buffers live on.
    pub device: DeviceRequest,
    /// Worker threads for CPU compute. `None` keeps the runtime default.
    /// The pool is process-global and sized at most once.
    pub threads: Option<usize>,
    /// Run one full-length dummy forward after binding the weights. Validates
    /// every tensor shape end to end and pre-sizes compute scratch, at the
    /// cost of one maximum-size inference.
    pub warmup: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            device: DeviceRequest::default(),
            threads: None,
            warmup: true,
        }
    }
}

pub(crate) fn init_device(request: DeviceRequest) -> EmbedResult<Device> {
    match request {
        DeviceRequest::Cpu => Ok(Device::Cpu),
        #[cfg(feature = "cuda")]
        DeviceRequest::Cuda(ordinal) => {
            Device::new_cuda(ordinal).map_err(|e| EmbedError::BackendInitFailed {
                message: format!("cuda device {ordinal}: {e}"),
            })
        }
        #[cfg(not(feature = "cuda"))]
        DeviceRequest::Cuda(ordinal) => Err(EmbedError::BackendInitFailed {
            message: format!("cuda device {ordinal} requested but the cuda feature is disabled"),
        }),
        #[cfg(feature = "metal")]
        DeviceRequest::Metal(ordinal) => {
            Device::new_metal(ordinal).map_err(|e| EmbedError::BackendInitFailed {
                message: format!("metal device {ordinal}: {e}"),
            })
        }
        #[cfg(not(feature = "metal"))]
        DeviceRequest::Metal(ordinal) => Err(EmbedError::BackendInitFailed {
            message: format!("metal device {ordinal} requested but the metal feature is disabled"),
        }),
    }
}

/// Size the global worker pool. The pool can only be built once per process;
/// a later request logs and keeps the existing pool.
pub(crate) fn init_threads(threads: usize) {
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        tracing::debug!(
            target: "bert_embed::config",
            requested = threads,
            error = %e,
            "thread pool already initialized, keeping existing size"
        );
    }
}
