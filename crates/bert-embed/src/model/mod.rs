//! Model container parsing and the typed weight catalog.

mod hparams;
mod loader;
mod weights;

pub use hparams::Hparams;
pub use weights::{
    AttentionWeights, BertWeights, EmbeddingWeights, EncoderLayerWeights, FfnWeights,
};

pub(crate) use loader::load_model;
