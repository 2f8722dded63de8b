//! On-device sentence embeddings for BERT-family encoders.
//!
//! Loads a pretrained encoder (weights, hyperparameters, vocabulary) from a
//! GGUF container, tokenizes text with greedy WordPiece, runs a batched
//! masked forward pass, and emits one mean-pooled, L2-normalized vector per
//! input string.
//!
//! # Example
//!
//! ```rust,no_run
//! use bert_embed::BertEmbedder;
//!
//! # fn main() -> bert_embed::EmbedResult<()> {
//! let embedder = BertEmbedder::load("all-MiniLM-L6-v2.gguf")?;
//! let embedding = embedder.encode("A sentence to embed.")?;
//! assert_eq!(embedding.len(), embedder.n_embd());
//! # Ok(())
//! # }
//! ```
//!
//! GPU backends are opt-in through the `cuda` and `metal` cargo features;
//! see [`LoadConfig`].

mod config;
mod embedder;
mod encoder;
mod error;
mod model;
mod normalize;
mod tokenizer;
mod vocab;

pub use config::{DeviceRequest, LoadConfig};
pub use embedder::BertEmbedder;
pub use error::{EmbedError, EmbedResult};
pub use model::{
    AttentionWeights, BertWeights, EmbeddingWeights, EncoderLayerWeights, FfnWeights, Hparams,
};
pub use normalize::normalize;
pub use tokenizer::tokenize;
pub use vocab::{SpecialIds, TokenId, Vocabulary};
