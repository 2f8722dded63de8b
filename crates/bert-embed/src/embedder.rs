//! The public embedding engine.

use std::path::Path;
use std::time::Instant;

use crate::config::{init_device, init_threads, LoadConfig};
use crate::encoder::forward_batch;
use crate::error::{EmbedError, EmbedResult};
use crate::model::{load_model, BertWeights};
use crate::tokenizer;
use crate::vocab::{TokenId, Vocabulary};

/// A loaded BERT-family encoder producing L2-normalized sentence embeddings.
///
/// Weights and vocabulary are immutable after load, so shared references are
/// safe across threads; each `encode*` call runs one blocking forward pass.
/// Device memory is released on drop.
#[derive(Debug)]
pub struct BertEmbedder {
    weights: BertWeights,
    vocab: Vocabulary,
}

impl BertEmbedder {
    /// Load a GGUF model with the default configuration (CPU, warmup on).
    pub fn load(path: impl AsRef<Path>) -> EmbedResult<Self> {
        Self::load_with(path, LoadConfig::default())
    }

    /// Load a GGUF model with explicit backend and thread settings.
    pub fn load_with(path: impl AsRef<Path>, config: LoadConfig) -> EmbedResult<Self> {
        let started = Instant::now();
        if let Some(threads) = config.threads {
            init_threads(threads);
        }
        let device = init_device(config.device)?;
        let (weights, vocab) = load_model(path.as_ref(), &device)?;
        let embedder = Self { weights, vocab };

        if config.warmup {
            embedder.warmup()?;
        }

        tracing::info!(
            target: "bert_embed::embedder",
            elapsed_ms = started.elapsed().as_millis() as u64,
            warmup = config.warmup,
            "model ready"
        );
        Ok(embedder)
    }

    /// One full-length dummy forward. Exercises every weight at the maximum
    /// sequence length, so shape mismatches surface at load time and the
    /// runtime's scratch allocations reach their peak size once, up front.
    fn warmup(&self) -> EmbedResult<()> {
        let started = Instant::now();
        let specials = self.vocab.specials();
        let mut dummy = vec![specials.cls; self.n_max_tokens()];
        if let Some(last) = dummy.last_mut() {
            *last = specials.sep;
        }
        forward_batch(&self.weights, specials.cls, &[dummy])?;
        tracing::debug!(
            target: "bert_embed::embedder",
            elapsed_ms = started.elapsed().as_millis() as u64,
            "warmup forward done"
        );
        Ok(())
    }

    /// Embedding width `E`.
    pub fn n_embd(&self) -> usize {
        self.weights.hparams.n_embd
    }

    /// Maximum sequence length `Lmax`.
    pub fn n_max_tokens(&self) -> usize {
        self.weights.hparams.n_max_tokens
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Weight catalog (hyperparameters, parameter accounting, device).
    pub fn weights(&self) -> &BertWeights {
        &self.weights
    }

    /// Tokenize one text into a CLS/SEP-framed id sequence capped at `n_max`.
    pub fn tokenize(&self, text: &str, n_max: usize) -> Vec<TokenId> {
        tokenizer::tokenize(&self.vocab, text, n_max)
    }

    /// Embed one text. Returns `E` floats with unit L2 norm.
    pub fn encode(&self, text: &str) -> EmbedResult<Vec<f32>> {
        self.encode_batch(&[text])
    }

    /// Embed a batch. Returns `E·B` floats, row `b` at `[b·E .. (b+1)·E]`.
    pub fn encode_batch(&self, texts: &[&str]) -> EmbedResult<Vec<f32>> {
        let n_max = self.n_max_tokens();
        let batch: Vec<Vec<TokenId>> = texts
            .iter()
            .map(|text| self.tokenize(text, n_max))
            .collect();
        self.forward_tokens(&batch)
    }

    /// Embed a batch into a caller-provided buffer of at least `E·B` floats.
    pub fn encode_batch_into(&self, texts: &[&str], out: &mut [f32]) -> EmbedResult<()> {
        let needed = self.n_embd() * texts.len();
        if out.len() < needed {
            return Err(EmbedError::OutputBufferTooSmall {
                needed,
                got: out.len(),
            });
        }
        let embeddings = self.encode_batch(texts)?;
        out[..needed].copy_from_slice(&embeddings);
        Ok(())
    }

    /// Run the forward pass over already-tokenized sequences.
    pub fn forward_tokens(&self, batch: &[Vec<TokenId>]) -> EmbedResult<Vec<f32>> {
        let output = forward_batch(&self.weights, self.vocab.specials().cls, batch)?;
        output
            .flatten_all()
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| EmbedError::Compute {
                message: format!("output copy failed: {e}"),
            })
    }
}
