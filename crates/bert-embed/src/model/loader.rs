//! GGUF model loading: hyperparameters, vocabulary, and weight binding.
//!
//! The container does the structural parsing (metadata table, tensor
//! directory, blob offsets); this module turns it into a typed catalog. Any
//! missing key or tensor fails the whole load; there is no partial success.

use std::fs::File;
use std::path::Path;

use candle_core::quantized::gguf_file::{Content, Value};
use candle_core::{Device, Tensor};

use crate::error::{EmbedError, EmbedResult};
use crate::vocab::{SpecialIds, TokenId, Vocabulary};

use super::hparams::Hparams;
use super::weights::{
    AttentionWeights, BertWeights, EmbeddingWeights, EncoderLayerWeights, FfnWeights,
};

const KEY_TOKEN_LIST: &str = "tokenizer.ggml.tokens";
const KEY_CLS_ID: &str = "tokenizer.ggml.cls_token_id";
// gguf's historical spelling
const KEY_SEP_ID: &str = "tokenizer.ggml.seperator_token_id";
const KEY_UNK_ID: &str = "tokenizer.ggml.unknown_token_id";

/// Parse the container at `path` and materialize every weight on `device`.
pub(crate) fn load_model(path: &Path, device: &Device) -> EmbedResult<(BertWeights, Vocabulary)> {
    tracing::info!(
        target: "bert_embed::loader",
        path = %path.display(),
        "loading model"
    );

    let mut file = File::open(path).map_err(|source| EmbedError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let content = Content::read(&mut file).map_err(|e| EmbedError::ReadTruncated {
        message: format!("gguf header: {e}"),
    })?;

    log_container_info(&content);

    let hparams = read_hparams(&content)?;
    hparams.validate()?;
    tracing::info!(
        target: "bert_embed::loader",
        n_vocab = hparams.n_vocab,
        n_max_tokens = hparams.n_max_tokens,
        n_embd = hparams.n_embd,
        n_intermediate = hparams.n_intermediate,
        n_head = hparams.n_head,
        n_layer = hparams.n_layer,
        layer_norm_eps = hparams.layer_norm_eps as f64,
        "hyperparameters"
    );

    let vocab = read_vocab(&content, &hparams)?;

    // container-reported totals; the device buffers must account for exactly
    // this much weight data
    let mut param_count = 0usize;
    let mut param_bytes = 0usize;
    for (name, info) in content.tensor_infos.iter() {
        let elems = info.shape.elem_count();
        param_count += elems;
        param_bytes += elems * info.ggml_dtype.type_size() / info.ggml_dtype.block_size();
        tracing::trace!(
            target: "bert_embed::loader",
            name = name.as_str(),
            dtype = ?info.ggml_dtype,
            shape = ?info.shape.dims(),
            offset = info.offset,
            "tensor"
        );
    }

    let mut fetcher = TensorFetcher {
        content: &content,
        file: &mut file,
        device,
    };

    let e = hparams.n_embd;
    let embeddings = EmbeddingWeights {
        word_embeddings: fetcher.fetch_checked(
            "embeddings.word_embeddings.weight",
            &[hparams.n_vocab, e],
        )?,
        token_type_embeddings: fetcher.fetch_cols(
            "embeddings.token_type_embeddings.weight",
            e,
        )?,
        position_embeddings: fetcher.fetch_checked(
            "embeddings.position_embeddings.weight",
            &[hparams.n_max_tokens, e],
        )?,
        layer_norm_weight: fetcher.fetch_checked("embeddings.LayerNorm.weight", &[e])?,
        layer_norm_bias: fetcher.fetch_checked("embeddings.LayerNorm.bias", &[e])?,
    };

    let mut encoder_layers = Vec::with_capacity(hparams.n_layer);
    for l in 0..hparams.n_layer {
        encoder_layers.push(read_layer(&mut fetcher, l, &hparams)?);
    }

    tracing::info!(
        target: "bert_embed::loader",
        params = param_count,
        mib = param_bytes as f64 / (1024.0 * 1024.0),
        device = ?device,
        "weights bound"
    );

    let weights = BertWeights::new(
        hparams,
        embeddings,
        encoder_layers,
        device.clone(),
        param_count,
        param_bytes,
    );
    Ok((weights, vocab))
}

/// Bind the sixteen tensors of encoder layer `l`.
fn read_layer(
    fetcher: &mut TensorFetcher<'_>,
    l: usize,
    hparams: &Hparams,
) -> EmbedResult<EncoderLayerWeights> {
    let pre = format!("encoder.layer.{l}.");
    let e = hparams.n_embd;
    let i = hparams.n_intermediate;

    let attention = AttentionWeights {
        query_weight: fetcher.fetch_checked(&format!("{pre}attention.self.query.weight"), &[e, e])?,
        query_bias: fetcher.fetch_checked(&format!("{pre}attention.self.query.bias"), &[e])?,
        key_weight: fetcher.fetch_checked(&format!("{pre}attention.self.key.weight"), &[e, e])?,
        key_bias: fetcher.fetch_checked(&format!("{pre}attention.self.key.bias"), &[e])?,
        value_weight: fetcher.fetch_checked(&format!("{pre}attention.self.value.weight"), &[e, e])?,
        value_bias: fetcher.fetch_checked(&format!("{pre}attention.self.value.bias"), &[e])?,
        output_weight: fetcher
            .fetch_checked(&format!("{pre}attention.output.dense.weight"), &[e, e])?,
        output_bias: fetcher.fetch_checked(&format!("{pre}attention.output.dense.bias"), &[e])?,
        layer_norm_weight: fetcher
            .fetch_checked(&format!("{pre}attention.output.LayerNorm.weight"), &[e])?,
        layer_norm_bias: fetcher
            .fetch_checked(&format!("{pre}attention.output.LayerNorm.bias"), &[e])?,
    };

    let ffn = FfnWeights {
        intermediate_weight: fetcher
            .fetch_checked(&format!("{pre}intermediate.dense.weight"), &[i, e])?,
        intermediate_bias: fetcher.fetch_checked(&format!("{pre}intermediate.dense.bias"), &[i])?,
        output_weight: fetcher.fetch_checked(&format!("{pre}output.dense.weight"), &[e, i])?,
        output_bias: fetcher.fetch_checked(&format!("{pre}output.dense.bias"), &[e])?,
        layer_norm_weight: fetcher.fetch_checked(&format!("{pre}output.LayerNorm.weight"), &[e])?,
        layer_norm_bias: fetcher.fetch_checked(&format!("{pre}output.LayerNorm.bias"), &[e])?,
    };

    Ok(EncoderLayerWeights { attention, ffn })
}

/// Retrieves named tensors from the container and dequantizes them onto the
/// target device.
struct TensorFetcher<'a> {
    content: &'a Content,
    file: &'a mut File,
    device: &'a Device,
}

impl TensorFetcher<'_> {
    fn fetch(&mut self, name: &str) -> EmbedResult<Tensor> {
        if !self.content.tensor_infos.contains_key(name) {
            return Err(EmbedError::MissingTensor { name: name.to_string() });
        }
        let qtensor = self
            .content
            .tensor(self.file, name, self.device)
            .map_err(|e| EmbedError::ReadTruncated {
                message: format!("tensor {name}: {e}"),
            })?;
        let dtype = qtensor.dtype();
        qtensor
            .dequantize(self.device)
            .map_err(|e| EmbedError::UnsupportedDtype {
                name: name.to_string(),
                message: format!("{dtype:?}: {e}"),
            })
    }

    fn fetch_checked(&mut self, name: &str, shape: &[usize]) -> EmbedResult<Tensor> {
        let tensor = self.fetch(name)?;
        if tensor.dims() != shape {
            return Err(EmbedError::BadShape {
                message: format!(
                    "tensor {name} has shape {:?}, expected {shape:?}",
                    tensor.dims()
                ),
            });
        }
        Ok(tensor)
    }

    /// Check the trailing (width) dimension exactly; the row count is model
    /// specific (token-type tables vary across checkpoints) but must cover
    /// index 0, which every forward pass gathers.
    fn fetch_cols(&mut self, name: &str, cols: usize) -> EmbedResult<Tensor> {
        let tensor = self.fetch(name)?;
        match tensor.dims() {
            [rows, c] if *rows >= 1 && *c == cols => Ok(tensor),
            dims => Err(EmbedError::BadShape {
                message: format!(
                    "tensor {name} has shape {dims:?}, expected [>=1, {cols}]"
                ),
            }),
        }
    }
}

fn read_hparams(content: &Content) -> EmbedResult<Hparams> {
    Ok(Hparams {
        n_vocab: meta_u32(content, "vocab_size")? as usize,
        n_max_tokens: meta_u32(content, "max_position_embedding")? as usize,
        n_embd: meta_u32(content, "hidden_size")? as usize,
        n_intermediate: meta_u32(content, "intermediate_size")? as usize,
        n_head: meta_u32(content, "num_attention_heads")? as usize,
        n_layer: meta_u32(content, "num_hidden_layers")? as usize,
        layer_norm_eps: meta_f32(content, "layer_norm_eps")?,
    })
}

fn read_vocab(content: &Content, hparams: &Hparams) -> EmbedResult<Vocabulary> {
    let specials = SpecialIds {
        cls: meta_u32_opt(content, KEY_CLS_ID).unwrap_or(crate::vocab::DEFAULT_CLS_ID),
        sep: meta_u32_opt(content, KEY_SEP_ID).unwrap_or(crate::vocab::DEFAULT_SEP_ID),
        unk: meta_u32_opt(content, KEY_UNK_ID).unwrap_or(crate::vocab::DEFAULT_UNK_ID),
    };

    let tokens = content
        .metadata
        .get(KEY_TOKEN_LIST)
        .ok_or_else(|| EmbedError::MissingKey { key: KEY_TOKEN_LIST.to_string() })?
        .to_vec()
        .map_err(|_| EmbedError::MissingKey { key: KEY_TOKEN_LIST.to_string() })?;

    let mut vocab = Vocabulary::new(specials);
    for (id, value) in tokens.iter().enumerate() {
        let surface = value.to_string().map_err(|_| EmbedError::MissingKey {
            key: KEY_TOKEN_LIST.to_string(),
        })?;
        vocab.push_token(surface, id as TokenId);
    }

    if tokens.len() != hparams.n_vocab {
        tracing::warn!(
            target: "bert_embed::loader",
            token_list = tokens.len(),
            vocab_size = hparams.n_vocab,
            "token list length disagrees with vocab_size metadata"
        );
    }
    tracing::info!(
        target: "bert_embed::loader",
        surfaces = vocab.len(),
        cls = specials.cls,
        sep = specials.sep,
        unk = specials.unk,
        "vocabulary ready"
    );
    Ok(vocab)
}

fn log_container_info(content: &Content) {
    let name = meta_str_opt(content, "general.name").unwrap_or("?");
    let description = meta_str_opt(content, "general.description").unwrap_or("?");
    let file_type = meta_u32_opt(content, "general.file_type");
    tracing::info!(
        target: "bert_embed::loader",
        name,
        description,
        file_type = ?file_type,
        n_tensors = content.tensor_infos.len(),
        n_kv = content.metadata.len(),
        "container metadata"
    );
}

fn meta_u32(content: &Content, key: &str) -> EmbedResult<u32> {
    content
        .metadata
        .get(key)
        .ok_or_else(|| EmbedError::MissingKey { key: key.to_string() })?
        .to_u32()
        .map_err(|_| EmbedError::MissingKey { key: key.to_string() })
}

fn meta_f32(content: &Content, key: &str) -> EmbedResult<f32> {
    content
        .metadata
        .get(key)
        .ok_or_else(|| EmbedError::MissingKey { key: key.to_string() })?
        .to_f32()
        .map_err(|_| EmbedError::MissingKey { key: key.to_string() })
}

fn meta_u32_opt(content: &Content, key: &str) -> Option<u32> {
    content.metadata.get(key).and_then(|v| v.to_u32().ok())
}

fn meta_str_opt<'a>(content: &'a Content, key: &str) -> Option<&'a str> {
    content
        .metadata
        .get(key)
        .and_then(|v| match v {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })
}
