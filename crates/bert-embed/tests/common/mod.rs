//! GGUF v3 fixture writer: a tiny random BERT encoder, enough to exercise
//! the full load / tokenize / encode path without real checkpoint files.
#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

pub const N_VOCAB: usize = 128;
pub const N_MAX_TOKENS: usize = 16;
pub const N_EMBD: usize = 8;
pub const N_INTERMEDIATE: usize = 16;
pub const N_HEAD: u32 = 2;
pub const N_LAYER: usize = 2;

const ALIGNMENT: u64 = 32;
const GGUF_MAGIC: u32 = 0x4655_4747;
const GGUF_VERSION: u32 = 3;

// metadata value type tags
const T_U32: u32 = 4;
const T_F32: u32 = 6;
const T_STRING: u32 = 8;
const T_ARRAY: u32 = 9;

// ggml dtype tag
const DT_F32: u32 = 0;

/// A tensor staged for writing: `dims` in storage order (innermost first),
/// `data` row-major.
struct TensorSpec {
    name: String,
    dims: Vec<u64>,
    data: Vec<f32>,
}

pub struct FixtureBuilder {
    n_head: u32,
    token_type_rows: usize,
    omit_key: Option<&'static str>,
    omit_tensor: Option<&'static str>,
    truncate_data: bool,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            n_head: N_HEAD,
            token_type_rows: 2,
            omit_key: None,
            omit_tensor: None,
            truncate_data: false,
        }
    }

    /// Override the head count (e.g. one that does not divide `N_EMBD`).
    pub fn n_head(mut self, n_head: u32) -> Self {
        self.n_head = n_head;
        self
    }

    /// Override the token-type table's row count (e.g. `0` for a table that
    /// cannot cover segment index 0).
    pub fn token_type_rows(mut self, rows: usize) -> Self {
        self.token_type_rows = rows;
        self
    }

    /// Drop one metadata key from the container.
    pub fn omit_key(mut self, key: &'static str) -> Self {
        self.omit_key = Some(key);
        self
    }

    /// Drop one tensor (directory entry and blob) from the container.
    pub fn omit_tensor(mut self, name: &'static str) -> Self {
        self.omit_tensor = Some(name);
        self
    }

    /// Cut the data section short so blob reads run off the end.
    pub fn truncate_data(mut self) -> Self {
        self.truncate_data = true;
        self
    }

    /// Write the container into a temp dir. Keep the `TempDir` alive for as
    /// long as the path is used.
    pub fn write(self) -> (TempDir, PathBuf) {
        let tensors: Vec<TensorSpec> = self
            .tensors()
            .into_iter()
            .filter(|t| Some(t.name.as_str()) != self.omit_tensor)
            .collect();

        let mut meta: Vec<u8> = Vec::new();
        let mut kv_count = 0u64;
        let kv_u32 = |buf: &mut Vec<u8>, count: &mut u64, key: &str, value: u32| {
            if Some(key) == self.omit_key {
                return;
            }
            write_string(buf, key);
            buf.extend_from_slice(&T_U32.to_le_bytes());
            buf.extend_from_slice(&value.to_le_bytes());
            *count += 1;
        };

        kv_u32(&mut meta, &mut kv_count, "vocab_size", N_VOCAB as u32);
        kv_u32(&mut meta, &mut kv_count, "max_position_embedding", N_MAX_TOKENS as u32);
        kv_u32(&mut meta, &mut kv_count, "hidden_size", N_EMBD as u32);
        kv_u32(&mut meta, &mut kv_count, "intermediate_size", N_INTERMEDIATE as u32);
        kv_u32(&mut meta, &mut kv_count, "num_attention_heads", self.n_head);
        kv_u32(&mut meta, &mut kv_count, "num_hidden_layers", N_LAYER as u32);
        kv_u32(&mut meta, &mut kv_count, "general.file_type", 0);

        if Some("layer_norm_eps") != self.omit_key {
            write_string(&mut meta, "layer_norm_eps");
            meta.extend_from_slice(&T_F32.to_le_bytes());
            meta.extend_from_slice(&1e-12f32.to_le_bytes());
            kv_count += 1;
        }

        write_string(&mut meta, "general.name");
        meta.extend_from_slice(&T_STRING.to_le_bytes());
        write_string(&mut meta, "test-minilm");
        kv_count += 1;

        write_string(&mut meta, "general.description");
        meta.extend_from_slice(&T_STRING.to_le_bytes());
        write_string(&mut meta, "random fixture weights");
        kv_count += 1;

        if Some("tokenizer.ggml.tokens") != self.omit_key {
            let tokens = token_list();
            write_string(&mut meta, "tokenizer.ggml.tokens");
            meta.extend_from_slice(&T_ARRAY.to_le_bytes());
            meta.extend_from_slice(&T_STRING.to_le_bytes());
            meta.extend_from_slice(&(tokens.len() as u64).to_le_bytes());
            for token in &tokens {
                write_string(&mut meta, token);
            }
            kv_count += 1;
        }

        // tensor directory with 32-byte aligned blob offsets
        let mut infos: Vec<u8> = Vec::new();
        let mut offset = 0u64;
        let mut offsets = Vec::with_capacity(tensors.len());
        for spec in &tensors {
            offset = offset.div_ceil(ALIGNMENT) * ALIGNMENT;
            offsets.push(offset);

            write_string(&mut infos, &spec.name);
            infos.extend_from_slice(&(spec.dims.len() as u32).to_le_bytes());
            for dim in &spec.dims {
                infos.extend_from_slice(&dim.to_le_bytes());
            }
            infos.extend_from_slice(&DT_F32.to_le_bytes());
            infos.extend_from_slice(&offset.to_le_bytes());

            offset += (spec.data.len() * 4) as u64;
        }

        let mut file_bytes: Vec<u8> = Vec::new();
        file_bytes.extend_from_slice(&GGUF_MAGIC.to_le_bytes());
        file_bytes.extend_from_slice(&GGUF_VERSION.to_le_bytes());
        file_bytes.extend_from_slice(&(tensors.len() as u64).to_le_bytes());
        file_bytes.extend_from_slice(&kv_count.to_le_bytes());
        file_bytes.extend_from_slice(&meta);
        file_bytes.extend_from_slice(&infos);

        // data section starts at the next alignment boundary
        let data_base = (file_bytes.len() as u64).div_ceil(ALIGNMENT) * ALIGNMENT;
        file_bytes.resize(data_base as usize, 0);
        for (spec, tensor_offset) in tensors.iter().zip(&offsets) {
            file_bytes.resize((data_base + tensor_offset) as usize, 0);
            for value in &spec.data {
                file_bytes.extend_from_slice(&value.to_le_bytes());
            }
        }

        if self.truncate_data {
            file_bytes.truncate(data_base as usize + 16);
        }

        let dir = TempDir::new().expect("fixture temp dir");
        let path = dir.path().join("model.gguf");
        let mut file = File::create(&path).expect("fixture file");
        file.write_all(&file_bytes).expect("fixture write");
        (dir, path)
    }

    fn tensors(&self) -> Vec<TensorSpec> {
        let mut rng = StdRng::seed_from_u64(42);
        let e = N_EMBD;
        let i = N_INTERMEDIATE;
        let mut tensors = vec![
            matrix(&mut rng, "embeddings.word_embeddings.weight", N_VOCAB, e),
            matrix(&mut rng, "embeddings.token_type_embeddings.weight", self.token_type_rows, e),
            matrix(&mut rng, "embeddings.position_embeddings.weight", N_MAX_TOKENS, e),
            norm_weight(&mut rng, "embeddings.LayerNorm.weight", e),
            norm_bias(&mut rng, "embeddings.LayerNorm.bias", e),
        ];
        for l in 0..N_LAYER {
            let pre = format!("encoder.layer.{l}.");
            tensors.push(matrix(&mut rng, &format!("{pre}attention.self.query.weight"), e, e));
            tensors.push(vector(&mut rng, &format!("{pre}attention.self.query.bias"), e));
            tensors.push(matrix(&mut rng, &format!("{pre}attention.self.key.weight"), e, e));
            tensors.push(vector(&mut rng, &format!("{pre}attention.self.key.bias"), e));
            tensors.push(matrix(&mut rng, &format!("{pre}attention.self.value.weight"), e, e));
            tensors.push(vector(&mut rng, &format!("{pre}attention.self.value.bias"), e));
            tensors.push(matrix(&mut rng, &format!("{pre}attention.output.dense.weight"), e, e));
            tensors.push(vector(&mut rng, &format!("{pre}attention.output.dense.bias"), e));
            tensors.push(norm_weight(&mut rng, &format!("{pre}attention.output.LayerNorm.weight"), e));
            tensors.push(norm_bias(&mut rng, &format!("{pre}attention.output.LayerNorm.bias"), e));
            tensors.push(matrix(&mut rng, &format!("{pre}intermediate.dense.weight"), i, e));
            tensors.push(vector(&mut rng, &format!("{pre}intermediate.dense.bias"), i));
            tensors.push(matrix(&mut rng, &format!("{pre}output.dense.weight"), e, i));
            tensors.push(vector(&mut rng, &format!("{pre}output.dense.bias"), e));
            tensors.push(norm_weight(&mut rng, &format!("{pre}output.LayerNorm.weight"), e));
            tensors.push(norm_bias(&mut rng, &format!("{pre}output.LayerNorm.bias"), e));
        }
        tensors
    }
}

/// Default fixture: all keys, all tensors, valid geometry.
pub fn write_fixture() -> (TempDir, PathBuf) {
    FixtureBuilder::new().write()
}

/// Token list with the reserved ids at their observed positions and a few
/// real-looking words for encode tests.
pub fn token_list() -> Vec<String> {
    let mut tokens: Vec<String> = (0..N_VOCAB).map(|i| format!("tok{i}")).collect();
    tokens[0] = "[PAD]".to_string();
    tokens[100] = "[UNK]".to_string();
    tokens[101] = "[CLS]".to_string();
    tokens[102] = "[SEP]".to_string();
    tokens[5] = "hello".to_string();
    tokens[6] = "world".to_string();
    tokens[7] = "##ing".to_string();
    tokens[8] = ",".to_string();
    tokens[9] = "!".to_string();
    tokens[10] = "embed".to_string();
    tokens
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Row-major `[rows, cols]` random matrix, stored with innermost-first dims.
fn matrix(rng: &mut StdRng, name: &str, rows: usize, cols: usize) -> TensorSpec {
    TensorSpec {
        name: name.to_string(),
        dims: vec![cols as u64, rows as u64],
        data: (0..rows * cols).map(|_| rng.gen_range(-0.1..0.1)).collect(),
    }
}

fn vector(rng: &mut StdRng, name: &str, len: usize) -> TensorSpec {
    TensorSpec {
        name: name.to_string(),
        dims: vec![len as u64],
        data: (0..len).map(|_| rng.gen_range(-0.05..0.05)).collect(),
    }
}

fn norm_weight(rng: &mut StdRng, name: &str, len: usize) -> TensorSpec {
    TensorSpec {
        name: name.to_string(),
        dims: vec![len as u64],
        data: (0..len).map(|_| 1.0 + rng.gen_range(-0.05..0.05)).collect(),
    }
}

fn norm_bias(rng: &mut StdRng, name: &str, len: usize) -> TensorSpec {
    TensorSpec {
        name: name.to_string(),
        dims: vec![len as u64],
        data: (0..len).map(|_| rng.gen_range(-0.02..0.02)).collect(),
    }
}
