//! WordPiece vocabulary: whole-word and subword continuation maps.
//!
//! The container stores one flat token list. Surfaces beginning with `##` are
//! continuation pieces and are keyed without the prefix; everything else is a
//! whole-word piece. Both maps share one id space. On a duplicate surface the
//! whole-word map keeps the first id while the subword map keeps the last,
//! matching the reference loader.

use std::collections::HashMap;

/// Token id as stored in the container (32-bit, non-negative).
pub type TokenId = u32;

/// Reserved ids observed across BERT-family checkpoints. Models that deviate
/// carry their ids in container metadata and override these at load.
pub const DEFAULT_UNK_ID: TokenId = 100;
pub const DEFAULT_CLS_ID: TokenId = 101;
pub const DEFAULT_SEP_ID: TokenId = 102;

/// The three reserved token ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialIds {
    /// Sequence-start sentinel.
    pub cls: TokenId,
    /// Sequence-end sentinel.
    pub sep: TokenId,
    /// Unknown-token sentinel.
    pub unk: TokenId,
}

impl Default for SpecialIds {
    fn default() -> Self {
        Self {
            cls: DEFAULT_CLS_ID,
            sep: DEFAULT_SEP_ID,
            unk: DEFAULT_UNK_ID,
        }
    }
}

/// Two-map WordPiece vocabulary with an id-to-surface index for diagnostics.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    whole: HashMap<String, TokenId>,
    sub: HashMap<String, TokenId>,
    id_to_text: HashMap<TokenId, String>,
    specials: SpecialIds,
}

impl Vocabulary {
    pub fn new(specials: SpecialIds) -> Self {
        Self {
            whole: HashMap::new(),
            sub: HashMap::new(),
            id_to_text: HashMap::new(),
            specials,
        }
    }

    /// Build a vocabulary from an ordered token list, assigning ids by
    /// position.
    pub fn from_tokens<'a, I>(tokens: I, specials: SpecialIds) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut vocab = Self::new(specials);
        for (id, surface) in tokens.into_iter().enumerate() {
            vocab.push_token(surface, id as TokenId);
        }
        vocab
    }

    /// Register one token surface under the given id.
    ///
    /// `##`-prefixed surfaces land in the subword map keyed without the
    /// prefix; other surfaces land in the whole-word map. A whole-word
    /// surface seen twice keeps its first id; a subword surface seen twice is
    /// overwritten and keeps its last.
    pub fn push_token(&mut self, surface: &str, id: TokenId) {
        if let Some(stripped) = surface.strip_prefix("##") {
            self.sub.insert(stripped.to_string(), id);
        } else {
            self.whole.entry(surface.to_string()).or_insert(id);
        }
        self.id_to_text.entry(id).or_insert_with(|| surface.to_string());
    }

    /// Whole-word lookup (first piece of a word).
    pub fn whole_id(&self, piece: &str) -> Option<TokenId> {
        self.whole.get(piece).copied()
    }

    /// Continuation lookup (pieces after the first; `##` already stripped).
    pub fn sub_id(&self, piece: &str) -> Option<TokenId> {
        self.sub.get(piece).copied()
    }

    /// Original surface for an id, `##` prefix intact on subword entries.
    pub fn id_to_text(&self, id: TokenId) -> Option<&str> {
        self.id_to_text.get(&id).map(String::as_str)
    }

    pub fn specials(&self) -> SpecialIds {
        self.specials
    }

    /// Number of distinct surfaces registered (whole + subword).
    pub fn len(&self) -> usize {
        self.whole.len() + self.sub.len()
    }

    pub fn is_empty(&self) -> bool {
        self.whole.is_empty() && self.sub.is_empty()
    }
}
