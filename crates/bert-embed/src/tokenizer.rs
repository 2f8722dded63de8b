//! Greedy longest-match WordPiece tokenization.
//!
//! The pipeline is: normalize, isolate punctuation and CJK codepoints with
//! surrounding spaces, split on ASCII whitespace, then segment each word by
//! repeatedly taking the longest vocabulary match. The first segment of a
//! word is drawn from the whole-word map, later segments from the
//! continuation map.

use crate::normalize::normalize;
use crate::vocab::{TokenId, Vocabulary};

/// Convert text to a CLS/SEP-framed id sequence of at most `n_max` tokens.
///
/// Never fails: a word with no vocabulary match at all degrades to a single
/// UNK, and an unmatched byte inside a word is skipped while the scan
/// continues in the continuation map. The byte-skip behavior follows the
/// huggingface BERT lineage this tokenizer reproduces, not canonical
/// WordPiece (which would replace the whole word with UNK).
pub fn tokenize(vocab: &Vocabulary, text: &str, n_max: usize) -> Vec<TokenId> {
    let specials = vocab.specials();
    // one slot stays reserved for the trailing SEP
    let limit = n_max.saturating_sub(1);

    let pre = pre_split(&normalize(text));

    let mut ids = Vec::with_capacity(16);
    ids.push(specials.cls);

    for word in pre
        .split(|c: char| c.is_ascii_whitespace())
        .filter(|w| !w.is_empty())
    {
        let n = word.len();
        let emitted_before = ids.len();
        let mut i = 0;
        let mut continuation = false;

        while i < n && ids.len() < limit {
            let mut matched = false;
            let mut j = n;
            while j > i {
                // word.get returns None off a char boundary, which can only
                // miss the vocabulary anyway
                let id = word.get(i..j).and_then(|piece| {
                    if continuation {
                        vocab.sub_id(piece)
                    } else {
                        vocab.whole_id(piece)
                    }
                });
                if let Some(id) = id {
                    ids.push(id);
                    i = j;
                    continuation = true;
                    matched = true;
                    break;
                }
                j -= 1;
            }
            if !matched {
                tracing::trace!(
                    target: "bert_embed::tokenizer",
                    word,
                    byte = i,
                    "no vocabulary match, skipping one byte"
                );
                continuation = true;
                i += 1;
            }
        }

        if ids.len() == emitted_before && ids.len() < limit {
            ids.push(specials.unk);
        }
    }

    ids.push(specials.sep);
    ids
}

/// Rewrite the normalized text with single spaces around ASCII punctuation
/// and CJK codepoints so the whitespace split isolates them as words.
fn pre_split(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_punctuation() || (c.len_utf8() == 3 && is_cjk_char(c)) {
            out.push(' ');
            out.push(c);
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// CJK ranges isolated by the pre-split. The `0x2B920` lower bound matches
/// the huggingface rust normalizer; the canonical Extension E block starts at
/// `0x2B820`. Kept as-is so token streams line up with reference output.
fn is_cjk_char(c: char) -> bool {
    matches!(u32::from(c),
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2B73F
        | 0x2B740..=0x2B81F
        | 0x2B920..=0x2CEAF
        | 0xF900..=0xFAFF
        | 0x2F800..=0x2FA1F
        | 0x3000..=0x303F
        | 0xFF00..=0xFFEF)
}
