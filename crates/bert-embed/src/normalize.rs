//! Text normalization applied ahead of tokenization.
//!
//! Folds the Latin-1 accented letters onto plain ASCII and lowercases ASCII
//! letters. Everything else passes through untouched; CJK isolation happens
//! later in the tokenizer pre-split.

/// Normalize a prompt: strip accents, then lowercase ASCII.
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let c = fold_accent(c).unwrap_or(c);
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Accent table covering the Latin-1 letters that fold to one ASCII letter.
/// Letters outside the table (including all non-Latin scripts) are kept.
fn fold_accent(c: char) -> Option<char> {
    Some(match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ý' => 'Y',
        'ý' => 'y',
        'Ç' => 'C',
        'ç' => 'c',
        'Ñ' => 'N',
        'ñ' => 'n',
        _ => return None,
    })
}
