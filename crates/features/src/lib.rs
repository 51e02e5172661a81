//! Text features for brand comparison and classification.
//!
//! Provides pure functions for computing features used in scoring:
//! - Lexical similarity (normalized Levenshtein)
//! - Tokenization with stop-word removal
//! - Phonetic encodings (Soundex, Metaphone)
//! - Nice class overlap

use rphonetic::{Encoder, Metaphone, Soundex};
use std::collections::BTreeSet;

/// Function words dropped before token matching (English and Italian).
pub const STOP_WORDS: &[&str] = &[
    // English
    "and", "any", "are", "but", "for", "from", "into", "not", "other", "others", "our", "such",
    "that", "the", "their", "these", "this", "those", "used", "using", "via", "with", "without",
    "being", "all", "its", "which", "also", "etc", "namely", "purposes", "included",
    "class", "classes", "goods", "services", "products",
    // Italian
    "con", "che", "del", "della", "delle", "dei", "degli", "dello", "per", "tra", "fra", "una",
    "uno", "gli", "nel", "nella", "nelle", "nei", "sul", "sulla", "sui", "alla", "alle",
    "agli", "dal", "dalla", "dai", "come", "non", "suo", "sua", "loro", "questo", "questa",
    "anche", "altri", "altre", "altro", "ecc", "prodotti", "servizi", "classe",
];

/// Tokens shorter than this carry no classification signal.
pub const MIN_TOKEN_LEN: usize = 3;

/// Lowercase `text`, split on anything that is not alphanumeric, and drop stop words.
///
/// Returns tokens in order of first appearance, without duplicates.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(t))
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// Normalize text for comparison.
pub fn normalize_text(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compute Levenshtein edit distance between two strings.
pub fn edit_distance(s1: &str, s2: &str) -> usize {
    let s1: Vec<char> = s1.chars().collect();
    let s2: Vec<char> = s2.chars().collect();
    let len1 = s1.len();
    let len2 = s2.len();

    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = if s1[i - 1] == s2[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[len1][len2]
}

/// Lexical similarity of two marks on a 0-100 scale.
///
/// Case-insensitive and whitespace-trimmed. Blank input on either side scores 0.
pub fn similarity(a: &str, b: &str) -> u8 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return 100;
    }

    let max_len = a.chars().count().max(b.chars().count());
    let distance = edit_distance(&a, &b);
    let ratio = (max_len - distance) as f64 / max_len as f64;

    (ratio * 100.0).round() as u8
}

/// Phonetic encoding results for a mark.
#[derive(Debug, Clone, Default)]
pub struct PhoneticCodes {
    pub soundex: Option<String>,
    pub metaphone: Option<String>,
}

/// Compute phonetic encodings for a mark text.
pub fn compute_phonetics(text: &str) -> PhoneticCodes {
    let soundex = Soundex::default();
    let metaphone = Metaphone::default();

    let soundex_code = soundex.encode(text);
    let metaphone_code = metaphone.encode(text);

    PhoneticCodes {
        soundex: if soundex_code.is_empty() { None } else { Some(soundex_code) },
        metaphone: if metaphone_code.is_empty() { None } else { Some(metaphone_code) },
    }
}

/// Check if two texts are phonetically similar.
///
/// Returns the algorithm and shared code on a match.
pub fn phonetic_match(text1: &str, text2: &str) -> Option<(String, String)> {
    let codes1 = compute_phonetics(&normalize_text(text1));
    let codes2 = compute_phonetics(&normalize_text(text2));

    if let (Some(s1), Some(s2)) = (&codes1.soundex, &codes2.soundex) {
        if s1 == s2 {
            return Some(("soundex".to_string(), s1.clone()));
        }
    }

    if let (Some(m1), Some(m2)) = (&codes1.metaphone, &codes2.metaphone) {
        if m1 == m2 {
            return Some(("metaphone".to_string(), m1.clone()));
        }
    }

    None
}

/// Check Nice class overlap.
pub fn class_overlap(classes1: &[u16], classes2: &[u16]) -> Vec<u16> {
    classes1
        .iter()
        .filter(|c| classes2.contains(c))
        .copied()
        .collect()
}
