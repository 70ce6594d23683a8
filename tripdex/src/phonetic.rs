//! Approximate-sound keys for typo-tolerant matching.
//!
//! A key is the consonant skeleton of a word after a handful of English
//! spelling rewrites: silent letters go, doubled consonants collapse and vowels
//! after the first letter are ignored, so "Chisholm", "Chisolm" and "Chissom"
//! all reduce to `ksm`, and "Stoneleigh"/"Stonleigh" to `stnl`.
//!
//! Each word yields a primary key and, when it differs, a looser secondary key
//! that also merges voiced/unvoiced consonant pairs (b/p, d/t, g/k, v/f, m/n).
//! Words without letters produce no keys.

use std::collections::BTreeSet;

/// Keys shorter than this carry too little signal and are discarded.
pub const MIN_KEY_LEN: usize = 2;

/// Phonetic keys for a single token: primary first, then secondary if distinct.
pub fn phonetic_keys(token: &str) -> Vec<String> {
    let letters = fold_letters(token);
    if letters.is_empty() {
        return Vec::new();
    }

    let primary = encode_skeleton(&letters);
    if primary.len() < MIN_KEY_LEN {
        return Vec::new();
    }

    let secondary = loosen(&primary);
    if secondary != primary && secondary.len() >= MIN_KEY_LEN {
        vec![primary, secondary]
    } else {
        vec![primary]
    }
}

/// Union of the keys of every token, ordered for stable serialization.
pub fn phonetic_tokens<'a, I>(tokens: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens.into_iter().flat_map(phonetic_keys).collect()
}

/// Lowercase ASCII letters only, with common Latin accents folded.
fn fold_letters(token: &str) -> Vec<char> {
    token
        .chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| match c {
            'a'..='z' => Some(c),
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => Some('a'),
            'è' | 'é' | 'ê' | 'ë' => Some('e'),
            'ì' | 'í' | 'î' | 'ï' => Some('i'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => Some('o'),
            'ù' | 'ú' | 'û' | 'ü' => Some('u'),
            'ç' => Some('c'),
            'ñ' => Some('n'),
            'ý' | 'ÿ' => Some('y'),
            _ => None,
        })
        .collect()
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Strip silent leading clusters: kn, gn, pn, wr, ps; leading x sounds like s.
fn strip_leading_cluster(letters: &[char]) -> Vec<char> {
    match letters {
        ['k', 'n', ..] | ['g', 'n', ..] | ['p', 'n', ..] => letters[1..].to_vec(),
        ['w', 'r', ..] => letters[1..].to_vec(),
        ['p', 's', ..] => letters[1..].to_vec(),
        ['x', rest @ ..] => std::iter::once('s').chain(rest.iter().copied()).collect(),
        _ => letters.to_vec(),
    }
}

fn encode_skeleton(letters: &[char]) -> String {
    let chars = strip_leading_cluster(letters);
    let mut key = String::with_capacity(chars.len());
    fn push(key: &mut String, code: char) {
        if !key.ends_with(code) {
            key.push(code);
        }
    }

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let first = i == 0;

        match (c, next) {
            ('p', Some('h')) => {
                push(&mut key, 'f');
                i += 2;
                continue;
            }
            ('g', Some('h')) => {
                if first {
                    push(&mut key, 'g');
                }
                i += 2;
                continue;
            }
            ('c', Some('h')) | ('c', Some('k')) => {
                push(&mut key, 'k');
                i += 2;
                continue;
            }
            ('c', Some('e' | 'i' | 'y')) => push(&mut key, 's'),
            ('c', _) | ('q', _) => push(&mut key, 'k'),
            ('x', _) => {
                push(&mut key, 'k');
                push(&mut key, 's');
            }
            ('z', _) => push(&mut key, 's'),
            ('l', Some('m')) => {}
            _ if first && is_vowel(c) && c != 'y' => push(&mut key, 'a'),
            _ if first => push(&mut key, c),
            ('h' | 'w', _) => {}
            _ if is_vowel(c) => {}
            _ => push(&mut key, c),
        }
        i += 1;
    }
    key
}

/// Merge consonants that are commonly confused in transcription.
fn loosen(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        let mapped = match c {
            'b' => 'p',
            'd' => 't',
            'g' | 'j' => 'k',
            'v' => 'f',
            'm' => 'n',
            other => other,
        };
        if !out.ends_with(mapped) {
            out.push(mapped);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary(token: &str) -> String {
        phonetic_keys(token).into_iter().next().unwrap_or_default()
    }

    #[test]
    fn test_chisholm_variants_share_key() {
        assert_eq!(primary("chisholm"), "ksm");
        assert_eq!(primary("chisolm"), "ksm");
        assert_eq!(primary("chissom"), "ksm");
    }

    #[test]
    fn test_stoneleigh_variants_share_key() {
        assert_eq!(primary("stoneleigh"), "stnl");
        assert_eq!(primary("stonleigh"), "stnl");
    }

    #[test]
    fn test_ph_and_f_agree() {
        assert_eq!(primary("stephanie"), primary("stefanie"));
    }

    #[test]
    fn test_leading_vowels_normalized() {
        assert_eq!(primary("eileen"), primary("aileen"));
    }

    #[test]
    fn test_silent_leading_clusters() {
        assert_eq!(primary("knight"), primary("night"));
        assert_eq!(primary("wright"), primary("right"));
    }

    #[test]
    fn test_secondary_key_merges_voicing() {
        let keys = phonetic_keys("dublin");
        assert_eq!(keys, vec!["dbln".to_string(), "tpln".to_string()]);
        assert!(phonetic_keys("tublin").contains(&"tpln".to_string()));
    }

    #[test]
    fn test_secondary_key_omitted_when_identical() {
        assert_eq!(phonetic_keys("stoneleigh"), vec!["stnl".to_string()]);
    }

    #[test]
    fn test_non_alphabetic_yields_nothing() {
        assert!(phonetic_keys("2025").is_empty());
        assert!(phonetic_keys("").is_empty());
        assert!(phonetic_keys("--").is_empty());
    }

    #[test]
    fn test_too_short_keys_discarded() {
        assert!(phonetic_keys("aaa").is_empty());
        assert!(phonetic_keys("hi").is_empty());
    }

    #[test]
    fn test_accents_folded() {
        assert_eq!(primary("chloë"), "kl");
        assert_eq!(primary("chloë"), primary("chloe"));
        assert_eq!(primary("josé"), primary("jose"));
    }

    #[test]
    fn test_deterministic_union() {
        let a = phonetic_tokens(["chisholm", "stoneleigh"]);
        let b = phonetic_tokens(["stoneleigh", "chisholm"]);
        assert_eq!(a, b);
        assert!(a.contains("ksm"));
        assert!(a.contains("stnl"));
    }
}
