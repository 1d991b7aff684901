//! Text normalization and tokenization for revision shingling.
//!
//! Turns raw document text into the ordered token stream that the shingle
//! generator windows over.
//!
//! ## What we do
//!
//! - Optional Unicode NFKC normalization (off by default)
//! - Locale-free lowercasing
//! - Splitting on whitespace and, by default, on punctuation (which is dropped)
//! - Byte offsets for every token into the normalized text
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock calls, no OS/locale dependence. The same text and config
//! give the same tokens on any machine. Empty or whitespace-only text is not
//! an error: it yields no tokens.
//!
//! ```rust
//! use canonical::{tokenize, CanonicalizeConfig};
//!
//! let tokens = tokenize("The quick, brown fox!", &CanonicalizeConfig::default()).unwrap();
//! let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(words, ["the", "quick", "brown", "fox"]);
//! ```

mod config;
mod error;
mod pipeline;
mod token;

pub use crate::config::CanonicalizeConfig;
pub use crate::error::CanonicalError;
pub use crate::pipeline::{canonicalize, tokenize, CanonicalText};
pub use crate::token::Token;

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &str, cfg: &CanonicalizeConfig) -> Vec<String> {
        tokenize(input, cfg)
            .expect("tokenize succeeds")
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn default_tokenize_splits_and_folds() {
        let input = "  Hello,\nWORLD!  This is   a TEST. ";
        let cfg = CanonicalizeConfig::default();
        let out = canonicalize(input, &cfg).expect("canonicalize succeeds");

        assert_eq!(out.text, "hello world this is a test");
        let expected = vec![
            ("hello", 0usize, 5usize),
            ("world", 6, 11),
            ("this", 12, 16),
            ("is", 17, 19),
            ("a", 20, 21),
            ("test", 22, 26),
        ];
        assert_eq!(out.tokens.len(), expected.len());
        for (token, (text, start, end)) in out.tokens.iter().zip(expected) {
            assert_eq!(token.text, text);
            assert_eq!(token.start, start);
            assert_eq!(token.end, end);
            assert_eq!(&out.text[token.start..token.end], text);
        }
    }

    #[test]
    fn punctuation_inside_words_splits_them() {
        let cfg = CanonicalizeConfig::default();
        assert_eq!(words("It's 100% fun.", &cfg), vec!["it", "s", "100", "fun"]);
    }

    #[test]
    fn keeping_punctuation_matches_whitespace_split() {
        let cfg = CanonicalizeConfig::default().with_strip_punctuation(false);
        assert_eq!(
            words("Hello, World! foo", &cfg),
            vec!["hello,", "world!", "foo"]
        );
    }

    #[test]
    fn lowercase_can_be_disabled() {
        let cfg = CanonicalizeConfig::default().with_lowercase(false);
        assert_eq!(words("Hello World", &cfg), vec!["Hello", "World"]);
    }

    #[test]
    fn empty_and_blank_inputs_yield_no_tokens() {
        let cfg = CanonicalizeConfig::default();
        for input in ["", " ", "\t\n", "  \r\n  ", "!!! ... ---"] {
            let out = canonicalize(input, &cfg).expect("blank input is not an error");
            assert!(out.is_empty(), "expected no tokens for {input:?}");
            assert!(out.text.is_empty());
        }
    }

    #[test]
    fn unicode_equivalence_with_nfkc() {
        let cfg = CanonicalizeConfig::default().with_normalize_unicode(true);
        assert_eq!(words("Caf\u{00E9}", &cfg), words("Cafe\u{0301}", &cfg));
    }

    #[test]
    fn without_nfkc_decomposed_forms_differ() {
        let cfg = CanonicalizeConfig::default();
        assert_ne!(words("Caf\u{00E9}", &cfg), words("Cafe\u{0301}", &cfg));
    }

    #[test]
    fn token_offsets_stable_for_non_bmp() {
        let cfg = CanonicalizeConfig::default();
        let tokens = tokenize(" a\u{10348}b  c ", &cfg).expect("tokenize succeeds");
        let expected = vec![
            Token {
                text: "a\u{10348}b".to_string(),
                start: 0,
                end: "a\u{10348}b".len(),
            },
            Token {
                text: "c".to_string(),
                start: "a\u{10348}b ".len(),
                end: "a\u{10348}b c".len(),
            },
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn tokenize_is_deterministic() {
        let cfg = CanonicalizeConfig::default();
        let text = "The quick brown fox; the QUICK brown fox.";
        assert_eq!(tokenize(text, &cfg), tokenize(text, &cfg));
    }

    #[test]
    fn invalid_config_version_rejected() {
        let cfg = CanonicalizeConfig {
            version: 0,
            ..Default::default()
        };
        assert!(matches!(
            tokenize("content", &cfg),
            Err(CanonicalError::InvalidConfig(_))
        ));
    }
}
