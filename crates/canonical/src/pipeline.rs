use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use unicode_categories::UnicodeCategories;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::CanonicalizeConfig;
use crate::error::CanonicalError;
use crate::token::Token;

/// Normalized text plus the tokens carved out of it.
///
/// `text` is the tokens joined by single spaces; every token's offsets index
/// into it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalText {
    pub text: String,
    pub tokens: Vec<Token>,
}

impl CanonicalText {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Normalize `input` and split it into tokens.
///
/// Empty, whitespace-only or punctuation-only input produces an empty
/// [`CanonicalText`]; only an invalid config is an error.
pub fn canonicalize(
    input: &str,
    cfg: &CanonicalizeConfig,
) -> Result<CanonicalText, CanonicalError> {
    cfg.validate()?;

    // NFKC can change character boundaries, so it runs before anything else.
    let normalized: Cow<str> = if cfg.normalize_unicode {
        Cow::Owned(input.nfkc().collect::<String>())
    } else {
        Cow::Borrowed(input)
    };

    let mut state = TokenizerState {
        text: String::with_capacity(normalized.len()),
        tokens: Vec::with_capacity((normalized.len() / 5).saturating_add(1)),
        pending_space: false,
        token_start: None,
    };

    for grapheme in normalized.graphemes(true) {
        // Lowercasing can expand one character into several (e.g. 'İ').
        if cfg.lowercase {
            for ch in grapheme.to_lowercase().chars() {
                state.dispatch(ch, cfg);
            }
        } else {
            for ch in grapheme.chars() {
                state.dispatch(ch, cfg);
            }
        }
    }
    state.finalize_token();

    Ok(CanonicalText {
        text: state.text,
        tokens: state.tokens,
    })
}

/// Normalize `input` and return only its tokens.
pub fn tokenize(input: &str, cfg: &CanonicalizeConfig) -> Result<Vec<Token>, CanonicalError> {
    canonicalize(input, cfg).map(|canonical| canonical.tokens)
}

struct TokenizerState {
    text: String,
    tokens: Vec<Token>,
    pending_space: bool,
    token_start: Option<usize>,
}

impl TokenizerState {
    fn dispatch(&mut self, ch: char, cfg: &CanonicalizeConfig) {
        let is_delim = ch.is_whitespace() || (cfg.strip_punctuation && ch.is_punctuation());
        if is_delim {
            self.finalize_token();
            if !self.text.is_empty() {
                self.pending_space = true;
            }
        } else {
            self.append(ch);
        }
    }

    fn append(&mut self, ch: char) {
        if self.pending_space {
            self.text.push(' ');
            self.pending_space = false;
            self.token_start = Some(self.text.len());
        } else if self.token_start.is_none() {
            self.token_start = Some(self.text.len());
        }
        self.text.push(ch);
    }

    fn finalize_token(&mut self) {
        if let Some(start) = self.token_start.take() {
            let end = self.text.len();
            if start < end {
                self.tokens.push(Token {
                    text: self.text[start..end].to_string(),
                    start,
                    end,
                });
            }
        }
    }
}
