//! Tokenizer contract and the bundled word tokenizer.
//!
//! A [`Tokenizer`] converts a text blob into an ordered sequence of [`Token`]s. The index only
//! relies on the guarantees documented on the trait; any type meeting them can stand in for
//! [`WordTokenizer`].

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::token::{Token, TokenType};

/// Converts text into an ordered sequence of tokens.
///
/// Implementors must uphold:
///  * line numbers are 1-based and non-decreasing across the returned sequence;
///  * tokens for line `n` precede any token for line `n + 1`;
///  * empty lines emit no tokens (but are still counted towards line numbers);
///  * every returned token's `value` is non-empty.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>>;
}

fn punctuation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\p{P}$").expect("static pattern is valid"))
}

/// The bundled reference tokenizer: splits on whitespace, strips leading/trailing Unicode
/// punctuation from each field, optionally lower-cases, and drops tokens shorter than
/// `min_length`.
#[derive(Debug, Clone)]
pub struct WordTokenizer {
    min_length: usize,
    lowercase: bool,
}

impl Default for WordTokenizer {
    fn default() -> Self {
        Self {
            min_length: 2,
            lowercase: false,
        }
    }
}

impl WordTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard tokens shorter than `min_length` (after punctuation stripping). Default: 2.
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    /// Lower-case each surviving token's value before returning it. Default: off; the index
    /// normalizes independently of what the tokenizer hands it.
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    fn strip_punctuation<'a>(&self, field: &'a str) -> &'a str {
        let mut start = 0;
        let mut end = field.len();

        while start < end {
            let c = field[start..].chars().next().unwrap();
            if !c.is_whitespace() && !is_unicode_punct(c) {
                break;
            }
            start += c.len_utf8();
        }
        while end > start {
            let c = field[..end].chars().next_back().unwrap();
            if !c.is_whitespace() && !is_unicode_punct(c) {
                break;
            }
            end -= c.len_utf8();
        }

        &field[start..end]
    }
}

fn is_unicode_punct(c: char) -> bool {
    punctuation_regex().is_match(&c.to_string())
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut tokens = Vec::new();

        for (line_idx, line) in text.lines().enumerate() {
            let line_no = (line_idx + 1) as u32;

            for field in line.split_whitespace() {
                let stripped = self.strip_punctuation(field);
                if stripped.is_empty() || stripped.chars().count() < self.min_length {
                    continue;
                }

                let value = if self.lowercase {
                    stripped.to_lowercase()
                } else {
                    stripped.to_owned()
                };

                tokens.push(Token::new(value, line_no, 0, TokenType::Word));
            }
        }

        Ok(tokens)
    }
}

/// Marker used by callers that want to assert the `InvalidInput` path without constructing a
/// tokenizer that can actually fail; kept so the `Result`-returning contract has a reachable
/// error arm to exercise in tests.
pub fn reject_invalid(text: Option<&str>) -> Result<&str> {
    text.ok_or_else(|| Error::invalid_input("tokenizer input was unset"))
}
