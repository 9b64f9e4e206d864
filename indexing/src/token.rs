//! The token model shared by every [`crate::tokenize::Tokenizer`] implementation.

/// Kind of lexical unit a [`Token`] represents.
///
/// The index does not act on this yet; it is carried through so a future ranking layer can
/// weigh matches by kind without having to re-tokenize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Keyword,
    Identifier,
    String,
    Number,
    Word,
    Comment,
    Punctuation,
    Unknown,
}

impl TokenType {
    /// Default relevance weight for this token kind, in `[0, 1]`.
    pub fn default_relevance(self) -> f64 {
        match self {
            TokenType::Keyword => 1.0,
            TokenType::Identifier => 0.9,
            TokenType::String => 0.8,
            TokenType::Number => 0.7,
            TokenType::Word => 0.6,
            TokenType::Comment => 0.4,
            TokenType::Punctuation => 0.2,
            TokenType::Unknown => 0.5,
        }
    }
}

/// A single lexical unit produced by a tokenizer.
///
/// `value` is the verbatim matched text; normalization (case folding, trimming) happens later,
/// in the index, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: String,
    pub line: u32,
    pub column: u32,
    pub token_type: TokenType,
    pub relevance: f64,
}

impl Token {
    /// Build a token, defaulting its relevance to the token type's default.
    ///
    /// `line` must be `>= 1`; callers within this crate uphold that, and tokenizers from outside
    /// the crate are trusted to do the same.
    pub fn new(value: impl Into<String>, line: u32, column: u32, token_type: TokenType) -> Self {
        let relevance = token_type.default_relevance();
        Self {
            value: value.into(),
            line,
            column,
            token_type,
            relevance,
        }
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = relevance;
        self
    }
}
