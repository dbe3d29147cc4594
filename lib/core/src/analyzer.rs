use rust_stemmers::{Algorithm, Stemmer};

/// Character classes driving the lexer: ascii letter and digit runs merge
/// into tokens, every other non-space character stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Letter,
    Digit,
    Space,
    Other(char),
}

#[inline]
#[must_use]
pub fn char_class(c: char) -> CharClass {
    match c {
        'a'..='z' => CharClass::Letter,
        '0'..='9' => CharClass::Digit,
        c if c.is_whitespace() => CharClass::Space,
        c => CharClass::Other(c),
    }
}

/// Lowercasing lexer + English suffix-stripping stemmer shared by the
/// full-text indexer and the query parser.
pub struct Analyzer {
    stemmer: Stemmer,
}

impl Analyzer {
    #[must_use]
    pub fn new() -> Self {
        Analyzer {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Lex text into tokens and stem the word tokens.
    ///
    /// Letter and digit runs become one token each; punctuation comes out
    /// as single-character tokens (the query parser consumes `"` and `-`,
    /// the indexer drops punctuation entirely).
    #[must_use]
    pub fn lex_and_stem(&self, text: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        let mut last = CharClass::Space;

        for c in text.to_lowercase().chars() {
            let class = char_class(c);
            match class {
                CharClass::Space => {}
                CharClass::Letter | CharClass::Digit if class == last => {
                    if let Some(token) = tokens.last_mut() {
                        token.push(c);
                    }
                }
                _ => tokens.push(c.to_string()),
            }
            last = class;
        }

        for token in &mut tokens {
            if token.starts_with(|c: char| c.is_ascii_lowercase()) {
                *token = self.stemmer.stem(token).into_owned();
            }
        }
        tokens
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::new()
    }
}

/// True for tokens the indexer keeps: word and number tokens, not
/// punctuation.
#[inline]
#[must_use]
pub fn is_indexable(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Join tokens with single spaces and wrap in a leading/trailing space, so
/// a padded token is substring-searchable on word boundaries.
#[must_use]
pub fn pad(tokens: &[String]) -> String {
    format!(" {} ", tokens.join(" "))
}

/// Pad a single token.
#[must_use]
pub fn pad_token(token: &str) -> String {
    format!(" {token} ")
}
