//! Tokenizer for the RPC surface syntax
//!
//! Accepted characters: identifiers `[A-Za-z_][A-Za-z0-9_]*`, concatenation
//! `.`, alternation `|` or `∣` (collapsed to one token), parentheses, Kleene
//! `*`, inverse marker `^`, inclusion `⊆` or `<=` (collapsed), assignment
//! `=` or `:` (collapsed), the terminator `;` and whitespace.
//!
//! Normalisations happen here so the parser sees a single canonical stream:
//! whitespace is discarded, everything after a `;` is discarded, and the
//! ASCII/Unicode operator spellings are unified. Any other character is a
//! [`LexError`] carrying the character position.

#![forbid(unsafe_code)]

use std::fmt;

/// One lexical unit of the RPC surface syntax.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// A relation name: `[A-Za-z_][A-Za-z0-9_]*`.
    Ident(String),
    /// Concatenation `.`.
    Dot,
    /// Alternation `|` or `∣`.
    Or,
    /// `(`.
    LParen,
    /// `)`.
    RParen,
    /// Kleene `*`.
    Star,
    /// Inverse marker `^`.
    Caret,
    /// Inclusion `⊆` or `<=`.
    Subset,
    /// Assignment `=` or `:`.
    Assign,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Human-readable rendering used in parse diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Dot => "'.'".into(),
            TokenKind::Or => "'∣'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::Star => "'*'".into(),
            TokenKind::Caret => "'^'".into(),
            TokenKind::Subset => "'⊆'".into(),
            TokenKind::Assign => "'='".into(),
            TokenKind::Eof => "end of input".into(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A token plus the character position it starts at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// What was recognised.
    pub kind: TokenKind,
    /// 0-based character offset into the lexed text.
    pub pos: usize,
}

impl Token {
    /// Construct a token at `pos`.
    pub fn new(kind: TokenKind, pos: usize) -> Self {
        Self { kind, pos }
    }
}

/// A character outside the surface alphabet.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unexpected character '{ch}' at position {pos}")]
pub struct LexError {
    /// 0-based character offset of the offending character.
    pub pos: usize,
    /// The offending character.
    pub ch: char,
}

/// Tokenize `input` into a stream terminated by [`TokenKind::Eof`].
///
/// Positions are character offsets (not bytes), so the Unicode operator
/// spellings count as one position each.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = input.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        if c == ';' {
            // Terminator: the rest of the line is not part of the constraint.
            break;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let kind = match c {
            '.' => TokenKind::Dot,
            '|' | '∣' => TokenKind::Or,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '*' => TokenKind::Star,
            '^' => TokenKind::Caret,
            '⊆' => TokenKind::Subset,
            '<' if chars.get(i + 1) == Some(&'=') => {
                toks.push(Token::new(TokenKind::Subset, i));
                i += 2;
                continue;
            }
            '=' | ':' => TokenKind::Assign,
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                let mut name = String::new();
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_')
                {
                    name.push(chars[i]);
                    i += 1;
                }
                toks.push(Token::new(TokenKind::Ident(name), start));
                continue;
            }
            other => return Err(LexError { pos: i, ch: other }),
        };
        toks.push(Token::new(kind, i));
        i += 1;
    }

    toks.push(Token::new(TokenKind::Eof, i));
    Ok(toks)
}

// ============================================================================
// Tests
// ============================================================================
