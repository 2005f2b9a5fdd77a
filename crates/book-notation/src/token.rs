//! Token types produced by the tokenizer.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Side to move. A move token's marker is the side that plays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("white"),
            Side::Black => f.write_str("black"),
        }
    }
}

/// Annotation glyph written after a move ("!", "?!", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Glyph {
    Good,
    Mistake,
    Brilliant,
    Blunder,
    Speculative,
    Dubious,
}

impl Glyph {
    pub fn parse(text: &str) -> Option<Glyph> {
        match text {
            "!" => Some(Glyph::Good),
            "?" => Some(Glyph::Mistake),
            "!!" => Some(Glyph::Brilliant),
            "??" => Some(Glyph::Blunder),
            "!?" => Some(Glyph::Speculative),
            "?!" => Some(Glyph::Dubious),
            _ => None,
        }
    }

    /// Numeric Annotation Glyph used in PGN (`$1` .. `$6`).
    pub fn nag(self) -> u8 {
        match self {
            Glyph::Good => 1,
            Glyph::Mistake => 2,
            Glyph::Brilliant => 3,
            Glyph::Blunder => 4,
            Glyph::Speculative => 5,
            Glyph::Dubious => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Glyph::Good => "!",
            Glyph::Mistake => "?",
            Glyph::Brilliant => "!!",
            Glyph::Blunder => "??",
            Glyph::Speculative => "!?",
            Glyph::Dubious => "?!",
        }
    }
}

/// How the move number and side of a move token were established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerSource {
    /// "12." or "12..." written in the text.
    Explicit,
    /// Bare SAN right after a White move, read as Black's reply.
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveToken {
    pub move_number: u32,
    pub marker: Side,
    pub marker_source: MarkerSource,
    /// Normalized SAN (zero castling rewritten, promotion "=" inserted).
    pub san_text: String,
    pub suffix: Option<Glyph>,
    /// Byte range of the whole notation in the source, number included.
    pub span: Range<usize>,
}

impl MoveToken {
    /// Notation as it would be written with an explicit number.
    pub fn label(&self) -> String {
        match self.marker {
            Side::White => format!("{}.{}", self.move_number, self.san_text),
            Side::Black => format!("{}...{}", self.move_number, self.san_text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextToken {
    pub text: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Move(MoveToken),
    Text(TextToken),
}

impl Token {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Token::Move(m) => &m.span,
            Token::Text(t) => &t.span,
        }
    }

    pub fn as_move(&self) -> Option<&MoveToken> {
        match self {
            Token::Move(m) => Some(m),
            Token::Text(_) => None,
        }
    }
}
