//! Position oracle: the chess-rules collaborator behind the parser.
//!
//! The parser never looks inside a position. It only asks the oracle whose
//! turn it is, which fullmove it is, and whether a SAN string can be played.

use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::{CastlingMode, Chess, Color, Position};

use crate::error::{IllegalMove, NotationError};
use crate::token::Side;

/// Result of playing a move from a position.
#[derive(Debug, Clone)]
pub struct Applied<P> {
    /// Canonical SAN of the move in the position it was played from,
    /// including check/mate suffix. Two moves from the same position are the
    /// same move exactly when their canonical SAN is equal.
    pub san: String,
    pub position: P,
}

pub trait PositionOracle {
    type Position: Clone;

    fn initial_position(&self) -> Self::Position;

    fn apply(&self, position: &Self::Position, san: &str)
        -> Result<Applied<Self::Position>, IllegalMove>;

    fn turn_of(&self, position: &Self::Position) -> Side;

    fn fullmove_number_of(&self, position: &Self::Position) -> u32;
}

/// Standard chess rules through shakmaty.
#[derive(Debug, Clone, Default)]
pub struct ShakmatyOracle {
    start: Chess,
}

impl ShakmatyOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a FEN instead of the standard position.
    pub fn from_fen(fen: &str) -> Result<Self, NotationError> {
        let parsed: Fen = fen.trim().parse().map_err(|e| NotationError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{e}"),
        })?;
        let start: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| NotationError::InvalidFen {
                fen: fen.to_string(),
                reason: format!("{e}"),
            })?;
        Ok(Self { start })
    }
}

impl PositionOracle for ShakmatyOracle {
    type Position = Chess;

    fn initial_position(&self) -> Chess {
        self.start.clone()
    }

    fn apply(&self, position: &Chess, san: &str) -> Result<Applied<Chess>, IllegalMove> {
        let parsed = SanPlus::from_ascii(san.as_bytes())
            .map_err(|_| IllegalMove::Syntax(san.to_string()))?;
        let mv = parsed
            .san
            .to_move(position)
            .map_err(|_| IllegalMove::Illegal(san.to_string()))?;

        let canonical = San::from_move(position, mv.clone());
        let next = position
            .clone()
            .play(mv)
            .map_err(|_| IllegalMove::Illegal(san.to_string()))?;

        let suffix = if next.is_checkmate() {
            "#"
        } else if next.is_check() {
            "+"
        } else {
            ""
        };

        Ok(Applied {
            san: format!("{canonical}{suffix}"),
            position: next,
        })
    }

    fn turn_of(&self, position: &Chess) -> Side {
        match position.turn() {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }

    fn fullmove_number_of(&self, position: &Chess) -> u32 {
        position.fullmoves().get()
    }
}
