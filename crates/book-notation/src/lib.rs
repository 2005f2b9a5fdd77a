//! Chess-book notation parser.
//!
//! Reads the prose of a chess book, where moves are embedded in commentary
//! and variations are introduced out of order, and rebuilds the game tree the
//! text describes. The tree can then be written as PGN or JSON.

pub mod builder;
pub mod chapters;
pub mod config;
pub mod disambiguator;
pub mod error;
pub mod oracle;
pub mod pgn;
pub mod resolver;
pub mod token;
pub mod tokenizer;
pub mod tree;
pub mod tree_json;

use shakmaty::Chess;
use tracing::debug;

pub use builder::{BuilderState, Diagnostic, DiagnosticKind, ParsedGame, TreeBuilder};
pub use chapters::{convert_book, BookGame};
pub use config::{ParserConfig, TieBreak};
pub use error::{IllegalMove, NotationError};
pub use oracle::{Applied, PositionOracle, ShakmatyOracle};
pub use pgn::{write_pgn, PgnHeaders};
pub use token::{Glyph, MoveToken, Side, TextToken, Token};
pub use tokenizer::tokenize;
pub use tree::{GameTree, Node, NodeId, Resolution, WalkEvent};

/// Parse book text with the default configuration from the standard start.
pub fn parse(raw_text: &str) -> Result<ParsedGame<Chess>, NotationError> {
    parse_with(raw_text, &ParserConfig::default(), &ShakmatyOracle::new())
}

/// Parse book text with a custom configuration and position oracle.
pub fn parse_with<O: PositionOracle>(
    raw_text: &str,
    config: &ParserConfig,
    oracle: &O,
) -> Result<ParsedGame<O::Position>, NotationError> {
    let tokens = tokenize(raw_text);
    let game = TreeBuilder::new(oracle, config)?.build(raw_text, &tokens)?;
    debug!(
        tokens = tokens.len(),
        nodes = game.tree.len(),
        diagnostics = game.diagnostics.len(),
        "Parsed text"
    );
    Ok(game)
}

/// Oracle for the configured start position.
pub fn oracle_for(config: &ParserConfig) -> Result<ShakmatyOracle, NotationError> {
    match config.start_fen.as_deref() {
        Some(fen) => ShakmatyOracle::from_fen(fen),
        None => Ok(ShakmatyOracle::new()),
    }
}
