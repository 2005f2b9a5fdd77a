//! Tree builder: consumes the token stream in order and grows the game tree.
//!
//! The builder tracks where the text currently is (`current`) and the tip of
//! the main line (`main_line_leaf`). Each move token is resolved against the
//! whole registry, so a move can land on any open position, not just the last
//! one. When the move numbers show the prose has returned to the trunk, the
//! cursor jumps back to the main line.

use std::collections::VecDeque;
use std::fmt;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::disambiguator::{ActiveCue, Context, Disambiguator};
use crate::error::NotationError;
use crate::oracle::PositionOracle;
use crate::resolver::{resolve, Candidate, Revisit};
use crate::token::{MoveToken, TextToken, Token};
use crate::tree::{GameTree, NodeId, NodeMove, Resolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    OnMainLine,
    InVariation { depth: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// No node accepted the move; the token was skipped.
    Unparseable,
    /// The parent was picked without anything to tell candidates apart.
    LowConfidence,
}

/// Recoverable problem found during a parse, reported next to the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Byte offset of the token in the source text.
    pub offset: usize,
    /// Token text as written in the source.
    pub token: String,
    pub node: Option<NodeId>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::Unparseable => {
                write!(f, "offset {}: '{}' fits no position, skipped", self.offset, self.token)
            }
            DiagnosticKind::LowConfidence => write!(
                f,
                "offset {}: '{}' attached by tie-break, parent may be wrong",
                self.offset, self.token
            ),
        }
    }
}

/// A finished parse: the tree and whatever could not be placed with
/// confidence.
#[derive(Debug, Clone)]
pub struct ParsedGame<P> {
    pub tree: GameTree<P>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<P> ParsedGame<P> {
    pub fn unparseable(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Unparseable)
    }

    pub fn low_confidence(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::LowConfidence)
    }
}

/// Recent commentary kept for cue detection.
#[derive(Debug, Clone)]
struct RecentText {
    has_cue: bool,
    /// First variation node created after this text.
    branch: Option<NodeId>,
}

pub struct TreeBuilder<'a, O: PositionOracle> {
    oracle: &'a O,
    config: &'a ParserConfig,
    cue_matcher: Option<Regex>,
    tree: GameTree<O::Position>,
    current: NodeId,
    main_line_leaf: NodeId,
    /// Node that trailing commentary attaches to.
    last_touched: NodeId,
    state: BuilderState,
    recent_text: VecDeque<RecentText>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, O: PositionOracle> TreeBuilder<'a, O> {
    pub fn new(oracle: &'a O, config: &'a ParserConfig) -> Result<Self, NotationError> {
        let start = oracle.initial_position();
        let fullmove = oracle.fullmove_number_of(&start);
        let side = oracle.turn_of(&start);

        Ok(Self {
            oracle,
            config,
            cue_matcher: config.cue_matcher()?,
            tree: GameTree::new(start, fullmove, side),
            current: NodeId::ROOT,
            main_line_leaf: NodeId::ROOT,
            last_touched: NodeId::ROOT,
            state: BuilderState::OnMainLine,
            recent_text: VecDeque::new(),
            diagnostics: Vec::new(),
        })
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn main_line_leaf(&self) -> NodeId {
        self.main_line_leaf
    }

    /// Consume every token of `source` in order and return the tree.
    pub fn build(
        mut self,
        source: &str,
        tokens: &[Token],
    ) -> Result<ParsedGame<O::Position>, NotationError> {
        for (index, token) in tokens.iter().enumerate() {
            let span = token.span();
            let written = source
                .get(span.clone())
                .ok_or(NotationError::SpanOutOfBounds {
                    start: span.start,
                    end: span.end,
                    len: source.len(),
                })?;

            match token {
                Token::Text(text) => self.absorb_text(text)?,
                Token::Move(mv) => self.absorb_move(mv, written, &tokens[index + 1..])?,
            }
        }

        debug!(
            nodes = self.tree.len(),
            main_line = self.tree.main_line().len(),
            diagnostics = self.diagnostics.len(),
            "Tree built"
        );

        Ok(ParsedGame {
            tree: self.tree,
            diagnostics: self.diagnostics,
        })
    }

    fn absorb_text(&mut self, text: &TextToken) -> Result<(), NotationError> {
        self.tree
            .node_mut(self.last_touched)?
            .append_comment(&text.text);

        if self.config.cue_history == 0 {
            return Ok(());
        }
        let has_cue = self
            .cue_matcher
            .as_ref()
            .is_some_and(|m| m.is_match(&text.text));
        self.recent_text.push_back(RecentText {
            has_cue,
            branch: None,
        });
        while self.recent_text.len() > self.config.cue_history {
            self.recent_text.pop_front();
        }
        Ok(())
    }

    fn absorb_move(
        &mut self,
        token: &MoveToken,
        written: &str,
        upcoming: &[Token],
    ) -> Result<(), NotationError> {
        self.return_to_main_line(token)?;

        let resolved = resolve(self.oracle, &self.tree, token);

        // Same move again from where the text already is: walk into it.
        if let Some(revisit) = resolved
            .revisits
            .iter()
            .find(|r| r.parent == self.current)
            .copied()
        {
            return self.revisit(revisit, token);
        }

        if resolved.candidates.is_empty() {
            return match self.pick_revisit(&resolved.revisits) {
                Some(revisit) => self.revisit(revisit, token),
                None => self.skip(token, written),
            };
        }

        let decision = {
            let ctx = Context {
                tree: &self.tree,
                current: self.current,
                cue: self.active_cue(),
                upcoming,
            };
            Disambiguator::new(self.oracle, self.config.lookahead_window, &self.config.tie_break)
                .choose(&ctx, &resolved.candidates)
        };
        let decision = decision.ok_or_else(|| {
            NotationError::Structural(format!("no decision for {}", token.label()))
        })?;

        let candidate = resolved
            .candidates
            .into_iter()
            .nth(decision.index)
            .ok_or_else(|| {
                NotationError::Structural(format!(
                    "decision index {} out of range for {}",
                    decision.index,
                    token.label()
                ))
            })?;

        let id = self.attach(candidate, token, decision.resolution)?;

        if decision.resolution.is_low_confidence() {
            let diagnostic = Diagnostic {
                kind: DiagnosticKind::LowConfidence,
                offset: token.span.start,
                token: written.to_string(),
                node: Some(id),
            };
            warn!(%diagnostic, "Ambiguous move placement");
            self.diagnostics.push(diagnostic);
        }
        Ok(())
    }

    /// Snap back to the trunk when the token's move number continues the
    /// main-line leaf, however deep the current excursion is.
    fn return_to_main_line(&mut self, token: &MoveToken) -> Result<(), NotationError> {
        if self.current == self.main_line_leaf {
            return Ok(());
        }
        let leaf = self.tree.node(self.main_line_leaf)?.continuation();
        if leaf == (token.move_number, token.marker) {
            debug!(
                token = %token.label(),
                from = %self.current,
                to = %self.main_line_leaf,
                "Returning to main line"
            );
            self.current = self.main_line_leaf;
            self.state = BuilderState::OnMainLine;
        }
        Ok(())
    }

    /// A cue stays in force for every move until `cue_window` newer text
    /// tokens have arrived, unless a main-line attach spent it before its
    /// branch opened.
    fn active_cue(&self) -> Option<ActiveCue> {
        self.recent_text
            .iter()
            .rev()
            .take(self.config.cue_window)
            .find(|r| r.has_cue)
            .map(|r| ActiveCue { branch: r.branch })
    }

    fn attach(
        &mut self,
        candidate: Candidate<O::Position>,
        token: &MoveToken,
        resolution: Resolution,
    ) -> Result<NodeId, NotationError> {
        let Candidate { parent, applied } = candidate;
        let extends_main = parent == self.main_line_leaf;
        let fullmove = self.oracle.fullmove_number_of(&applied.position);
        let side = self.oracle.turn_of(&applied.position);
        let mv = NodeMove {
            san: applied.san,
            written: token.san_text.clone(),
            glyph: token.suffix,
            offset: token.span.start,
        };

        let id = self.tree.attach(
            parent,
            mv,
            applied.position,
            fullmove,
            side,
            extends_main,
            resolution,
        )?;

        if extends_main {
            self.main_line_leaf = id;
        }
        self.current = id;
        self.last_touched = id;
        self.refresh_state();

        for recent in self.recent_text.iter_mut().filter(|r| r.has_cue) {
            if extends_main {
                // The prose led into the main line, not a digression.
                if recent.branch.is_none() {
                    recent.has_cue = false;
                }
            } else if recent.branch.is_none() {
                recent.branch = Some(id);
            }
        }

        debug!(
            token = %token.label(),
            node = %id,
            parent = %parent,
            ?resolution,
            state = ?self.state,
            "Attached move"
        );
        Ok(id)
    }

    fn revisit(&mut self, revisit: Revisit, token: &MoveToken) -> Result<(), NotationError> {
        debug!(token = %token.label(), node = %revisit.child, "Move already in tree");
        self.current = revisit.child;
        self.last_touched = revisit.child;
        self.refresh_state();
        Ok(())
    }

    /// Among existing children, prefer the main line, then the newest.
    fn pick_revisit(&self, revisits: &[Revisit]) -> Option<Revisit> {
        revisits.iter().copied().max_by_key(|r| {
            let main = self.tree.get(r.child).is_some_and(|n| n.is_main_line);
            (main, r.child)
        })
    }

    fn skip(&mut self, token: &MoveToken, written: &str) -> Result<(), NotationError> {
        let diagnostic = Diagnostic {
            kind: DiagnosticKind::Unparseable,
            offset: token.span.start,
            token: written.to_string(),
            node: None,
        };
        warn!(%diagnostic, "Skipping move token");
        self.diagnostics.push(diagnostic);
        // Keep the words in the commentary so nothing from the book is lost.
        self.tree.node_mut(self.last_touched)?.append_comment(written);
        Ok(())
    }

    fn refresh_state(&mut self) {
        self.state = if self.current == self.main_line_leaf {
            BuilderState::OnMainLine
        } else {
            BuilderState::InVariation {
                depth: self.tree.variation_depth(self.current),
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ShakmatyOracle;
    use crate::tokenizer::tokenize;
    use crate::tree::Resolution;

    fn build(text: &str) -> ParsedGame<shakmaty::Chess> {
        let oracle = ShakmatyOracle::new();
        let config = ParserConfig::default();
        let tokens = tokenize(text);
        TreeBuilder::new(&oracle, &config)
            .unwrap()
            .build(text, &tokens)
            .unwrap()
    }

    fn find(game: &ParsedGame<shakmaty::Chess>, line: &[&str]) -> NodeId {
        let mut cursor = NodeId::ROOT;
        for san in line {
            cursor = game
                .tree
                .child_with_move(cursor, san)
                .unwrap_or_else(|| panic!("no {san} after {cursor}"));
        }
        cursor
    }

    #[test]
    fn test_simple_main_line() {
        let game = build("1.e4 e5 2.Nf3 Nc6 3.Bb5");
        assert_eq!(game.tree.main_line_san(), vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
        assert!(game.diagnostics.is_empty());
    }

    #[test]
    fn test_variation_then_return_to_trunk() {
        let game = build(
            "1.c4 Nf6 2.Nc3 d6 3.g3 g6 Instead, 3...e5 4.Bg2 Nbd7 5.d3 Be7 \
             Back to the game. 4.Bg2 Bg7 5.e4 e5",
        );
        assert_eq!(
            game.tree.main_line_san(),
            vec!["c4", "Nf6", "Nc3", "d6", "g3", "g6", "Bg2", "Bg7", "e4", "e5"]
        );
        let side_line = find(&game, &["c4", "Nf6", "Nc3", "d6", "g3", "e5", "Bg2", "Nbd7"]);
        assert!(!game.tree.node(side_line).unwrap().is_main_line);
        assert!(game.diagnostics.is_empty());
    }

    #[test]
    fn test_cued_sibling_variation_keeps_its_own_line() {
        let game = build("1.d4 d5 Instead, 1...Nf6 2.c4 e6");
        assert_eq!(game.tree.main_line_san(), vec!["d4", "d5"]);
        let e6 = find(&game, &["d4", "Nf6", "c4", "e6"]);
        assert_eq!(game.tree.variation_depth(e6), 1);
    }

    #[test]
    fn test_wider_cue_window_survives_a_comment() {
        let text = "1.c4 Nf6 2.Nc3 d6 3.g3 g6 4.Bg2 Bg7 Instead, 3...e5 4.Bg2 Nbd7 \
                    with a solid setup. 5.d3 Be7";
        let oracle = ShakmatyOracle::new();
        let config = ParserConfig {
            cue_window: 2,
            ..ParserConfig::default()
        };
        let tokens = tokenize(text);
        let game = TreeBuilder::new(&oracle, &config)
            .unwrap()
            .build(text, &tokens)
            .unwrap();

        assert_eq!(
            game.tree.main_line_san(),
            vec!["c4", "Nf6", "Nc3", "d6", "g3", "g6", "Bg2", "Bg7"]
        );
        let d3 = find(&game, &["c4", "Nf6", "Nc3", "d6", "g3", "e5", "Bg2", "Nbd7", "d3"]);
        assert_eq!(game.tree.node(d3).unwrap().resolution, Resolution::VariationCue);

        // With the default window the comment replaces the cue and 5.d3
        // continues the trunk.
        let game = build(text);
        assert_eq!(game.tree.main_line_san().last().map(String::as_str), Some("d3"));
    }

    #[test]
    fn test_comments_follow_their_move() {
        let game = build("Opening words. 1.e4 {best by test} e5 A classical reply.");
        assert_eq!(game.tree.root().comment.as_deref(), Some("Opening words."));
        let e4 = find(&game, &["e4"]);
        assert_eq!(
            game.tree.node(e4).unwrap().comment.as_deref(),
            Some("{best by test}")
        );
        let e5 = find(&game, &["e4", "e5"]);
        assert_eq!(
            game.tree.node(e5).unwrap().comment.as_deref(),
            Some("A classical reply.")
        );
    }

    #[test]
    fn test_repeated_moves_resolve_to_existing_nodes() {
        let game = build("1.e4 e5 2.Nf3 Nc6 Going back, 1.e4 c5 2.Nf3 d6");
        assert_eq!(game.tree.main_line_san(), vec!["e4", "e5", "Nf3", "Nc6"]);
        let e4 = find(&game, &["e4"]);
        assert_eq!(game.tree.node(e4).unwrap().children.len(), 2);
        let d6 = find(&game, &["e4", "c5", "Nf3", "d6"]);
        assert_eq!(game.tree.node(d6).unwrap().resolution, Resolution::CurrentBranch);
        // e4, e5, Nf3, Nc6, c5, Nf3, d6 plus the root.
        assert_eq!(game.tree.len(), 8);
    }

    #[test]
    fn test_unparseable_token_is_skipped_and_recorded() {
        let game = build("1.e4 e5 2.Ke3 2.Nf3 Nc6");
        assert_eq!(game.tree.main_line_san(), vec!["e4", "e5", "Nf3", "Nc6"]);
        let skipped: Vec<_> = game.unparseable().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].token, "2.Ke3");
        assert_eq!(skipped[0].offset, 8);
        let e5 = find(&game, &["e4", "e5"]);
        assert_eq!(game.tree.node(e5).unwrap().comment.as_deref(), Some("2.Ke3"));
    }

    #[test]
    fn test_glyph_and_written_form_are_kept() {
        let game = build("1.e4 e5 2.Nf3 Nc6 3.Bb5 a6 4.Ba4 Nf6 5.0-0!");
        let castle = *game.tree.main_line().last().unwrap();
        let mv = game.tree.node(castle).unwrap().mv.clone().unwrap();
        assert_eq!(mv.san, "O-O");
        assert_eq!(mv.glyph, Some(crate::token::Glyph::Good));
    }

    #[test]
    fn test_state_tracks_variation_depth() {
        let oracle = ShakmatyOracle::new();
        let config = ParserConfig::default();
        let mut builder = TreeBuilder::new(&oracle, &config).unwrap();
        let text = "1.e4 e5 1...c5";
        let tokens = tokenize(text);
        for (index, token) in tokens.iter().enumerate() {
            if let Token::Move(mv) = token {
                let written = &text[mv.span.clone()];
                builder
                    .absorb_move(mv, written, &tokens[index + 1..])
                    .unwrap();
            }
        }
        assert_eq!(builder.state(), BuilderState::InVariation { depth: 1 });
        assert_ne!(builder.current(), builder.main_line_leaf());
    }

    #[test]
    fn test_move_number_of_trunk_pulls_back_to_main_line() {
        // No cue: 2.c4 continues the main-line leaf, so it goes there.
        let game = build("1.d4 d5 1...Nf6 2.c4");
        assert_eq!(game.tree.main_line_san(), vec!["d4", "d5", "c4"]);
        let c4 = find(&game, &["d4", "d5", "c4"]);
        assert_eq!(
            game.tree.node(c4).unwrap().resolution,
            Resolution::CurrentBranch
        );
        let nf6 = find(&game, &["d4", "Nf6"]);
        assert!(game.tree.node(nf6).unwrap().children.is_empty());
    }

    #[test]
    fn test_bad_span_is_structural_error() {
        let oracle = ShakmatyOracle::new();
        let config = ParserConfig::default();
        let tokens = vec![Token::Text(TextToken {
            text: "x".into(),
            span: 0..50,
        })];
        let err = TreeBuilder::new(&oracle, &config)
            .unwrap()
            .build("short", &tokens)
            .unwrap_err();
        assert!(matches!(err, NotationError::SpanOutOfBounds { .. }));
    }
}
