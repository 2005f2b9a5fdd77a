#![allow(dead_code)]

use std::io::Cursor;
use std::ops::ControlFlow;

use book_notation::{parse, NodeId, ParsedGame};
use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Position};

/// Parse text that is expected to succeed.
pub fn parse_ok(text: &str) -> ParsedGame<Chess> {
    parse(text).unwrap_or_else(|e| panic!("parse failed for {text:?}: {e}"))
}

/// Follow canonical SANs from the root; panics if a move is missing.
pub fn find_line(game: &ParsedGame<Chess>, line: &[&str]) -> NodeId {
    let mut cursor = NodeId::ROOT;
    for san in line {
        cursor = game
            .tree
            .child_with_move(cursor, san)
            .unwrap_or_else(|| panic!("no {san} after {cursor} while following {line:?}"));
    }
    cursor
}

/// Canonical SANs of a node's children, in discovery order.
pub fn children_san(game: &ParsedGame<Chess>, node: NodeId) -> Vec<String> {
    let node = game.tree.node(node).expect("node exists");
    node.children
        .iter()
        .filter_map(|&c| game.tree.get(c).and_then(|n| n.mv.as_ref()))
        .map(|mv| mv.san.clone())
        .collect()
}

/// What a standard PGN reader saw in one exported game.
#[derive(Debug, Default)]
pub struct ReadBack {
    pub event: String,
    pub white: String,
    pub sans: usize,
    pub illegal: usize,
    pub variations: usize,
}

struct Movetext {
    pos: Chess,
    before_last: Chess,
    stack: Vec<(Chess, Chess)>,
}

#[derive(Default)]
struct ReadBackVisitor {
    summary: ReadBack,
}

impl Visitor for ReadBackVisitor {
    type Tags = ();
    type Movetext = Movetext;
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<(), ()> {
        ControlFlow::Continue(())
    }

    fn tag(&mut self, _tags: &mut (), name: &[u8], value: RawTag<'_>) -> ControlFlow<()> {
        match name {
            b"Event" => self.summary.event = value.decode_utf8_lossy().to_string(),
            b"White" => self.summary.white = value.decode_utf8_lossy().to_string(),
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: ()) -> ControlFlow<(), Movetext> {
        ControlFlow::Continue(Movetext {
            pos: Chess::default(),
            before_last: Chess::default(),
            stack: Vec::new(),
        })
    }

    fn san(&mut self, state: &mut Movetext, san_plus: SanPlus) -> ControlFlow<()> {
        match san_plus.san.to_move(&state.pos) {
            Ok(mv) => {
                let next = state.pos.clone().play(mv).unwrap_or_else(|_| state.pos.clone());
                state.before_last = std::mem::replace(&mut state.pos, next);
                self.summary.sans += 1;
            }
            Err(_) => self.summary.illegal += 1,
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, state: &mut Movetext) -> ControlFlow<(), Skip> {
        state
            .stack
            .push((state.pos.clone(), state.before_last.clone()));
        // A variation replaces the move just played.
        state.pos = state.before_last.clone();
        self.summary.variations += 1;
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, state: &mut Movetext) -> ControlFlow<()> {
        if let Some((pos, before_last)) = state.stack.pop() {
            state.pos = pos;
            state.before_last = before_last;
        }
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, _state: Movetext) {}
}

/// Read one game from PGN text with `pgn-reader`.
pub fn read_back(pgn: &str) -> ReadBack {
    let mut reader = Reader::new(Cursor::new(pgn.as_bytes()));
    let mut visitor = ReadBackVisitor::default();
    let found = reader
        .read_game(&mut visitor)
        .expect("PGN is readable");
    assert!(found.is_some(), "no game in PGN:\n{pgn}");
    visitor.summary
}
