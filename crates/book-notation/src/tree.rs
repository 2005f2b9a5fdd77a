//! Game tree arena.
//!
//! Nodes live in a flat, insertion-ordered registry and refer to each other
//! by index. A node is one ply; the root is the starting position and has no
//! move. Positions reached twice by different move orders stay separate nodes.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::NotationError;
use crate::token::{Glyph, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How the parent of a node was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    /// Only one node accepted the move.
    Unique,
    /// Several did; the branch the text was already in won.
    CurrentBranch,
    /// Several did; prose before the move announced a variation.
    VariationCue,
    /// Several did; one continued the upcoming moves further than the rest.
    Lookahead { score: usize },
    /// Lookahead tied; a configured tie-break criterion decided.
    TieBreak,
    /// Nothing separated the candidates; lowest node id taken.
    Arbitrary,
}

impl Resolution {
    pub fn is_low_confidence(self) -> bool {
        matches!(self, Resolution::Arbitrary)
    }
}

/// The move that produced a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeMove {
    /// Canonical SAN from the oracle; identity among siblings.
    pub san: String,
    /// SAN as it appeared in the book.
    pub written: String,
    pub glyph: Option<Glyph>,
    /// Byte offset of the notation in the source text.
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct Node<P> {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub mv: Option<NodeMove>,
    pub position: P,
    pub fullmove: u32,
    pub side_to_move: Side,
    pub comment: Option<String>,
    pub is_main_line: bool,
    pub resolution: Resolution,
}

impl<P> Node<P> {
    /// Move number and side of the move that would be played from here.
    pub fn continuation(&self) -> (u32, Side) {
        (self.fullmove, self.side_to_move)
    }

    /// Move number of the move that produced this node.
    pub fn move_number(&self) -> u32 {
        match self.side_to_move {
            // White to move means Black just played, still in the previous fullmove.
            Side::White => self.fullmove.saturating_sub(1).max(1),
            Side::Black => self.fullmove,
        }
    }

    /// Side that played the move leading to this node.
    pub fn mover(&self) -> Side {
        self.side_to_move.opposite()
    }

    pub fn append_comment(&mut self, text: &str) {
        let text = normalize_whitespace(text);
        if text.is_empty() {
            return;
        }
        self.comment = Some(match self.comment.take() {
            Some(existing) => format!("{existing} {text}"),
            None => text,
        });
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Node registry plus the structure it encodes.
#[derive(Debug, Clone)]
pub struct GameTree<P> {
    nodes: Vec<Node<P>>,
    by_ply: HashMap<(u32, Side), Vec<NodeId>>,
}

impl<P> GameTree<P> {
    pub fn new(root_position: P, fullmove: u32, side_to_move: Side) -> Self {
        let root = Node {
            id: NodeId::ROOT,
            parent: None,
            children: Vec::new(),
            mv: None,
            position: root_position,
            fullmove,
            side_to_move,
            comment: None,
            is_main_line: true,
            resolution: Resolution::Unique,
        };
        let mut by_ply = HashMap::new();
        by_ply.insert((fullmove, side_to_move), vec![NodeId::ROOT]);
        Self {
            nodes: vec![root],
            by_ply,
        }
    }

    pub fn root(&self) -> &Node<P> {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root always exists; a tree "is empty" when no move was attached.
        self.nodes.len() == 1
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<P>> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node<P>, NotationError> {
        self.nodes.get(id.0).ok_or(NotationError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<P>, NotationError> {
        self.nodes.get_mut(id.0).ok_or(NotationError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<P>> {
        self.nodes.iter()
    }

    /// Nodes (in creation order) from which `side` plays move `number`.
    pub fn at_ply(&self, number: u32, side: Side) -> &[NodeId] {
        self.by_ply
            .get(&(number, side))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Child of `parent` reached by the move with canonical SAN `san`.
    pub fn child_with_move(&self, parent: NodeId, san: &str) -> Option<NodeId> {
        let parent = self.get(parent)?;
        parent.children.iter().copied().find(|&child| {
            self.get(child)
                .and_then(|c| c.mv.as_ref())
                .is_some_and(|mv| mv.san == san)
        })
    }

    /// Add a child. If `parent` already has a child with the same canonical
    /// move, that child is returned and nothing is created.
    pub fn attach(
        &mut self,
        parent: NodeId,
        mv: NodeMove,
        position: P,
        fullmove: u32,
        side_to_move: Side,
        is_main_line: bool,
        resolution: Resolution,
    ) -> Result<NodeId, NotationError> {
        self.node(parent)?;
        if let Some(existing) = self.child_with_move(parent, &mv.san) {
            return Ok(existing);
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            children: Vec::new(),
            mv: Some(mv),
            position,
            fullmove,
            side_to_move,
            comment: None,
            is_main_line,
            resolution,
        });
        self.node_mut(parent)?.children.push(id);
        self.by_ply.entry((fullmove, side_to_move)).or_default().push(id);
        Ok(id)
    }

    /// True when `node` is `ancestor` or lies below it.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Ids from the root (excluded) down to `node` (included).
    pub fn path_to(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == NodeId::ROOT {
                break;
            }
            path.push(id);
            cursor = self.get(id).and_then(|n| n.parent);
        }
        path.reverse();
        path
    }

    /// Whether `node` opens a variation: it is not the principal child of its
    /// parent (the main-line child on the main line, else the first child).
    pub fn starts_variation(&self, node: NodeId) -> bool {
        let Some(parent) = self.get(node).and_then(|n| n.parent) else {
            return false;
        };
        self.ordered_children(parent).first() != Some(&node)
    }

    /// Number of variation starts between the root and `node`.
    pub fn variation_depth(&self, node: NodeId) -> usize {
        self.path_to(node)
            .into_iter()
            .filter(|&id| self.starts_variation(id))
            .count()
    }

    /// Children with the main-line child first, then discovery order.
    pub fn ordered_children(&self, parent: NodeId) -> Vec<NodeId> {
        let Some(node) = self.get(parent) else {
            return Vec::new();
        };
        let mut children = node.children.clone();
        children.sort_by_key(|&c| !self.get(c).is_some_and(|n| n.is_main_line));
        children
    }

    /// Main line as a list of node ids, root excluded.
    pub fn main_line(&self) -> Vec<NodeId> {
        let mut line = Vec::new();
        let mut cursor = NodeId::ROOT;
        while let Some(next) = self
            .get(cursor)
            .and_then(|n| n.children.iter().copied().find(|&c| self.nodes[c.0].is_main_line))
        {
            line.push(next);
            cursor = next;
        }
        line
    }

    /// Canonical SAN of the main line.
    pub fn main_line_san(&self) -> Vec<String> {
        self.main_line()
            .into_iter()
            .filter_map(|id| self.get(id).and_then(|n| n.mv.as_ref()).map(|m| m.san.clone()))
            .collect()
    }

    /// Canonical SAN of the moves leading to `node`.
    pub fn line_san(&self, node: NodeId) -> Vec<String> {
        self.path_to(node)
            .into_iter()
            .filter_map(|id| self.get(id).and_then(|n| n.mv.as_ref()).map(|m| m.san.clone()))
            .collect()
    }

    /// Depth-first traversal, main line first at each branch point.
    ///
    /// At a branch the principal child is yielded, then each alternative as a
    /// complete nested variation, then the principal line continues; the same
    /// order PGN movetext uses.
    pub fn walk(&self) -> Vec<WalkEvent<'_, P>> {
        enum Work {
            Continue(NodeId),
            Open(NodeId),
            Close,
        }

        let mut events = Vec::new();
        let mut stack = vec![Work::Continue(NodeId::ROOT)];

        while let Some(work) = stack.pop() {
            match work {
                Work::Continue(parent) => {
                    let children = self.ordered_children(parent);
                    let Some((&principal, alternatives)) = children.split_first() else {
                        continue;
                    };
                    events.push(WalkEvent::Move {
                        node: &self.nodes[principal.0],
                        starts_variation: false,
                    });
                    stack.push(Work::Continue(principal));
                    for &alt in alternatives.iter().rev() {
                        stack.push(Work::Close);
                        stack.push(Work::Continue(alt));
                        stack.push(Work::Open(alt));
                    }
                }
                Work::Open(node) => events.push(WalkEvent::Move {
                    node: &self.nodes[node.0],
                    starts_variation: true,
                }),
                Work::Close => events.push(WalkEvent::EndVariation),
            }
        }

        events
    }
}

/// One step of [`GameTree::walk`].
#[derive(Debug)]
pub enum WalkEvent<'a, P> {
    Move {
        node: &'a Node<P>,
        starts_variation: bool,
    },
    EndVariation,
}
