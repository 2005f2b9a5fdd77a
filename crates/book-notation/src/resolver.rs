//! Candidate resolver: which registered positions can the move token continue?

use crate::oracle::{Applied, PositionOracle};
use crate::token::MoveToken;
use crate::tree::{GameTree, NodeId};

/// A node that accepts the move and has no such child yet.
#[derive(Debug, Clone)]
pub struct Candidate<P> {
    pub parent: NodeId,
    pub applied: Applied<P>,
}

/// A node that already has this exact move as a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revisit {
    pub parent: NodeId,
    pub child: NodeId,
}

#[derive(Debug, Clone)]
pub struct Resolved<P> {
    pub candidates: Vec<Candidate<P>>,
    pub revisits: Vec<Revisit>,
}

impl<P> Resolved<P> {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.revisits.is_empty()
    }
}

/// Every node whose (fullmove, side) matches the token and whose position
/// accepts the SAN, split into fresh candidates and revisits. Registry order
/// (creation order) is preserved.
pub fn resolve<O: PositionOracle>(
    oracle: &O,
    tree: &GameTree<O::Position>,
    token: &MoveToken,
) -> Resolved<O::Position> {
    let mut candidates = Vec::new();
    let mut revisits = Vec::new();

    for &id in tree.at_ply(token.move_number, token.marker) {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let applied = match oracle.apply(&node.position, &token.san_text) {
            Ok(applied) => applied,
            Err(_) => continue,
        };
        match tree.child_with_move(id, &applied.san) {
            Some(child) => revisits.push(Revisit { parent: id, child }),
            None => candidates.push(Candidate { parent: id, applied }),
        }
    }

    Resolved {
        candidates,
        revisits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ShakmatyOracle;
    use crate::token::{MarkerSource, Side};
    use crate::tree::{NodeMove, Resolution};

    fn token(number: u32, side: Side, san: &str) -> MoveToken {
        MoveToken {
            move_number: number,
            marker: side,
            marker_source: MarkerSource::Explicit,
            san_text: san.to_string(),
            suffix: None,
            span: 0..0,
        }
    }

    fn play(
        oracle: &ShakmatyOracle,
        tree: &mut GameTree<shakmaty::Chess>,
        parent: NodeId,
        san: &str,
    ) -> NodeId {
        let position = tree.node(parent).unwrap().position.clone();
        let applied = oracle.apply(&position, san).unwrap();
        let fullmove = oracle.fullmove_number_of(&applied.position);
        let side = oracle.turn_of(&applied.position);
        let mv = NodeMove {
            san: applied.san,
            written: san.to_string(),
            glyph: None,
            offset: 0,
        };
        tree.attach(parent, mv, applied.position, fullmove, side, false, Resolution::Unique)
            .unwrap()
    }

    fn new_tree(oracle: &ShakmatyOracle) -> GameTree<shakmaty::Chess> {
        let start = oracle.initial_position();
        let fullmove = oracle.fullmove_number_of(&start);
        let side = oracle.turn_of(&start);
        GameTree::new(start, fullmove, side)
    }

    #[test]
    fn test_two_branches_accept_the_same_move() {
        let oracle = ShakmatyOracle::new();
        let mut tree = new_tree(&oracle);
        let d4 = play(&oracle, &mut tree, NodeId::ROOT, "d4");
        let d5 = play(&oracle, &mut tree, d4, "d5");
        let nf6 = play(&oracle, &mut tree, d4, "Nf6");

        let resolved = resolve(&oracle, &tree, &token(2, Side::White, "c4"));
        let parents: Vec<NodeId> = resolved.candidates.iter().map(|c| c.parent).collect();
        assert_eq!(parents, vec![d5, nf6]);
        assert!(resolved.revisits.is_empty());
    }

    #[test]
    fn test_existing_child_is_reported_as_revisit() {
        let oracle = ShakmatyOracle::new();
        let mut tree = new_tree(&oracle);
        let e4 = play(&oracle, &mut tree, NodeId::ROOT, "e4");

        let resolved = resolve(&oracle, &tree, &token(1, Side::White, "e4"));
        assert!(resolved.candidates.is_empty());
        assert_eq!(
            resolved.revisits,
            vec![Revisit {
                parent: NodeId::ROOT,
                child: e4
            }]
        );
    }

    #[test]
    fn test_illegal_everywhere_gives_empty_set() {
        let oracle = ShakmatyOracle::new();
        let mut tree = new_tree(&oracle);
        play(&oracle, &mut tree, NodeId::ROOT, "e4");

        assert!(resolve(&oracle, &tree, &token(1, Side::Black, "Ke7")).is_empty());
        // Right SAN, wrong move number.
        assert!(resolve(&oracle, &tree, &token(2, Side::Black, "e5")).is_empty());
    }
}
