//! Parent selection when more than one node accepts a move.
//!
//! The policy runs in a fixed order and stops at the first stage that leaves
//! a single candidate:
//!
//! 1. a variation cue in the prose just before the move, pointing away from
//!    the current node;
//! 2. the current node, if it is a candidate;
//! 3. lookahead: how many upcoming move tokens play on legally from each
//!    candidate;
//! 4. configured tie-break criteria, then the lowest node id.
//!
//! Everything here is read-only; the tree is never touched.

use tracing::debug;

use crate::config::TieBreak;
use crate::oracle::PositionOracle;
use crate::resolver::Candidate;
use crate::token::Token;
use crate::tree::{GameTree, NodeId, Resolution};

/// A cue phrase seen recently enough to count for the current move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCue {
    /// First node created after the cue text, if any yet.
    pub branch: Option<NodeId>,
}

/// Read-only view of parser state handed to the disambiguator.
pub struct Context<'a, P> {
    pub tree: &'a GameTree<P>,
    pub current: NodeId,
    pub cue: Option<ActiveCue>,
    /// Tokens after the one being resolved.
    pub upcoming: &'a [Token],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Index into the candidate slice.
    pub index: usize,
    pub resolution: Resolution,
}

pub struct Disambiguator<'a, O> {
    oracle: &'a O,
    lookahead_window: usize,
    tie_break: &'a [TieBreak],
}

impl<'a, O: PositionOracle> Disambiguator<'a, O> {
    pub fn new(oracle: &'a O, lookahead_window: usize, tie_break: &'a [TieBreak]) -> Self {
        Self {
            oracle,
            lookahead_window,
            tie_break,
        }
    }

    pub fn choose(
        &self,
        ctx: &Context<'_, O::Position>,
        candidates: &[Candidate<O::Position>],
    ) -> Option<Decision> {
        match candidates.len() {
            0 => return None,
            1 => {
                return Some(Decision {
                    index: 0,
                    resolution: Resolution::Unique,
                })
            }
            _ => {}
        }

        let mut pool: Vec<usize> = (0..candidates.len()).collect();

        if let Some(cue) = ctx.cue {
            let consistent: Vec<usize> = pool
                .iter()
                .copied()
                .filter(|&i| opens_cued_branch(ctx, cue, candidates[i].parent))
                .collect();
            match consistent.len() {
                0 => {}
                1 => {
                    return Some(Decision {
                        index: consistent[0],
                        resolution: Resolution::VariationCue,
                    })
                }
                _ => pool = consistent,
            }
        }

        if let Some(&index) = pool.iter().find(|&&i| candidates[i].parent == ctx.current) {
            return Some(Decision {
                index,
                resolution: Resolution::CurrentBranch,
            });
        }

        let scores: Vec<(usize, usize)> = pool
            .iter()
            .map(|&i| (i, self.lookahead_score(&candidates[i].applied.position, ctx.upcoming)))
            .collect();
        let best = scores.iter().map(|&(_, s)| s).max().unwrap_or(0);
        pool = scores
            .into_iter()
            .filter(|&(_, s)| s == best)
            .map(|(i, _)| i)
            .collect();
        debug!(best, tied = pool.len(), "Lookahead scored candidates");

        if pool.len() == 1 {
            return Some(Decision {
                index: pool[0],
                resolution: Resolution::Lookahead { score: best },
            });
        }

        for criterion in self.tie_break {
            pool = narrow(ctx.tree, candidates, &pool, *criterion);
            if pool.len() == 1 {
                return Some(Decision {
                    index: pool[0],
                    resolution: Resolution::TieBreak,
                });
            }
        }

        pool.into_iter()
            .min_by_key(|&i| candidates[i].parent)
            .map(|index| Decision {
                index,
                resolution: Resolution::Arbitrary,
            })
    }

    /// Count of upcoming move tokens that play on in sequence from `start`.
    pub fn lookahead_score(&self, start: &O::Position, upcoming: &[Token]) -> usize {
        let mut position = start.clone();
        let mut score = 0;

        for token in upcoming
            .iter()
            .filter_map(Token::as_move)
            .take(self.lookahead_window)
        {
            let expected = (
                self.oracle.fullmove_number_of(&position),
                self.oracle.turn_of(&position),
            );
            if expected != (token.move_number, token.marker) {
                break;
            }
            match self.oracle.apply(&position, &token.san_text) {
                Ok(applied) => {
                    position = applied.position;
                    score += 1;
                }
                Err(_) => break,
            }
        }

        score
    }
}

/// A candidate fits a cue when it is not where the text already is and it
/// either sits inside the branch the cue opened or would open a new branch.
fn opens_cued_branch<P>(ctx: &Context<'_, P>, cue: ActiveCue, parent: NodeId) -> bool {
    if parent == ctx.current {
        return false;
    }
    match cue.branch {
        Some(branch) => ctx.tree.is_within(parent, branch),
        None => ctx
            .tree
            .get(parent)
            .is_some_and(|node| !node.children.is_empty()),
    }
}

fn narrow<P>(
    tree: &GameTree<P>,
    candidates: &[Candidate<P>],
    pool: &[usize],
    criterion: TieBreak,
) -> Vec<usize> {
    match criterion {
        TieBreak::MainLine => {
            let main: Vec<usize> = pool
                .iter()
                .copied()
                .filter(|&i| {
                    tree.get(candidates[i].parent)
                        .is_some_and(|node| node.is_main_line)
                })
                .collect();
            if main.is_empty() {
                pool.to_vec()
            } else {
                main
            }
        }
        TieBreak::MostRecent => pool
            .iter()
            .copied()
            .max_by_key(|&i| candidates[i].parent)
            .into_iter()
            .collect(),
    }
}
