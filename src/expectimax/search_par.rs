use ahash::RandomState as AHasher;
use dashmap::DashMap;
use rayon::prelude::*;

use crate::engine::{Board, Move};

use super::heuristic::evaluate;
use super::{arg_max, warm_engine_and_heuristics, MoveEval, ParThresholds, SearchConfig};

#[derive(Clone, Copy)]
enum Node {
    Max,
    Chance,
}

#[derive(Clone, Copy)]
struct TranspositionEntry {
    score: f64,
    depth: u32,
}

/// Parallel expectimax using rayon and a shared `DashMap` transposition
/// table.
///
/// The tree has no ordering dependency between sibling subtrees (the
/// chance layer is a commutative sum, the player layer an associative
/// max), so the top-level moves always fan out and deeper layers fan out
/// above the configured thresholds. Values agree with [`Expectimax`] up to
/// floating-point summation order.
///
/// [`Expectimax`]: super::Expectimax
pub struct ExpectimaxParallel {
    cfg: SearchConfig,
}

impl ExpectimaxParallel {
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(cfg: SearchConfig) -> Self {
        warm_engine_and_heuristics();
        Self { cfg }
    }

    /// The move with the highest expected value, or `None` when no legal
    /// move exists.
    pub fn best_move(&self, board: Board) -> Option<Move> {
        arg_max(&self.rank_moves(board))
    }

    /// Score every legal move of `board` in `legal_moves` order, searching
    /// the top-level children in parallel.
    pub fn rank_moves(&self, board: Board) -> Vec<MoveEval> {
        let depth = self.cfg.depth;
        let map: DashMap<Board, TranspositionEntry, AHasher> = DashMap::with_hasher(AHasher::new());
        board
            .legal_moves()
            .into_par_iter()
            .map(|(dir, child)| MoveEval {
                dir,
                ev: self.search(child, Node::Chance, depth, &map),
            })
            .collect()
    }

    fn search(
        &self,
        board: Board,
        node: Node,
        depth: u32,
        map: &DashMap<Board, TranspositionEntry, AHasher>,
    ) -> f64 {
        match node {
            Node::Max => {
                if depth == 0 || board.is_terminal() {
                    return evaluate(board);
                }
                self.max_value(board, depth, map)
            }
            Node::Chance => {
                if depth == 0 {
                    return evaluate(board);
                }
                self.chance_value(board, depth, map)
            }
        }
    }

    fn max_value(&self, board: Board, depth: u32, map: &DashMap<Board, TranspositionEntry, AHasher>) -> f64 {
        let floor = evaluate(board);
        let ParThresholds { max_par_depth, .. } = self.cfg.par_thresholds;
        if depth >= max_par_depth {
            Move::ALL
                .par_iter()
                .map(|&dir| {
                    let child = board.merge(dir);
                    if child == board {
                        f64::NEG_INFINITY
                    } else {
                        self.search(child, Node::Chance, depth - 1, map)
                    }
                })
                .reduce(|| floor, f64::max)
        } else {
            Move::ALL.iter().fold(floor, |alpha, &dir| {
                let child = board.merge(dir);
                if child == board {
                    alpha
                } else {
                    alpha.max(self.search(child, Node::Chance, depth - 1, map))
                }
            })
        }
    }

    fn chance_value(&self, board: Board, depth: u32, map: &DashMap<Board, TranspositionEntry, AHasher>) -> f64 {
        let num_empty = board.count_empty();
        if num_empty == 0 {
            return 0.0;
        }
        if self.cfg.cache_enabled {
            if let Some(entry) = map.get(&board) {
                if entry.depth == depth {
                    return entry.score;
                }
            }
        }
        let mut slots = Vec::with_capacity(num_empty as usize);
        let mut tmp = board.raw();
        let mut slot: u64 = 1;
        while slots.len() < num_empty as usize {
            if tmp & 0xf == 0 {
                slots.push(slot);
            }
            tmp >>= 4;
            slot <<= 4;
        }
        let weight = num_empty as f64;
        let spawn_value = |slot: u64| {
            let with_two = Board::from_raw(board.raw() | slot);
            let with_four = Board::from_raw(board.raw() | (slot << 1));
            0.9 * self.search(with_two, Node::Max, depth - 1, map) / weight
                + 0.1 * self.search(with_four, Node::Max, depth - 1, map) / weight
        };
        let ParThresholds {
            par_depth,
            par_slots,
            cache_min_depth,
            ..
        } = self.cfg.par_thresholds;
        let score: f64 = if depth >= par_depth && slots.len() >= par_slots {
            slots.par_iter().map(|&s| spawn_value(s)).sum()
        } else {
            slots.iter().map(|&s| spawn_value(s)).sum()
        };
        if self.cfg.cache_enabled && depth >= cache_min_depth {
            map.insert(board, TranspositionEntry { score, depth });
        }
        score
    }
}

impl Default for ExpectimaxParallel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectimax::Expectimax;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // Deterministic corpus: grow boards by cycling moves and spawning with
    // a seeded RNG.
    fn corpus() -> Vec<Board> {
        let mut rng = StdRng::seed_from_u64(1337);
        let mut boards = Vec::new();
        let mut b = Board::EMPTY.spawn_tiles(2, &mut rng).unwrap();
        boards.push(b);
        for &dir in Move::ALL.iter().cycle().take(48) {
            let next = b.merge(dir);
            if next != b {
                b = next.spawn_tiles(1, &mut rng).unwrap();
                boards.push(b);
            }
        }
        boards
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        if a == b {
            return true;
        }
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn agrees_with_sequential() {
        // thresholds low enough that the parallel paths actually run
        let cfg = SearchConfig {
            depth: 3,
            cache_enabled: true,
            par_thresholds: ParThresholds {
                max_par_depth: 1,
                par_depth: 1,
                par_slots: 2,
                cache_min_depth: 1,
            },
        };
        let mut seq = Expectimax::with_config(SearchConfig {
            depth: 3,
            ..SearchConfig::default()
        });
        let par = ExpectimaxParallel::with_config(cfg);
        for b in corpus() {
            let expected = seq.rank_moves(b);
            let got = par.rank_moves(b);
            assert_eq!(expected.len(), got.len(), "board {:?}", b);
            for (e, g) in expected.iter().zip(&got) {
                assert_eq!(e.dir, g.dir, "board {:?}", b);
                assert!(approx_eq(e.ev, g.ev), "board {:?}: {} vs {}", b, e.ev, g.ev);
            }
        }
    }

    #[test]
    fn no_legal_move_ranks_empty() {
        let dead =
            Board::from_grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
        let par = ExpectimaxParallel::new();
        assert!(par.rank_moves(dead).is_empty());
        assert!(par.best_move(dead).is_none());
    }
}
