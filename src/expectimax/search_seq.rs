use std::collections::HashMap;

use crate::engine::{Board, Move};

use super::heuristic::evaluate;
use super::{arg_max, warm_engine_and_heuristics, MoveEval, SearchConfig, SearchStats};

enum Node {
    Max,
    Chance,
}

#[derive(Clone, Copy)]
struct TranspositionEntry {
    score: f64,
    depth: u32,
}

/// Single-threaded expectimax search.
///
/// The constructor warms the engine and heuristic tables. Each ranking
/// gets a fresh transposition map; entries are reused only on an exact
/// depth match, so cached values are identical to recomputation.
pub struct Expectimax {
    cfg: SearchConfig,
    stats: SearchStats,
}

impl Expectimax {
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(cfg: SearchConfig) -> Self {
        warm_engine_and_heuristics();
        Self {
            cfg,
            stats: SearchStats::default(),
        }
    }

    /// The move with the highest expected value, or `None` when no legal
    /// move exists. The first maximum in enumeration order wins.
    pub fn best_move(&mut self, board: Board) -> Option<Move> {
        arg_max(&self.rank_moves(board))
    }

    /// Score every legal move of `board`, in `legal_moves` order.
    ///
    /// Each move's resulting board is searched in chance mode at the
    /// configured depth, since the spawn happens before the player moves
    /// again.
    ///
    /// ```
    /// use snake_2048::engine::Board;
    /// use snake_2048::expectimax::Expectimax;
    ///
    /// let board = Board::from_grid([[0; 4], [0; 4], [0, 2, 0, 0], [0, 2, 0, 0]]).unwrap();
    /// let mut ai = Expectimax::new();
    /// let ranked = ai.rank_moves(board);
    /// assert_eq!(ranked.len(), board.legal_moves().len());
    /// ```
    pub fn rank_moves(&mut self, board: Board) -> Vec<MoveEval> {
        let depth = self.cfg.depth;
        let mut map: HashMap<Board, TranspositionEntry> = HashMap::new();
        let mut node_count = 0u64;
        let ranked = board
            .legal_moves()
            .into_iter()
            .map(|(dir, child)| MoveEval {
                dir,
                ev: self.search(child, Node::Chance, depth, &mut map, &mut node_count),
            })
            .collect();
        self.record(node_count);
        ranked
    }

    /// Direct access to the expectimax recursion: the value of `board`
    /// searched to `depth` starting from a player or chance layer.
    pub fn search_value(&mut self, board: Board, depth: u32, is_player_turn: bool) -> f64 {
        let node = if is_player_turn { Node::Max } else { Node::Chance };
        let mut map: HashMap<Board, TranspositionEntry> = HashMap::new();
        let mut node_count = 0u64;
        let value = self.search(board, node, depth, &mut map, &mut node_count);
        self.record(node_count);
        value
    }

    /// Counters from the last ranking.
    #[inline]
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) {
        self.stats = SearchStats::default();
    }

    fn record(&mut self, node_count: u64) {
        self.stats.nodes = node_count;
        self.stats.peak_nodes = self.stats.peak_nodes.max(node_count);
    }

    fn search(
        &self,
        board: Board,
        node: Node,
        depth: u32,
        map: &mut HashMap<Board, TranspositionEntry>,
        node_count: &mut u64,
    ) -> f64 {
        *node_count += 1;
        match node {
            Node::Max => {
                if depth == 0 || board.is_terminal() {
                    return evaluate(board);
                }
                self.max_value(board, depth, map, node_count)
            }
            Node::Chance => {
                if depth == 0 {
                    return evaluate(board);
                }
                self.chance_value(board, depth, map, node_count)
            }
        }
    }

    // Player layer: the static evaluation is a floor, so a move that leads
    // nowhere good never looks better than standing pat on the heuristic.
    fn max_value(
        &self,
        board: Board,
        depth: u32,
        map: &mut HashMap<Board, TranspositionEntry>,
        node_count: &mut u64,
    ) -> f64 {
        let mut alpha = evaluate(board);
        for dir in Move::ALL {
            let child = board.merge(dir);
            if child != board {
                alpha = alpha.max(self.search(child, Node::Chance, depth - 1, map, node_count));
            }
        }
        alpha
    }

    // Chance layer: average over every empty cell receiving a 2 (p = 0.9)
    // or a 4 (p = 0.1). A full board contributes nothing.
    fn chance_value(
        &self,
        board: Board,
        depth: u32,
        map: &mut HashMap<Board, TranspositionEntry>,
        node_count: &mut u64,
    ) -> f64 {
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
        let weight = num_empty as f64;
        let mut score = 0.0;
        let mut remaining = num_empty;
        let mut tmp = board.raw();
        let mut slot: u64 = 1;
        while remaining > 0 {
            if tmp & 0xf == 0 {
                let with_two = Board::from_raw(board.raw() | slot);
                let with_four = Board::from_raw(board.raw() | (slot << 1));
                score += 0.9 * self.search(with_two, Node::Max, depth - 1, map, node_count) / weight
                    + 0.1 * self.search(with_four, Node::Max, depth - 1, map, node_count) / weight;
                remaining -= 1;
            }
            tmp >>= 4;
            slot <<= 4;
        }
        if self.cfg.cache_enabled {
            map.insert(board, TranspositionEntry { score, depth });
        }
        score
    }
}

impl Default for Expectimax {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectimax::evaluate;

    fn board(grid: [[u32; 4]; 4]) -> Board {
        Board::from_grid(grid).unwrap()
    }

    fn shallow() -> Expectimax {
        Expectimax::with_config(SearchConfig {
            depth: 1,
            ..SearchConfig::default()
        })
    }

    #[test]
    fn depth_zero_is_the_static_evaluation() {
        let boards = [
            board([[0, 2, 4, 4], [0, 2, 4, 8], [0, 0, 0, 4], [2, 2, 2, 2]]),
            board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]),
            Board::EMPTY,
        ];
        let mut ai = Expectimax::new();
        for b in boards {
            assert_eq!(ai.search_value(b, 0, true), evaluate(b));
            assert_eq!(ai.search_value(b, 0, false), evaluate(b));
        }
    }

    #[test]
    fn chance_layer_weights_single_empty_cell() {
        let b = board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 2, 0]]);
        assert_eq!(b.count_empty(), 1);
        let with_two = board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 2, 2]]);
        let with_four = board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 2, 4]]);
        let mut ai = Expectimax::new();
        let expected = 0.9 * evaluate(with_two) + 0.1 * evaluate(with_four);
        assert_eq!(ai.search_value(b, 1, false), expected);
    }

    #[test]
    fn player_layer_maximizes_over_legal_children_with_floor() {
        let b = board([[0, 2, 4, 4], [0, 2, 4, 8], [0, 0, 0, 4], [2, 2, 2, 2]]);
        let mut expected = evaluate(b);
        for (_, child) in b.legal_moves() {
            // at depth 1 the chance children bottom out immediately
            expected = expected.max(evaluate(child));
        }
        let mut ai = Expectimax::new();
        assert_eq!(ai.search_value(b, 1, true), expected);
    }

    #[test]
    fn terminal_player_node_is_negative_infinity() {
        let dead = board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut ai = Expectimax::new();
        assert_eq!(ai.search_value(dead, 3, true), f64::NEG_INFINITY);
        assert!(ai.best_move(dead).is_none());
        assert!(ai.rank_moves(dead).is_empty());
    }

    #[test]
    fn ranking_follows_move_enumeration_order() {
        let b = board([[0, 2, 4, 4], [0, 2, 4, 8], [0, 0, 0, 4], [2, 2, 2, 2]]);
        let mut ai = shallow();
        let ranked = ai.rank_moves(b);
        let dirs: Vec<Move> = ranked.iter().map(|e| e.dir).collect();
        let legal: Vec<Move> = b.legal_moves().iter().map(|&(d, _)| d).collect();
        assert_eq!(dirs, legal);
        assert!(ai.last_stats().nodes > 0);
    }

    #[test]
    fn merging_into_the_corner_wins() {
        // down stacks a 4 onto the bottom-left corner; every alternative
        // strands the maximum away from it
        let b = board([[0; 4], [0; 4], [2, 0, 0, 0], [2, 0, 0, 0]]);
        let mut ai = shallow();
        assert_eq!(ai.best_move(b), Some(Move::Down));
    }

    #[test]
    fn cache_is_transparent() {
        let b = board([[0, 2, 4, 4], [0, 2, 4, 8], [2, 16, 8, 4], [2, 32, 64, 2]]);
        let mut cached = Expectimax::new();
        let mut uncached = Expectimax::with_config(SearchConfig {
            cache_enabled: false,
            ..SearchConfig::default()
        });
        assert_eq!(cached.rank_moves(b), uncached.rank_moves(b));
    }
}
