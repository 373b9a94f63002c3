//! Expectimax move search over the board engine.
//!
//! Two policy implementations share one configuration and one static
//! evaluation:
//! - [`Expectimax`]: single-threaded search with node-count stats.
//! - [`ExpectimaxParallel`]: rayon-based search fanning out across the
//!   top-level moves and, above size thresholds, inside the tree.
//!
//! The search alternates a maximizing player layer with a chance layer
//! that averages over every empty-cell spawn (2 with probability 0.9,
//! 4 with probability 0.1). Dead ends evaluate to negative infinity, so a
//! path that still has moves always beats one that does not.
//!
//! Quick start
//! ```
//! use snake_2048::engine::Board;
//! use snake_2048::expectimax::Expectimax;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let board = Board::EMPTY.spawn_tiles(2, &mut rng).unwrap();
//! let mut ai = Expectimax::new();
//! assert!(ai.best_move(board).is_some());
//! ```

use crate::engine::{self, Move};

mod heuristic;
mod search_par;
mod search_seq;

pub use heuristic::evaluate;
pub use search_par::ExpectimaxParallel;
pub use search_seq::Expectimax;

/// Default search depth. A tunable latency/foresight trade-off, not a
/// correctness-critical value; 4 and 5 are both reasonable.
pub const DEFAULT_DEPTH: u32 = 4;

/// Knobs for both search variants.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Search depth for `rank_moves` (layers, decremented at every level).
    pub depth: u32,
    /// Enable per-ranking memoization of chance-node values.
    pub cache_enabled: bool,
    /// Thresholds used only by the parallel implementation.
    pub par_thresholds: ParThresholds,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            cache_enabled: true,
            par_thresholds: ParThresholds::default(),
        }
    }
}

/// Minimum sizes at which the parallel variant actually fans out; below
/// them the rayon overhead outweighs the subtree.
#[derive(Debug, Clone, Copy)]
pub struct ParThresholds {
    pub max_par_depth: u32,
    pub par_depth: u32,
    pub par_slots: usize,
    pub cache_min_depth: u32,
}

impl Default for ParThresholds {
    fn default() -> Self {
        Self {
            max_par_depth: 4,
            par_depth: 4,
            par_slots: 6,
            cache_min_depth: 3,
        }
    }
}

/// One ranked move: the expected value of taking `dir` from the root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEval {
    pub dir: Move,
    pub ev: f64,
}

/// Node counters from the most recent ranking (sequential engine only).
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchStats {
    pub nodes: u64,
    pub peak_nodes: u64,
}

/// Pick the first maximum of a ranking, matching the enumeration order of
/// `Board::legal_moves`.
fn arg_max(ranked: &[MoveEval]) -> Option<Move> {
    let mut best: Option<MoveEval> = None;
    for &eval in ranked {
        if best.map_or(true, |b| eval.ev > b.ev) {
            best = Some(eval);
        }
    }
    best.map(|b| b.dir)
}

/// Common helper for constructors to build lookup tables up front.
fn warm_engine_and_heuristics() {
    engine::warm();
    heuristic::warm();
}
