//! snake-2048: a 2048 board engine + expectimax autoplayer.
//!
//! This crate provides:
//! - A compact [`engine::Board`] type: pure value transitions for merging,
//!   spawning and terminal detection over a packed 4x4 grid
//! - A snake-heuristic expectimax policy ([`expectimax`] module) with
//!   single-threaded and rayon-parallel variants
//! - A [`game::Game`] wrapper holding the authoritative board for a run
//!
//! Randomness only ever enters through an injected [`rand::Rng`], so a
//! seeded `StdRng` makes every operation reproducible.
//!
//! Quick start:
//! ```
//! use snake_2048::engine::Board;
//! use snake_2048::expectimax::Expectimax;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let board = Board::EMPTY.spawn_tiles(2, &mut rng).unwrap();
//! let mut ai = Expectimax::new();
//! let ranked = ai.rank_moves(board);
//! assert!(!ranked.is_empty());
//! ```

pub mod engine;
pub mod expectimax;
pub mod game;
