use rand::Rng;
use std::fmt;

use crate::engine::{Board, EngineError, Move};

/// Authoritative state of one game: a single board, live while a legal
/// move remains.
///
/// The game does not know how to play itself; a driver picks moves and
/// commits them through [`Game::play_move`].
pub struct Game {
    board: Board,
}

impl Game {
    /// Start a fresh game: an empty board with two spawned tiles.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Result<Self, EngineError> {
        let board = Board::EMPTY.spawn_tiles(2, rng)?;
        Ok(Game { board })
    }

    /// The current board value.
    #[inline]
    pub fn board(&self) -> Board {
        self.board
    }

    /// Commit one turn: merge in `dir`, then spawn one tile.
    ///
    /// Guard clause: if the merge changes nothing, the game state is left
    /// untouched and `Ok(false)` is returned.
    pub fn play_move<R: Rng + ?Sized>(
        &mut self,
        dir: Move,
        rng: &mut R,
    ) -> Result<bool, EngineError> {
        let merged = self.board.merge(dir);
        if merged == self.board {
            return Ok(false);
        }
        self.board = merged.spawn_tiles(1, rng)?;
        Ok(true)
    }

    /// True when no move in any direction changes the board.
    #[inline]
    pub fn is_over(&self) -> bool {
        self.board.is_terminal()
    }

    /// The highest tile value reached so far.
    #[inline]
    pub fn highest_tile(&self) -> u32 {
        self.board.highest_tile()
    }

    /// The standard 2048 score of the current board.
    #[inline]
    pub fn score(&self) -> u64 {
        self.board.score()
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.board.fmt(f)
    }
}
