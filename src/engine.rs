use rand::Rng;
use std::fmt;
use std::sync::OnceLock;

/// A direction to slide/merge tiles.
///
/// `ALL` fixes the enumeration order used everywhere moves are listed:
/// left, down, up, right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Left,
    Down,
    Up,
    Right,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Left, Move::Down, Move::Up, Move::Right];
}

/// Precondition violations surfaced by the board engine.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("cannot spawn {requested} tiles with only {empty} empty cells")]
    InvalidSpawnRequest { requested: usize, empty: usize },
    #[error("tile value {0} is not zero or a representable power of two")]
    MalformedBoard(u32),
}

const LINE_TABLE_SIZE: usize = 0x1_0000; // 65,536 possible 16-bit lines

type BoardRaw = u64;
type Line = u64;

/// Packed 4x4 2048 board: 16 4-bit nibbles in a `u64`, row-major from the
/// high nibble. Each nibble holds a tile exponent (0 = empty, `e` = tile
/// `2^e`).
///
/// Every operation is a pure value transition; `Copy` gives the immutable
/// semantics for free.
///
/// ```
/// use snake_2048::engine::{Board, Move};
///
/// let b = Board::from_grid([[0, 2, 2, 4], [0; 4], [0; 4], [0; 4]]).unwrap();
/// assert_eq!(b.merge(Move::Left).to_grid()[0], [4, 4, 0, 0]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board(BoardRaw);

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board(0);

    /// Construct a `Board` from its raw packed representation.
    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self {
        Board(raw)
    }

    /// Borrow the raw packed `u64` for this `Board`.
    #[inline]
    pub fn raw(&self) -> BoardRaw {
        self.0
    }

    /// Build a board from a 4x4 grid of tile values (0 = empty).
    ///
    /// Non-zero values must be powers of two between 2 and 32768; anything
    /// else is a malformed board.
    pub fn from_grid(grid: [[u32; 4]; 4]) -> Result<Self, EngineError> {
        let mut raw: BoardRaw = 0;
        for (row, cells) in grid.iter().enumerate() {
            for (col, &val) in cells.iter().enumerate() {
                let exp = match val {
                    0 => 0,
                    v if v.is_power_of_two() && (1..=15).contains(&v.trailing_zeros()) => {
                        v.trailing_zeros() as u64
                    }
                    v => return Err(EngineError::MalformedBoard(v)),
                };
                raw |= exp << (60 - 4 * (row * 4 + col));
            }
        }
        Ok(Board(raw))
    }

    /// The board as a 4x4 grid of tile values (0 = empty).
    pub fn to_grid(self) -> [[u32; 4]; 4] {
        let mut grid = [[0u32; 4]; 4];
        for (row, cells) in grid.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = self.tile_value(row * 4 + col);
            }
        }
        grid
    }

    /// Tile value at a row-major index in `0..16` (0 for an empty cell).
    #[inline]
    pub fn tile_value(self, idx: usize) -> u32 {
        match self.exponent(idx) {
            0 => 0,
            e => 1 << e,
        }
    }

    /// The highest tile value on the board (0 if the board is empty).
    pub fn highest_tile(self) -> u32 {
        match (0..16).map(|idx| self.exponent(idx)).max().unwrap_or(0) {
            0 => 0,
            e => 1 << e,
        }
    }

    /// Slide and merge tiles in the given direction. Pure and deterministic.
    #[inline]
    pub fn merge(self, dir: Move) -> Self {
        match dir {
            Move::Left | Move::Right => merge_rows(self, dir),
            Move::Up | Move::Down => merge_cols(self, dir),
        }
    }

    /// The directional merges that change the board, paired with their
    /// results, in the fixed order `Move::ALL`.
    pub fn legal_moves(self) -> Vec<(Move, Board)> {
        Move::ALL
            .iter()
            .filter_map(|&dir| {
                let next = self.merge(dir);
                (next != self).then_some((dir, next))
            })
            .collect()
    }

    /// True if some move changes the board: an adjacent equal pair or an
    /// empty cell exists along some row of the board or of its transpose.
    pub fn has_legal_move(self) -> bool {
        let t = transpose(self.0);
        (0..4).any(|idx| {
            line_has_step(extract_line(self.0, idx)) || line_has_step(extract_line(t, idx))
        })
    }

    /// True iff no move in any direction changes the board.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.has_legal_move()
    }

    /// Count the number of empty cells.
    pub fn count_empty(self) -> u32 {
        let mut x = self.0;
        x |= x >> 1;
        x |= x >> 2;
        x &= 0x1111_1111_1111_1111;
        16 - x.count_ones()
    }

    /// Place `count` tiles on distinct empty cells chosen uniformly at
    /// random, each independently 2 with probability 0.9 or 4 with
    /// probability 0.1.
    ///
    /// ```
    /// use snake_2048::engine::Board;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let b = Board::EMPTY.spawn_tiles(2, &mut rng).unwrap();
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    pub fn spawn_tiles<R: Rng + ?Sized>(
        self,
        count: usize,
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        let empty = self.count_empty() as usize;
        if count > empty {
            return Err(EngineError::InvalidSpawnRequest {
                requested: count,
                empty,
            });
        }
        let mut board = self;
        for _ in 0..count {
            board = board.spawn_one(rng);
        }
        Ok(board)
    }

    /// The standard 2048 score reconstructed from tile ranks (counts every
    /// intermediate merge, assuming all spawns were 2s).
    pub fn score(self) -> u64 {
        let score_table = &tables().score;
        (0..4).fold(0, |acc, idx| {
            let line = extract_line(self.0, idx);
            acc + score_table[line as usize]
        })
    }

    // Walks nibbles from the low end, skipping occupied cells, until the
    // chosen empty slot is reached. Caller guarantees an empty cell exists.
    fn spawn_one<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let mut index = rng.gen_range(0..self.count_empty());
        let tile_exp: u64 = if rng.gen_range(0..10) < 9 { 1 } else { 2 };
        let mut tmp = self.0;
        let mut tile = tile_exp;
        loop {
            while (tmp & 0xf) != 0 {
                tmp >>= 4;
                tile <<= 4;
            }
            if index == 0 {
                break;
            }
            index -= 1;
            tmp >>= 4;
            tile <<= 4;
        }
        Board(self.0 | tile)
    }

    #[inline]
    fn exponent(self, idx: usize) -> u8 {
        ((self.0 >> (60 - 4 * idx)) & 0xf) as u8
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x})", self.0)
    }
}

/// Row-major rendering: one line per row, each cell right-aligned to a
/// fixed width of 8, empty cells printed as 0.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grid = self.to_grid();
        for (i, row) in grid.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{:8}{:8}{:8}{:8}", row[0], row[1], row[2], row[3])?;
        }
        Ok(())
    }
}

impl From<BoardRaw> for Board {
    fn from(v: BoardRaw) -> Self {
        Board::from_raw(v)
    }
}
impl From<Board> for BoardRaw {
    fn from(b: Board) -> Self {
        b.raw()
    }
}

struct LineTables {
    merge_left: Box<[u64]>,
    merge_right: Box<[u64]>,
    merge_up: Box<[u64]>,
    merge_down: Box<[u64]>,
    score: Box<[u64]>,
}

static TABLES: OnceLock<LineTables> = OnceLock::new();

/// Force table construction up front (useful before benchmarking). Tables
/// are otherwise built lazily on first use.
pub fn warm() {
    let _ = tables();
}

#[inline]
fn tables() -> &'static LineTables {
    TABLES.get_or_init(build_tables)
}

fn build_tables() -> LineTables {
    // Heap-allocated to avoid large stack frames
    let mut merge_left = vec![0u64; LINE_TABLE_SIZE];
    let mut merge_right = vec![0u64; LINE_TABLE_SIZE];
    let mut merge_up = vec![0u64; LINE_TABLE_SIZE];
    let mut merge_down = vec![0u64; LINE_TABLE_SIZE];
    let mut score = vec![0u64; LINE_TABLE_SIZE];

    for val in 0..LINE_TABLE_SIZE {
        let tiles = line_to_tiles(val as Line);
        let left = merge_line_left(tiles);
        let right = reverse_tiles(merge_line_left(reverse_tiles(tiles)));
        merge_left[val] = tiles_to_row(left);
        merge_right[val] = tiles_to_row(right);
        // A column read top-to-bottom merges toward the top exactly like a
        // row read left-to-right merges toward the left.
        merge_up[val] = tiles_to_col(left);
        merge_down[val] = tiles_to_col(right);
        score[val] = calc_score(&tiles);
    }

    LineTables {
        merge_left: merge_left.into_boxed_slice(),
        merge_right: merge_right.into_boxed_slice(),
        merge_up: merge_up.into_boxed_slice(),
        merge_down: merge_down.into_boxed_slice(),
        score: score.into_boxed_slice(),
    }
}

/// The canonical merge kernel over one line of tile exponents: drop zeros,
/// collapse adjacent equal pairs left to right (a merged cell never merges
/// again, the leftmost element has priority), pad with zeros.
fn merge_line_left(tiles: [u8; 4]) -> [u8; 4] {
    let mut compact = [0u8; 4];
    let mut n = 0;
    for &t in &tiles {
        if t != 0 {
            compact[n] = t;
            n += 1;
        }
    }
    let mut out = [0u8; 4];
    let mut w = 0;
    let mut i = 0;
    while i < n {
        if i + 1 < n && compact[i] == compact[i + 1] {
            out[w] = compact[i] + 1;
            i += 2;
        } else {
            out[w] = compact[i];
            i += 1;
        }
        w += 1;
    }
    out
}

fn reverse_tiles(tiles: [u8; 4]) -> [u8; 4] {
    [tiles[3], tiles[2], tiles[1], tiles[0]]
}

pub(crate) fn line_to_tiles(line: Line) -> [u8; 4] {
    [
        ((line >> 12) & 0xf) as u8,
        ((line >> 8) & 0xf) as u8,
        ((line >> 4) & 0xf) as u8,
        (line & 0xf) as u8,
    ]
}

fn tiles_to_row(tiles: [u8; 4]) -> Line {
    (tiles[0] as u64) << 12 | (tiles[1] as u64) << 8 | (tiles[2] as u64) << 4 | tiles[3] as u64
}

// Spreads a merged column over the four 16-bit row groups; `merge_cols`
// shifts the result into the right column position.
fn tiles_to_col(tiles: [u8; 4]) -> Line {
    (tiles[0] as u64) << 48 | (tiles[1] as u64) << 32 | (tiles[2] as u64) << 16 | tiles[3] as u64
}

fn calc_score(tiles: &[u8; 4]) -> u64 {
    // the score is the total sum of the tile and all intermediate merged tiles
    tiles
        .iter()
        .filter(|&&e| e >= 2)
        .map(|&e| (e as u64 - 1) * (1 << e))
        .sum()
}

fn merge_rows(board: Board, dir: Move) -> Board {
    let t = tables();
    let table = match dir {
        Move::Left => &t.merge_left,
        Move::Right => &t.merge_right,
        _ => unreachable!("merge_rows only handles horizontal moves"),
    };
    let raw = (0..4).fold(0, |acc, row_idx| {
        let line = extract_line(board.0, row_idx);
        acc | (table[line as usize] << (48 - 16 * row_idx))
    });
    Board(raw)
}

fn merge_cols(board: Board, dir: Move) -> Board {
    let transposed = transpose(board.0);
    let t = tables();
    let table = match dir {
        Move::Up => &t.merge_up,
        Move::Down => &t.merge_down,
        _ => unreachable!("merge_cols only handles vertical moves"),
    };
    let raw = (0..4).fold(0, |acc, col_idx| {
        let line = extract_line(transposed, col_idx);
        acc | (table[line as usize] << (12 - 4 * col_idx))
    });
    Board(raw)
}

// Credit to Nneonneo
pub(crate) fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F0_0F0F_F0F0_0F0F;
    let a2 = x & 0x0000_F0F0_0000_F0F0;
    let a3 = x & 0x0F0F_0000_0F0F_0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00_FF00_00FF_00FF;
    let b2 = a & 0x00FF_00FF_0000_0000;
    let b3 = a & 0x0000_0000_FF00_FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

pub(crate) fn extract_line(board: BoardRaw, line_idx: u64) -> Line {
    (board >> ((3 - line_idx) * 16)) & 0xffff
}

// An adjacent pair that is equal, or touches an empty cell, means some
// horizontal move changes this line.
fn line_has_step(line: Line) -> bool {
    (0..3).any(|j| {
        let a = (line >> ((3 - j) * 4)) & 0xf;
        let b = (line >> ((2 - j) * 4)) & 0xf;
        a == b || a == 0 || b == 0
    })
}
