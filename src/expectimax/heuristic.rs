use std::sync::OnceLock;

use crate::engine::{self, Board};

// Per-column positional tables: SNAKE_TABLES[col][line] is the weighted sum
// of one column's tile values along the snake path. The corner penalty is
// the only part of the evaluation that is not column-separable.
static SNAKE_TABLES: OnceLock<[Box<[f64]>; 4]> = OnceLock::new();

pub(crate) fn warm() {
    let _ = snake_tables();
}

fn snake_tables() -> &'static [Box<[f64]>; 4] {
    SNAKE_TABLES.get_or_init(|| {
        std::array::from_fn(|col| {
            let mut table = vec![0.0f64; 0x1_0000];
            for (line, slot) in table.iter_mut().enumerate() {
                *slot = column_score(col, line as u64);
            }
            table.into_boxed_slice()
        })
    })
}

/// Static heuristic value of a board.
///
/// Negative infinity when no move exists. Otherwise the board is scored
/// along the snake path — the boustrophedon walk that visits column 0
/// bottom-to-top, column 1 top-to-bottom, and so on — as
/// `sum(value_n / 10^n)`, so large tiles are worth most near the start of
/// the path, minus a squared penalty when the bottom-left corner does not
/// hold the largest tile on the board.
pub fn evaluate(board: Board) -> f64 {
    if board.is_terminal() {
        return f64::NEG_INFINITY;
    }
    let transposed = engine::transpose(board.raw());
    let tables = snake_tables();
    let mut positional = 0.0;
    for (col, table) in tables.iter().enumerate() {
        let line = engine::extract_line(transposed, col as u64);
        positional += table[line as usize];
    }
    positional - corner_penalty(board)
}

fn column_score(col: usize, line: u64) -> f64 {
    let tiles = engine::line_to_tiles(line);
    let mut score = 0.0;
    for (row, &exp) in tiles.iter().enumerate() {
        if exp == 0 {
            continue;
        }
        let value = (1u64 << exp) as f64;
        score += value / 10f64.powi(snake_position(row, col) as i32);
    }
    score
}

// Even columns are read bottom-to-top, odd columns top-to-bottom.
fn snake_position(row: usize, col: usize) -> usize {
    if col % 2 == 0 {
        4 * col + (3 - row)
    } else {
        4 * col + row
    }
}

fn corner_penalty(board: Board) -> f64 {
    // row 3, column 0
    let corner = board.tile_value(12) as f64;
    let max = board.highest_tile() as f64;
    if corner == max {
        0.0
    } else {
        (corner - max) * (corner - max)
    }
}
