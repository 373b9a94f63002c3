use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use snake_2048::engine::{self, Board, Move};
use std::hint::black_box;

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(1337);
    let mut boards = Vec::new();
    boards.push(Board::EMPTY);
    let mut b = Board::EMPTY.spawn_tiles(2, &mut rng).unwrap();
    boards.push(b);
    for &dir in Move::ALL.iter().cycle().take(64) {
        let next = b.merge(dir);
        if next != b {
            b = next.spawn_tiles(1, &mut rng).unwrap();
            boards.push(b);
        }
    }
    boards
}

fn bench_engine_ops(c: &mut Criterion) {
    engine::warm();
    let boards = corpus();

    c.bench_function("engine/merge_all_dirs", |bch| {
        bch.iter(|| {
            let mut acc = 0u64;
            for &b in &boards {
                for dir in Move::ALL {
                    acc ^= b.merge(dir).raw();
                }
            }
            black_box(acc)
        })
    });

    c.bench_function("engine/legal_moves", |bch| {
        bch.iter(|| {
            let mut acc = 0usize;
            for &b in &boards {
                acc += b.legal_moves().len();
            }
            black_box(acc)
        })
    });

    c.bench_function("engine/is_terminal", |bch| {
        bch.iter(|| {
            let mut acc = 0u32;
            for &b in &boards {
                acc += b.is_terminal() as u32;
            }
            black_box(acc)
        })
    });

    c.bench_function("engine/spawn_tiles", |bch| {
        let mut rng = StdRng::seed_from_u64(42);
        let open: Vec<Board> = boards.iter().copied().filter(|b| b.count_empty() > 0).collect();
        bch.iter(|| {
            let mut acc = 0u64;
            for &b in &open {
                acc ^= b.spawn_tiles(1, &mut rng).unwrap().raw();
            }
            black_box(acc)
        })
    });
}

criterion_group!(engine_ops, bench_engine_ops);
criterion_main!(engine_ops);
