use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;

use snake_2048::engine::{Board, Move};
use snake_2048::expectimax::{Expectimax, ExpectimaxParallel, SearchConfig, DEFAULT_DEPTH};
use snake_2048::game::Game;

#[derive(Debug, Parser)]
#[command(
    name = "snake-2048",
    about = "Plays 2048 by itself with snake-heuristic expectimax search"
)]
struct Args {
    /// Search depth (expectimax layers per ranking)
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    depth: u32,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Use the rayon-parallel searcher
    #[arg(long)]
    parallel: bool,

    /// Suppress per-turn board rendering; show a status line instead
    #[arg(long)]
    quiet: bool,

    /// Stop after this many moves
    #[arg(long)]
    steps: Option<u64>,
}

enum Policy {
    Seq(Expectimax),
    Par(ExpectimaxParallel),
}

impl Policy {
    fn best_move(&mut self, board: Board) -> Option<Move> {
        match self {
            Policy::Seq(ai) => ai.best_move(board),
            Policy::Par(ai) => ai.best_move(board),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let cfg = SearchConfig {
        depth: args.depth,
        ..SearchConfig::default()
    };
    let mut policy = if args.parallel {
        Policy::Par(ExpectimaxParallel::with_config(cfg))
    } else {
        Policy::Seq(Expectimax::with_config(cfg))
    };

    let pb = if args.quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let mut game = Game::new(&mut rng)?;
    let start = Instant::now();
    let mut move_count: u64 = 0;

    while !game.is_over() {
        if !args.quiet {
            println!("{}\n", game);
        }
        let Some(dir) = policy.best_move(game.board()) else {
            break;
        };
        game.play_move(dir, &mut rng)?;
        move_count += 1;
        if let Some(pb) = &pb {
            if move_count % 25 == 0 {
                let rate = move_count as f64 / start.elapsed().as_secs_f64().max(1e-6);
                pb.set_message(format!(
                    "moves: {} | moves/sec: {:.1} | score: {}",
                    move_count,
                    rate,
                    game.score()
                ));
            }
        }
        if args.steps.is_some_and(|limit| move_count >= limit) {
            break;
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let elapsed = start.elapsed().as_secs_f64().max(1e-6);
    if game.is_over() {
        println!("game over: best tile was {}", game.highest_tile());
    }
    println!("{}", game);
    println!(
        "moves: {} | score: {} | highest tile: {} | moves/sec: {:.1}",
        move_count,
        game.score(),
        game.highest_tile(),
        move_count as f64 / elapsed
    );
    if let Policy::Seq(ai) = &policy {
        println!(
            "states considered: {} (peak for a single move)",
            ai.last_stats().peak_nodes
        );
    }
    Ok(())
}
