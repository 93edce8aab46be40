use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::Args;
use log::*;
use rand_mt::Mt64;

use crate::{
    engine::deck::Deck,
    players::{eval::Evaluator, mcts::MctsPlayer, random::RandomPlayer, Player},
    runner,
};

const CSV_HEADER: &str = "name,n,determinizations,trajectories,games_won,cards_cleared,points";

const EVALUATORS: [Evaluator; 5] = [
    Evaluator::Binary,
    Evaluator::Linear,
    Evaluator::Score,
    Evaluator::ScoreLog,
    Evaluator::ScoreSigmoid,
];

#[derive(Args)]
pub struct BenchArgs {
    /// How many games to play per configuration.
    #[clap(long, short = 'n', value_parser, default_value_t = 20)]
    games: usize,

    #[clap(long, short = 'd', value_parser, default_value_t = 10)]
    determinizations: usize,

    #[clap(long, short = 't', value_parser, default_value_t = 3500)]
    trajectories: usize,

    #[clap(long, short = 'w', value_parser, default_value_t = 1)]
    workers: usize,

    #[clap(long, short = 's', value_parser, default_value_t = 0x42)]
    seed: u64,

    /// Where to write the CSV report.
    #[clap(long, short = 'o', value_parser, default_value = "bench.csv")]
    output: PathBuf,
}

struct BenchRow {
    name: String,
    n: usize,
    determinizations: usize,
    trajectories: usize,
    games_won: u32,
    cards_cleared: i64,
    points: i64,
}

impl BenchRow {
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.name,
            self.n,
            self.determinizations,
            self.trajectories,
            self.games_won,
            self.cards_cleared,
            self.points
        )
    }
}

/// Sweeps every reward function (plus a random baseline) over freshly
/// dealt games and writes one CSV row per configuration.
pub fn run_bench(args: BenchArgs) {
    let mut rng = Mt64::new(args.seed);
    let mut rows: Vec<BenchRow> = vec![];

    let mut random = RandomPlayer::new(rng.next_u64());
    rows.push(play_games(&mut random, "random", 0, 0, args.games, &mut rng));

    for eval in EVALUATORS {
        let mut player = MctsPlayer::new(
            rng.next_u64(),
            args.workers,
            args.determinizations,
            args.trajectories,
            eval,
        );
        rows.push(play_games(
            &mut player,
            eval.name(),
            args.determinizations,
            args.trajectories,
            args.games,
            &mut rng,
        ));
    }

    write_csv(&args.output, &rows);
    info!("Wrote {} rows to {:?}", rows.len(), args.output);
}

fn play_games(
    player: &mut dyn Player,
    name: &str,
    determinizations: usize,
    trajectories: usize,
    games: usize,
    rng: &mut Mt64,
) -> BenchRow {
    let mut row = BenchRow {
        name: name.to_string(),
        n: games,
        determinizations,
        trajectories,
        games_won: 0,
        cards_cleared: 0,
        points: 0,
    };
    for game in 0..games {
        let mut stock = Deck::new();
        stock.shuffle(rng);
        let result = runner::run(player, stock);
        if result.won {
            row.games_won += 1;
        }
        row.cards_cleared += i64::from(result.cards_cleared);
        row.points += i64::from(result.score);
        info!(
            "{}: game #{} cleared {} cards with {} points",
            name, game, result.cards_cleared, result.score
        );
    }
    row
}

fn write_csv(path: &Path, rows: &[BenchRow]) {
    let file =
        File::create(path).unwrap_or_else(|e| panic!("Failed to create {:?}: {}", path, e));
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", CSV_HEADER).unwrap();
    for row in rows {
        writeln!(writer, "{}", row.to_csv()).unwrap();
    }
}
