use clap::Args;
use log::*;
use rand_mt::Mt64;

use crate::{
    engine::{deck::Deck, game::TriPeaks},
    players::{
        eval::Evaluator,
        mcts::{self, MctsPlayer},
        Action,
    },
};

#[derive(Args)]
pub struct PlayArgs {
    /// Master seed for the deal and for the search workers.
    #[clap(long, short = 's', value_parser, default_value_t = 0x42)]
    seed: u64,

    /// How many search workers vote on every move.
    #[clap(long, short = 'w', value_parser, default_value_t = 4)]
    workers: usize,

    #[clap(long, short = 'd', value_parser, default_value_t = 18)]
    determinizations: usize,

    #[clap(long, short = 't', value_parser, default_value_t = 5000)]
    trajectories: usize,

    /// Reward function used for playouts.
    #[clap(value_enum, long, default_value = "score-sigmoid")]
    eval: Evaluator,
}

/// Lets the AI play one dealt game to the end, printing the tableau and
/// the merged per-move scores before every move.
pub fn run_play(args: PlayArgs) {
    let mut rng = Mt64::new(args.seed);
    let mut stock = Deck::new();
    stock.shuffle(&mut rng);
    let mut game = TriPeaks::new(stock);

    info!(
        "Running {} determinizations with {} trajectories on {} workers",
        args.determinizations, args.trajectories, args.workers
    );
    let mut player = MctsPlayer::new(
        rng.next_u64(),
        args.workers,
        args.determinizations,
        args.trajectories,
        args.eval,
    );

    loop {
        println!("{}", game);
        println!(
            "Cards in stock: {}\tScore: {}\tDiscard: {}",
            game.stock.len(),
            game.score,
            game.discard()
        );
        if game.cards_left == 0 {
            println!("AI won the game!");
            break;
        }
        if game.game_over() {
            println!("AI lost the game :(");
            break;
        }

        let scores = player.search_parallel(&game);
        let norm = (args.workers * args.determinizations * args.trajectories) as f64;
        for (mv, score) in &scores {
            println!("Move {} Score {:.6}", mv, score / norm);
        }
        match mcts::best_action(&scores) {
            Action::Draw => {
                println!("AI chose to draw a card");
                game.draw();
            }
            Action::Select(pos) => {
                println!("AI chose to discard {} on position {}", game.cards[pos], pos);
                game.select(pos as i32);
            }
        }
    }
}
