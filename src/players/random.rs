use log::*;
use rand::Rng;
use rand_mt::Mt64;

use crate::engine::game::{TriPeaks, DRAW_MOVE};

use super::{Action, Player};

/// Plays a uniformly random legal move. The benchmark baseline.
pub struct RandomPlayer {
    rng: Mt64,
}

impl RandomPlayer {
    pub fn new(seed: u64) -> Self {
        RandomPlayer {
            rng: Mt64::new(seed),
        }
    }
}

impl Player for RandomPlayer {
    fn name(&self) -> &str {
        "random"
    }

    fn get_action(&mut self, game: &TriPeaks) -> Action {
        let (moves, _) = game.legal_moves();
        debug!("Got {} legal moves", moves.len());
        let mv = moves[self.rng.gen_range(0..moves.len())];
        if mv == DRAW_MOVE {
            Action::Draw
        } else {
            Action::Select(mv as usize)
        }
    }
}
