pub mod eval;
pub mod mcts;
pub mod random;

use crate::engine::game::TriPeaks;

/// A decision against the current game state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Draw,
    Select(usize),
}

/// The base trait for all decision engines.
pub trait Player {
    fn name(&self) -> &str;

    /// Called with a game that is not over; must return an applicable move.
    fn get_action(&mut self, game: &TriPeaks) -> Action;
}
