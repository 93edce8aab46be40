use clap::ValueEnum;

use crate::engine::game::{TriPeaks, TABLEAU_SIZE};

/// Reward functions applied to terminal playout states. Scores feed
/// straight into backpropagation.
///
/// `Linear` is kept with its historical orientation: it grows with the
/// number of cards *left*, so higher is worse. Read benchmark rows for it
/// accordingly.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Evaluator {
    Binary,
    Linear,
    Score,
    ScoreLog,
    ScoreSigmoid,
}

impl Evaluator {
    pub fn evaluate(&self, game: &TriPeaks) -> f64 {
        match self {
            Evaluator::Binary => {
                if game.cards_left == 0 {
                    1.0
                } else {
                    0.0
                }
            }
            Evaluator::Linear => f64::from(game.cards_left) / TABLEAU_SIZE as f64,
            Evaluator::Score => (0.0125 * f64::from(game.score) + 0.25).clamp(0.0, 1.0),
            Evaluator::ScoreLog => (1.0 + f64::from(game.score).exp()).ln(),
            Evaluator::ScoreSigmoid => 1.0 / (1.0 + (-f64::from(game.score) / 15.0).exp()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Evaluator::Binary => "binary",
            Evaluator::Linear => "linear",
            Evaluator::Score => "score",
            Evaluator::ScoreLog => "score-log",
            Evaluator::ScoreSigmoid => "score-sigmoid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::deck::Deck;

    fn game_with_score(score: i32) -> TriPeaks {
        let mut game = TriPeaks::new(Deck::new());
        game.score = score;
        game
    }

    #[test]
    fn test_binary() {
        let mut game = game_with_score(0);
        assert_eq!(0.0, Evaluator::Binary.evaluate(&game));
        game.cards_left = 0;
        assert_eq!(1.0, Evaluator::Binary.evaluate(&game));
    }

    #[test]
    fn test_linear_grows_with_cards_left() {
        let mut game = game_with_score(0);
        assert_eq!(1.0, Evaluator::Linear.evaluate(&game));
        game.cards_left = 14;
        assert_eq!(0.5, Evaluator::Linear.evaluate(&game));
        game.cards_left = 0;
        assert_eq!(0.0, Evaluator::Linear.evaluate(&game));
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(0.0, Evaluator::Score.evaluate(&game_with_score(-60)));
        assert_eq!(0.25, Evaluator::Score.evaluate(&game_with_score(0)));
        assert_eq!(0.5, Evaluator::Score.evaluate(&game_with_score(20)));
        assert_eq!(1.0, Evaluator::Score.evaluate(&game_with_score(100)));
    }

    #[test]
    fn test_score_log_is_softplus() {
        let value = Evaluator::ScoreLog.evaluate(&game_with_score(0));
        assert!((value - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_score_sigmoid() {
        assert_eq!(0.5, Evaluator::ScoreSigmoid.evaluate(&game_with_score(0)));
        let high = Evaluator::ScoreSigmoid.evaluate(&game_with_score(150));
        let low = Evaluator::ScoreSigmoid.evaluate(&game_with_score(-150));
        assert!(high > 0.99);
        assert!(low < 0.01);
    }
}
