use log::*;

use crate::{
    engine::{
        deck::Deck,
        game::{TriPeaks, TABLEAU_SIZE},
    },
    players::{Action, Player},
};

#[derive(Clone, Copy, Debug)]
pub struct GameResult {
    pub won: bool,
    pub cards_cleared: i32,
    pub score: i32,
}

/// Plays one full game with the given player and reports how it went.
/// A player that hands back an inapplicable move forfeits the game.
pub fn run(player: &mut dyn Player, stock: Deck) -> GameResult {
    let mut game = TriPeaks::new(stock);
    while !game.game_over() {
        let action = player.get_action(&game);
        debug!("{} plays {:?}", player.name(), action);
        let applied = match action {
            Action::Draw => game.draw(),
            Action::Select(pos) => game.select(pos as i32),
        };
        if !applied {
            error!("{} produced an inapplicable move: {:?}", player.name(), action);
            let cards_cleared = TABLEAU_SIZE as i32 - game.cards_left;
            game.surrender();
            return GameResult {
                won: false,
                cards_cleared,
                score: game.score,
            };
        }
    }
    GameResult {
        won: game.cards_left == 0,
        cards_cleared: TABLEAU_SIZE as i32 - game.cards_left,
        score: game.score,
    }
}
