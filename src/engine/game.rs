use std::fmt::{self, Display, Formatter};

use log::*;

use super::{card::Card, deck::Deck};

pub const TABLEAU_SIZE: usize = 28;
/// First index of the face-up base tier.
pub const BASE_START: usize = 18;
/// The move encoding for drawing from the stock.
pub const DRAW_MOVE: i32 = -1;

const TIP_BONUS: i32 = 15;
const DRAW_PENALTY: i32 = 5;

/// One tableau cell: a card plus the bookkeeping needed to tell whether it
/// is still in play and whether anything is still covering it.
#[derive(Clone, Copy, Debug)]
pub struct PeakCard {
    pub card: Card,
    pub removed: bool,
    pub children_left: u8,
}

impl PeakCard {
    /// One covering card went away. The card turns face-up when the last
    /// one does.
    fn sub_child(&mut self) {
        if self.children_left > 0 {
            self.children_left -= 1;
            if self.children_left == 0 {
                self.card.face_down = false;
            }
        }
    }
}

impl Display for PeakCard {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.removed {
            return write!(f, "      ");
        }
        write!(f, "{}", self.card)
    }
}

/// The Tri Peaks table: three overlapping peaks over a shared base row,
/// a stock to draw from and a discard stream.
///
/// `discards[0]` is always the current face-up top; older discards are
/// pushed to the tail oldest-first.
#[derive(Clone, Debug)]
pub struct TriPeaks {
    pub stock: Deck,
    pub discards: Vec<Card>,
    pub cards: [PeakCard; TABLEAU_SIZE],
    pub cards_left: i32,
    pub score: i32,
    pub streak: i32,
}

impl TriPeaks {
    /// Deals a new game from a shuffled deck: one discard, 28 tableau
    /// cards, 23 left in the stock.
    ///
    /// Panics unless the deck holds exactly 52 cards.
    pub fn new(mut stock: Deck) -> TriPeaks {
        assert_eq!(52, stock.len(), "deck requires 52 cards");

        let mut discard = stock.pop().unwrap();
        discard.face_down = false;

        let mut cards = Vec::with_capacity(TABLEAU_SIZE);
        for i in 0..TABLEAU_SIZE {
            let mut card = stock.pop().unwrap();
            if i < BASE_START {
                card.face_down = true;
                cards.push(PeakCard {
                    card,
                    removed: false,
                    children_left: 2,
                });
            } else {
                cards.push(PeakCard {
                    card,
                    removed: false,
                    children_left: 0,
                });
            }
        }

        TriPeaks {
            stock,
            discards: vec![discard],
            cards: cards.try_into().unwrap(),
            cards_left: TABLEAU_SIZE as i32,
            score: 0,
            streak: 0,
        }
    }

    /// The current face-up discard.
    pub fn discard(&self) -> Card {
        self.discards[0]
    }

    /// Makes `card` the current discard, pushing the previous one to the
    /// tail of the history.
    pub fn add_discard(&mut self, card: Card) {
        let previous = self.discards[0];
        self.discards.push(previous);
        self.discards[0] = card;
    }

    /// A tableau card may be played when it is exposed (face-up, nothing
    /// covering it, not yet removed) and its rank is adjacent to the
    /// discard's, with ace and two wrapping around.
    pub fn is_legal(&self, card: &PeakCard) -> bool {
        let discard = self.discard();
        !card.card.face_down
            && card.children_left == 0
            && !card.removed
            && (card.card.rank + 1 == discard.rank
                || card.card.rank == discard.rank + 1
                || (card.card.rank == 2 && discard.rank == 14)
                || (card.card.rank == 14 && discard.rank == 2))
    }

    /// All playable tableau positions, plus [`DRAW_MOVE`] while the stock
    /// holds cards. The flag mirrors whether drawing is possible.
    pub fn legal_moves(&self) -> (Vec<i32>, bool) {
        let mut moves: Vec<i32> = (0..TABLEAU_SIZE as i32)
            .filter(|&pos| self.is_legal(&self.cards[pos as usize]))
            .collect();
        let can_draw = !self.stock.is_empty();
        if can_draw {
            moves.push(DRAW_MOVE);
        }
        (moves, can_draw)
    }

    pub fn game_over(&self) -> bool {
        let (moves, _) = self.legal_moves();
        moves.is_empty()
    }

    /// Plays the tableau card at `pos`. Returns false when the position is
    /// out of range or the move is illegal.
    pub fn select(&mut self, pos: i32) -> bool {
        if pos < 0 || pos >= TABLEAU_SIZE as i32 {
            return false;
        }
        let pos = pos as usize;
        if !self.is_legal(&self.cards[pos]) {
            return false;
        }
        self.cards[pos].removed = true;
        self.add_discard(self.cards[pos].card);
        self.apply_reveals(pos);
        self.cards_left -= 1;
        self.streak += 1;
        self.score += self.streak;
        if pos < 3 {
            self.score += TIP_BONUS;
        }
        if self.cards[0].removed && self.cards[1].removed && self.cards[2].removed {
            self.score += TIP_BONUS;
        }
        true
    }

    /// Turns the next stock card into the discard, at the cost of five
    /// points and the streak. Returns false when the stock is empty.
    pub fn draw(&mut self) -> bool {
        match self.stock.pop() {
            Some(card) => {
                self.score -= DRAW_PENALTY;
                self.streak = 0;
                self.add_discard(card);
                true
            }
            None => false,
        }
    }

    /// Gives up the game: every remaining tableau card is removed for a
    /// five point penalty each.
    pub fn surrender(&mut self) {
        debug!("surrendering with {} cards left", self.cards_left);
        for cell in self.cards.iter_mut() {
            if !cell.removed {
                self.score -= DRAW_PENALTY;
            }
            cell.removed = true;
        }
        self.cards_left = 0;
    }

    /// The up-to-two tableau cells uncovered a bit further by removing the
    /// card at `pos`.
    pub fn check_reveals(pos: i32) -> (Option<usize>, Option<usize>) {
        match pos {
            3 | 4 => (Some(0), None),
            5 | 6 => (Some(1), None),
            7 | 8 => (Some(2), None),
            9 => (None, Some(3)),
            10 => (Some(3), Some(4)),
            11 => (Some(4), None),
            12 => (None, Some(5)),
            13 => (Some(5), Some(6)),
            14 => (Some(6), None),
            15 => (None, Some(7)),
            16 => (Some(7), Some(8)),
            17 => (Some(8), None),
            18 => (None, Some(9)),
            19..=21 => {
                let right = (pos - 18 + 9) as usize;
                (Some(right - 1), Some(right))
            }
            22..=24 => {
                let right = (pos - 22 + 13) as usize;
                (Some(right - 1), Some(right))
            }
            25 | 26 => {
                let right = (pos - 25 + 16) as usize;
                (Some(right - 1), Some(right))
            }
            27 => (Some(17), None),
            _ => (None, None),
        }
    }

    pub fn apply_reveals(&mut self, pos: usize) {
        let (left, right) = Self::check_reveals(pos as i32);
        if let Some(left) = left {
            self.cards[left].sub_child();
        }
        if let Some(right) = right {
            self.cards[right].sub_child();
        }
    }

    /// Every card whose identity the player already knows: face-up tableau
    /// cards (removed ones included) and the whole discard history.
    pub fn used_cards(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = self
            .cards
            .iter()
            .filter(|cell| !cell.card.face_down)
            .map(|cell| cell.card)
            .collect();
        cards.extend_from_slice(&self.discards);
        cards
    }
}

impl Display for TriPeaks {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for i in 0..3 {
            if i == 0 {
                write!(f, "         {}", self.cards[i])?;
            } else {
                write!(f, "            {}", self.cards[i])?;
            }
        }
        writeln!(f)?;
        for i in 3..9 {
            if (i - 3) % 2 == 0 {
                write!(f, "      {}", self.cards[i])?;
            } else {
                write!(f, "{}", self.cards[i])?;
            }
        }
        writeln!(f)?;
        let middle: String = (9..BASE_START).map(|i| self.cards[i].to_string()).collect();
        f.write_str(&textwrap::indent(&middle, "   "))?;
        writeln!(f)?;
        for i in BASE_START..TABLEAU_SIZE {
            write!(f, "{}", self.cards[i])?;
        }
        writeln!(f)
    }
}
