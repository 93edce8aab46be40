use once_cell::sync::Lazy;
use rand::{seq::SliceRandom, Rng};

use super::card::{Card, Suit};

/// The 52-card template shared by every search; never mutated.
pub static FULL_DECK: Lazy<Vec<Card>> = Lazy::new(|| Deck::new().cards);

/// An ordered pile of cards. The top of the pile is the end of the vec.
#[derive(Clone, Debug)]
pub struct Deck {
    pub cards: Vec<Card>,
}

impl Deck {
    /// Creates a full 52-card deck, every (rank, suit) pair once, face-up.
    pub fn new() -> Deck {
        let mut cards = Vec::with_capacity(52);
        for rank in 2..=14 {
            for suit in Suit::VALUES {
                cards.push(Card::new(rank, suit));
            }
        }
        Deck { cards }
    }

    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        self.cards.shuffle(rng);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn pop(&mut self) -> Option<Card> {
        self.cards.pop()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Deck::new()
    }
}

/// Removes and returns `cards[i]`. The slot is filled with the last
/// element, so ordering is not preserved.
pub fn remove_at(cards: &mut Vec<Card>, i: usize) -> Card {
    cards.swap_remove(i)
}

/// Removes the first card matching `card` by suit and rank. Returns false
/// if no such card is present.
pub fn remove_value(cards: &mut Vec<Card>, card: &Card) -> bool {
    match cards
        .iter()
        .position(|c| c.suit == card.suit && c.rank == card.rank)
    {
        Some(i) => {
            cards.swap_remove(i);
            true
        }
        None => false,
    }
}
