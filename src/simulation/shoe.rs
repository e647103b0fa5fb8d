use super::{Card, Suit};

use strum::IntoEnumIterator;

use log::debug;
use rand::seq::SliceRandom;
use rand::thread_rng;

/// Represents a shoe in the real world, plus the Hi-Lo running count a
/// counting player would keep alongside it.
///
/// Cards are drawn from a cursor over a shuffled sequence. The shoe rebuilds
/// itself whenever it runs dry, so drawing is infallible; the penetration
/// check at round reset is the usual reshuffle trigger.
#[derive(Debug, Clone)]
pub struct Shoe {
    number_of_decks: u8,
    penetration: f64,
    cards: Vec<Card>,
    current_index: usize,
    running_count: i32,
}

impl Shoe {
    /// Creates a new shuffled shoe with `number_of_decks * 52` cards.
    pub fn new(number_of_decks: u8, penetration: f64) -> Shoe {
        let mut shoe = Shoe {
            number_of_decks,
            penetration,
            cards: Vec::with_capacity(number_of_decks as usize * 52),
            current_index: 0,
            running_count: 0,
        };
        shoe.rebuild();
        shoe
    }

    /// Returns the dealt cards back into the shoe, shuffles, and resets the
    /// running count.
    pub fn rebuild(&mut self) {
        self.cards.clear();
        for _ in 0..self.number_of_decks {
            for suit in Suit::iter() {
                for face_value in 1..=13 {
                    self.cards.push(Card { face_value, suit });
                }
            }
        }
        self.cards.shuffle(&mut thread_rng());
        self.current_index = 0;
        self.running_count = 0;
    }

    /// Deals one card. An exhausted shoe rebuilds itself first; mid-round
    /// exhaustion is rare but must not crash.
    pub fn draw(&mut self) -> Card {
        if self.current_index >= self.cards.len() {
            debug!("shoe exhausted mid-round, rebuilding");
            self.rebuild();
        }
        let card = self.cards[self.current_index];
        self.current_index += 1;
        card
    }

    /// Folds a now-visible card into the Hi-Lo running count. Drawing alone
    /// never updates the count: a hidden dealer card is observed only when
    /// it is revealed.
    pub fn observe(&mut self, card: Card) {
        self.running_count += match card.blackjack_value() {
            2..=6 => 1,
            1 | 10 => -1,
            _ => 0,
        };
    }

    pub fn running_count(&self) -> i32 {
        self.running_count
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.current_index
    }

    /// The running count normalized by decks remaining, rounded. An empty
    /// shoe reports 0.
    pub fn true_count(&self) -> i32 {
        let remaining = self.remaining();
        if remaining == 0 {
            return 0;
        }
        let decks_remaining = remaining as f64 / 52.0;
        (self.running_count as f64 / decks_remaining).round() as i32
    }

    /// Checks if the dealt fraction has reached the penetration.
    pub fn penetration_reached(&self) -> bool {
        self.current_index as f64 / self.cards.len() as f64 >= self.penetration
    }

    /// Rebuilds the shoe so that the next draws produce cards of the given
    /// blackjack values, with the rest shuffled behind them. Resets the
    /// cursor and the running count. Panics if the requested cards exceed
    /// the shoe's composition.
    ///
    /// Note that the cards are given in blackjack values (i.e., 1 stands for
    /// A, 10 stands for 10 and J, Q, K).
    pub fn shuffle_with_firsts(&mut self, firsts: &[u8]) {
        let mut counts = [self.number_of_decks; 52];
        self.current_index = 0;
        self.running_count = 0;

        let mut idx = 0;
        for blackjack_value in firsts {
            let card_integer = find_suitable_card(&counts, *blackjack_value)
                .expect("The given first cards are invalid");
            counts[card_integer as usize] -= 1;
            self.cards[idx] = Card::try_from(card_integer).unwrap();
            idx += 1;
        }

        for suit in Suit::iter() {
            for face_value in 1..=13 {
                let card = Card { face_value, suit };
                let card_integer: u8 = card.into();
                for _ in 0..counts[card_integer as usize] {
                    self.cards[idx] = card;
                    idx += 1;
                }
            }
        }

        self.cards[firsts.len()..].shuffle(&mut thread_rng());
    }
}

fn find_suitable_card(counts: &[u8; 52], blackjack_value: u8) -> Result<u8, ()> {
    let mut card: Card = Default::default();
    let (lo, hi) = {
        if blackjack_value == 10 {
            (10, 13)
        } else {
            (blackjack_value, blackjack_value)
        }
    };

    for face_value in lo..=hi {
        card.face_value = face_value;
        for suit in Suit::iter() {
            card.suit = suit;
            let card: u8 = card.into();
            if counts[card as usize] > 0 {
                return Ok(card);
            }
        }
    }

    Err(())
}
