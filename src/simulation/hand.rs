use super::Card;

/// Sentinel reported for any hand total over 21. Settlement and the state
/// encoder compare against this instead of raw sums.
pub const BUST_VALUE: u8 = 22;

/// A hand total plus whether an ace is currently counted as 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandValue {
    pub total: u8,
    pub soft: bool,
}

/// Values a card sequence, optionally folding in one extra card (the
/// dealer's hidden card during internal checks).
///
/// Aces enter as 1; one ace is promoted to 11 while the total stays within
/// 21, which makes the hand soft. A second promotion can never fit, so a
/// single check suffices. Totals over 21 collapse to [`BUST_VALUE`].
pub fn hand_value(cards: &[Card], extra: Option<Card>) -> HandValue {
    let mut total: u8 = 0;
    let mut aces = 0;
    for card in cards.iter().chain(extra.iter()) {
        let value = card.blackjack_value();
        if value == 1 {
            aces += 1;
        }
        total += value;
    }

    let mut soft = false;
    if aces > 0 && total + 10 <= 21 {
        total += 10;
        soft = true;
    }

    if total > 21 {
        return HandValue {
            total: BUST_VALUE,
            soft: false,
        };
    }
    HandValue { total, soft }
}

/// An ordered sequence of cards owned by either the player-hands list or
/// the dealer.
#[derive(Debug, Clone, Default)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Hand {
        Hand {
            cards: Vec::with_capacity(3),
        }
    }

    pub fn with_card(card: Card) -> Hand {
        let mut hand = Hand::new();
        hand.receive_card(card);
        hand
    }

    pub fn receive_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Removes and returns the last card. Used when a pair is split in two.
    pub fn remove_card(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn value(&self) -> HandValue {
        hand_value(&self.cards, None)
    }

    /// A natural: exactly two cards totalling 21.
    pub fn is_blackjack(&self) -> bool {
        self.cards.len() == 2 && self.value().total == 21
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Suit;

    fn card(face_value: u8) -> Card {
        Card {
            face_value,
            suit: Suit::Spade,
        }
    }

    #[test]
    fn busted_hand_reports_the_sentinel() {
        let value = hand_value(&[card(10), card(12), card(5)], None);
        assert_eq!(value.total, BUST_VALUE);
        assert!(!value.soft);
    }

    #[test]
    fn ace_six_is_a_soft_seventeen() {
        let value = hand_value(&[card(1), card(6)], None);
        assert_eq!(value.total, 17);
        assert!(value.soft);
    }

    #[test]
    fn ace_six_ten_is_a_hard_seventeen() {
        let value = hand_value(&[card(1), card(6), card(10)], None);
        assert_eq!(value.total, 17);
        assert!(!value.soft);
    }

    #[test]
    fn two_aces_count_as_twelve() {
        let value = hand_value(&[card(1), card(1)], None);
        assert_eq!(value.total, 12);
        assert!(value.soft);
    }

    #[test]
    fn face_cards_count_ten() {
        let value = hand_value(&[card(11), card(13)], None);
        assert_eq!(value.total, 20);
        assert!(!value.soft);
    }

    #[test]
    fn extra_card_folds_into_the_value() {
        // Dealer shows a ten; the hidden ace makes a natural.
        let value = hand_value(&[card(10)], Some(card(1)));
        assert_eq!(value.total, 21);
        assert!(value.soft);
    }

    #[test]
    fn blackjack_requires_exactly_two_cards() {
        let mut hand = Hand::new();
        hand.receive_card(card(1));
        hand.receive_card(card(13));
        assert!(hand.is_blackjack());

        let mut drawn_out = Hand::new();
        drawn_out.receive_card(card(7));
        drawn_out.receive_card(card(7));
        drawn_out.receive_card(card(7));
        assert_eq!(drawn_out.value().total, 21);
        assert!(!drawn_out.is_blackjack());
    }
}
