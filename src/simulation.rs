pub mod hand;
pub mod shoe;

use crate::{clamp_true_count, Error, Result, Rule, StateKey};
use blackjack_ql_macros::allowed_phase;
use strum_macros::EnumIter;

use self::hand::{hand_value, Hand, HandValue, BUST_VALUE};
use self::shoe::Shoe;

static FACE_VALUE_TO_BLACKJACK_VALUE: [u8; 13] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 10, 10];

#[derive(Debug, Clone, Copy, PartialEq, EnumIter)]
pub enum Suit {
    Diamond = 0,
    Club,
    Heart,
    Spade,
}

/// Represents a card in the real world with a suit and a face value. The
/// suit never matters to the game logic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Card {
    pub face_value: u8,
    pub suit: Suit,
}

impl Card {
    pub fn blackjack_value(&self) -> u8 {
        FACE_VALUE_TO_BLACKJACK_VALUE[(self.face_value - 1) as usize]
    }
}

impl Default for Card {
    fn default() -> Self {
        Card {
            face_value: 1,
            suit: Suit::Diamond,
        }
    }
}

impl From<Card> for u8 {
    fn from(card: Card) -> u8 {
        card.suit as u8 * 13 + card.face_value - 1
    }
}

impl TryFrom<u8> for Card {
    type Error = ();

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        if value >= 52 {
            return Err(());
        }
        let suit = match value / 13 {
            0 => Suit::Diamond,
            1 => Suit::Club,
            2 => Suit::Heart,
            _ => Suit::Spade,
        };
        Ok(Card {
            suit,
            face_value: value % 13 + 1,
        })
    }
}

/// One dealt round walks `Dealing -> PlayerActing -> DealerPlayout ->
/// Settlement`; `reset` returns it to `Dealing`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundPhase {
    Dealing,
    PlayerActing,
    DealerPlayout,
    Settlement,
}

/// The round state machine: one player seat (possibly holding several hands
/// after splits) against the dealer.
///
/// Mutators are phase-gated; calling one out of phase is a caller-contract
/// violation and returns [`Error::WrongPhase`]. The payout list stays
/// parallel to the hand list at all times: entries start at -1 (one unit at
/// risk) and are only ever multiplied by settlement.
pub struct Game {
    rule: Rule,
    phase: RoundPhase,
    shoe: Shoe,
    player_hands: Vec<Hand>,
    payouts: Vec<f64>,
    current_hand: usize,
    hand_over: bool,
    dealer_hand: Hand,
    hidden_card: Option<Card>,
}

impl Game {
    pub fn new(rule: &Rule) -> Game {
        Game {
            rule: *rule,
            phase: RoundPhase::Dealing,
            shoe: Shoe::new(rule.number_of_decks(), rule.penetration()),
            player_hands: vec![Hand::new()],
            payouts: vec![-1.0],
            current_hand: 0,
            hand_over: false,
            dealer_hand: Hand::new(),
            hidden_card: None,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Index of the hand currently being played.
    pub fn current_hand(&self) -> usize {
        self.current_hand
    }

    pub fn number_of_hands(&self) -> usize {
        self.player_hands.len()
    }

    pub fn current_hand_len(&self) -> usize {
        self.player_hands
            .get(self.current_hand)
            .map_or(0, Hand::len)
    }

    /// Whether the active hand has been closed by its last action.
    pub fn is_hand_over(&self) -> bool {
        self.hand_over
    }

    pub fn payouts(&self) -> &[f64] {
        &self.payouts
    }

    pub fn player_hands(&self) -> &[Hand] {
        &self.player_hands
    }

    pub fn dealer_hand(&self) -> &Hand {
        &self.dealer_hand
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    /// Mutable shoe access, for deterministic setups
    /// (see [`Shoe::shuffle_with_firsts`]).
    pub fn shoe_mut(&mut self) -> &mut Shoe {
        &mut self.shoe
    }

    pub fn player_value(&self, index: usize) -> HandValue {
        self.player_hands[index].value()
    }

    /// Dealer total over the visible cards, optionally folding in the hidden
    /// card for internal checks. The hidden card is never exposed to the
    /// state encoder.
    pub fn dealer_value(&self, include_hidden: bool) -> u8 {
        let extra = if include_hidden {
            self.hidden_card
        } else {
            None
        };
        hand_value(self.dealer_hand.cards(), extra).total
    }

    /// True when the dealer holds a natural. Before the reveal this peeks at
    /// the hidden card; afterwards it checks the two revealed cards.
    pub fn is_dealer_blackjack(&self) -> bool {
        match self.hidden_card {
            Some(_) => self.dealer_hand.len() + 1 == 2 && self.dealer_value(true) == 21,
            None => self.dealer_hand.len() == 2 && self.dealer_value(false) == 21,
        }
    }

    pub fn can_split(&self) -> bool {
        self.can_split_hand(self.current_hand)
    }

    pub fn can_double(&self) -> bool {
        self.can_double_hand(self.current_hand)
    }

    fn can_split_hand(&self, index: usize) -> bool {
        if self.hand_over {
            return false;
        }
        self.player_hands.get(index).map_or(false, |hand| {
            let cards = hand.cards();
            cards.len() == 2 && cards[0].blackjack_value() == cards[1].blackjack_value()
        })
    }

    fn can_double_hand(&self, index: usize) -> bool {
        if self.hand_over {
            return false;
        }
        self.player_hands.get(index).map_or(false, |hand| hand.len() == 2)
    }

    fn state_for_hand(&self, index: usize) -> StateKey {
        let value = self.player_hands[index].value();
        StateKey {
            player_total: value.total,
            is_soft: value.soft,
            dealer_up: self.dealer_value(false),
            can_split: self.can_split_hand(index),
            can_double: self.can_double_hand(index),
            can_act: !self.hand_over,
            true_count: clamp_true_count(self.shoe.true_count()),
        }
    }

    /// Canonical state key for the active hand.
    pub fn observed_state(&self) -> StateKey {
        self.state_for_hand(self.current_hand)
    }

    /// State key for the hand right after the active one, if any. Only
    /// meaningful immediately after a split, when both halves want a
    /// zero-reward transition recorded.
    pub fn peek_next_hand_state(&self) -> Option<StateKey> {
        if self.current_hand + 1 < self.player_hands.len() {
            Some(self.state_for_hand(self.current_hand + 1))
        } else {
            None
        }
    }

    /// Deals one counted card to the active hand. Used for the opening deal
    /// and for topping up a freshly split one-card hand.
    #[allowed_phase(Dealing, PlayerActing)]
    pub fn deal_to_player(&mut self) -> Result<()> {
        self.ensure_open_hand()?;
        self.deal_counted_to_hand(self.current_hand);
        self.finish_opening_if_complete();
        Ok(())
    }

    /// Deals the dealer one card. A hidden card is set aside without
    /// touching the running count; it only enters the count at reveal.
    #[allowed_phase(Dealing)]
    pub fn deal_to_dealer(&mut self, hidden: bool) -> Result<()> {
        let card = self.shoe.draw();
        if hidden {
            self.hidden_card = Some(card);
        } else {
            self.shoe.observe(card);
            self.dealer_hand.receive_card(card);
        }
        self.finish_opening_if_complete();
        Ok(())
    }

    /// Draws one card; a bust closes the hand.
    #[allowed_phase(PlayerActing)]
    pub fn hit(&mut self) -> Result<()> {
        self.ensure_open_hand()?;
        self.deal_counted_to_hand(self.current_hand);
        if self.player_hands[self.current_hand].value().total == BUST_VALUE {
            self.hand_over = true;
        }
        Ok(())
    }

    /// Closes the hand without drawing.
    #[allowed_phase(PlayerActing)]
    pub fn stand(&mut self) -> Result<()> {
        self.ensure_open_hand()?;
        self.hand_over = true;
        Ok(())
    }

    /// Draws exactly one card, doubles the hand's payout multiplier, and
    /// closes the hand. Only legal on a two-card hand.
    #[allowed_phase(PlayerActing)]
    pub fn double_down(&mut self) -> Result<()> {
        self.ensure_open_hand()?;
        if self.player_hands[self.current_hand].len() != 2 {
            return Err(Error::CannotDouble);
        }
        self.deal_counted_to_hand(self.current_hand);
        self.payouts[self.current_hand] *= 2.0;
        self.hand_over = true;
        Ok(())
    }

    /// Splits the active two-card pair into two adjacent hands, each with
    /// its own one-unit payout entry, and deals one follow-up card to each.
    /// The active index is not adjusted: both halves are played
    /// left-to-right as the round advances.
    #[allowed_phase(PlayerActing)]
    pub fn split(&mut self) -> Result<()> {
        self.ensure_open_hand()?;
        {
            let cards = self.player_hands[self.current_hand].cards();
            if cards.len() != 2 || cards[0].blackjack_value() != cards[1].blackjack_value() {
                return Err(Error::CannotSplit);
            }
        }
        self.payouts
            .insert(self.current_hand + 1, self.payouts[self.current_hand]);
        let second = self.player_hands[self.current_hand]
            .remove_card()
            .ok_or(Error::CannotSplit)?;
        self.player_hands
            .insert(self.current_hand + 1, Hand::with_card(second));

        self.deal_counted_to_hand(self.current_hand);
        self.deal_counted_to_hand(self.current_hand + 1);
        Ok(())
    }

    /// Moves past a closed hand. Callers loop over hands until the active
    /// index exceeds the hand count.
    #[allowed_phase(PlayerActing)]
    pub fn advance_hand(&mut self) -> Result<()> {
        if self.hand_over {
            self.hand_over = false;
            self.current_hand += 1;
        }
        Ok(())
    }

    /// Reveals the hidden card, plays out the dealer if any hand can still
    /// beat a standing total, and multiplies each payout entry per the
    /// settlement rules. Returns one payout multiplier per hand, in order.
    #[allowed_phase(PlayerActing)]
    pub fn settle(&mut self) -> Result<Vec<f64>> {
        let values: Vec<u8> = self
            .player_hands
            .iter()
            .map(|hand| hand.value().total)
            .collect();
        let naturals: Vec<bool> = self.player_hands.iter().map(Hand::is_blackjack).collect();
        // The dealer only plays when some hand could still win against a
        // standing dealer: value below 21, or 21 that is not a natural.
        let dealer_must_play = values
            .iter()
            .zip(&naturals)
            .any(|(&value, &natural)| value < 21 || (value == 21 && !natural));

        self.phase = RoundPhase::DealerPlayout;
        if let Some(card) = self.hidden_card.take() {
            self.shoe.observe(card);
            self.dealer_hand.receive_card(card);
        }
        if dealer_must_play {
            // Stands on soft 17.
            while self.dealer_value(false) < 17 {
                let card = self.shoe.draw();
                self.shoe.observe(card);
                self.dealer_hand.receive_card(card);
            }
        }

        let dealer_value = self.dealer_value(false);
        let dealer_natural = self.dealer_hand.len() == 2 && dealer_value == 21;
        for i in 0..self.payouts.len() {
            let value = values[i];
            if dealer_natural && naturals[i] {
                self.payouts[i] *= 0.0;
            } else if naturals[i] {
                self.payouts[i] *= -1.5;
            } else if value <= 21 && (dealer_value > 21 || value > dealer_value) {
                self.payouts[i] *= -1.0;
            } else if value <= 21 && dealer_value == value {
                self.payouts[i] *= 0.0;
            }
        }

        self.phase = RoundPhase::Settlement;
        Ok(self.payouts.clone())
    }

    /// Clears the round back to the Dealing defaults and reshuffles the shoe
    /// once the dealt fraction reaches the penetration.
    #[allowed_phase(Settlement)]
    pub fn reset(&mut self) -> Result<()> {
        self.current_hand = 0;
        self.hand_over = false;
        self.player_hands = vec![Hand::new()];
        self.dealer_hand.clear();
        self.hidden_card = None;
        self.payouts = vec![-1.0];
        if self.shoe.penetration_reached() {
            self.shoe.rebuild();
        }
        self.phase = RoundPhase::Dealing;
        Ok(())
    }

    fn ensure_open_hand(&self) -> Result<()> {
        if self.hand_over || self.current_hand >= self.player_hands.len() {
            return Err(Error::NoOpenHand);
        }
        Ok(())
    }

    fn deal_counted_to_hand(&mut self, index: usize) {
        let card = self.shoe.draw();
        self.shoe.observe(card);
        self.player_hands[index].receive_card(card);
    }

    /// The opening deal is complete once the player holds two cards and the
    /// dealer shows one card with a hole card behind it.
    fn finish_opening_if_complete(&mut self) {
        if self.phase == RoundPhase::Dealing
            && self.hidden_card.is_some()
            && self.dealer_hand.len() == 1
            && self.player_hands[0].len() == 2
        {
            self.phase = RoundPhase::PlayerActing;
        }
    }
}
