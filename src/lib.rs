mod error;
pub mod learning;
pub mod policy;
mod qtable;
pub mod simulation;

use serde::{Deserialize, Serialize};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use strum_macros::Display;

pub use error::{Error, Result};
pub use qtable::{clamp_true_count, QTable, StateKey, TableSnapshot, SNAPSHOT_VERSION};

/// Table rules the engine plays under. Validated on construction: training
/// never starts from an impossible shoe.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    number_of_decks: u8,
    penetration: f64,
}

impl Rule {
    /// Creates a rule set. The deck count must be positive and the
    /// penetration must lie strictly between 0 and 1.
    pub fn new(number_of_decks: u8, penetration: f64) -> Result<Rule> {
        if number_of_decks < 1 {
            return Err(Error::InvalidDeckCount(number_of_decks));
        }
        if !(penetration > 0.0 && penetration < 1.0) {
            return Err(Error::InvalidPenetration(penetration));
        }
        Ok(Rule {
            number_of_decks,
            penetration,
        })
    }

    pub fn number_of_decks(&self) -> u8 {
        self.number_of_decks
    }

    pub fn penetration(&self) -> f64 {
        self.penetration
    }
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            number_of_decks: 6,
            penetration: 0.8,
        }
    }
}

/// Q-learning hyperparameters. Epsilon and alpha decay once per episode and
/// never fall below their floors.
#[derive(Debug, Clone, Copy)]
pub struct Hyperparameters {
    pub alpha: f64,
    pub epsilon: f64,
    pub gamma: f64,
    pub epsilon_min: f64,
    pub epsilon_decay: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            alpha: 0.01,
            epsilon: 1.0,
            gamma: 0.999,
            epsilon_min: 0.01,
            epsilon_decay: 0.999_999_99,
            alpha_min: 0.0001,
            alpha_decay: 0.999_999_99,
        }
    }
}

/// A player decision. `Split` and `Double` are only legal on two-card hands;
/// the legality rules live on [`StateKey::legal_actions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Action {
    Hit,
    Stand,
    Double,
    Split,
}

/// How per-worker value tables are combined after parallel training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize_enum_str, Deserialize_enum_str)]
pub enum MergePolicy {
    /// Pairwise mean where both tables hold an entry; adopt the value
    /// otherwise.
    Average,
    /// Entries of the incoming table overwrite existing ones.
    LatestWins,
}
