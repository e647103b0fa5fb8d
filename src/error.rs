use crate::simulation::RoundPhase;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("number_of_decks must be at least 1, got {0}")]
    InvalidDeckCount(u8),
    #[error("penetration must lie strictly between 0 and 1, got {0}")]
    InvalidPenetration(f64),
    #[error("{method} is only allowed in phase {expected}, current phase is {found:?}")]
    WrongPhase {
        method: &'static str,
        expected: &'static str,
        found: RoundPhase,
    },
    #[error("split requires exactly two cards of equal blackjack value")]
    CannotSplit,
    #[error("double down requires exactly two cards")]
    CannotDouble,
    #[error("no open hand to act on")]
    NoOpenHand,
    #[error("table snapshot I/O failed: {0}")]
    SnapshotIo(#[from] std::io::Error),
    #[error("table snapshot encoding failed: {0}")]
    SnapshotCodec(#[from] bincode::Error),
    #[error("unsupported table snapshot version {found} (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },
}
