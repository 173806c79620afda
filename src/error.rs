//! Error types for engine, store, and table operations.

use core::time::Duration;

use thiserror::Error;

use crate::card::Card;

/// Errors raised by a [`Deck`](crate::deck::Deck).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeckError {
    /// No cards remain.
    #[error("deck exhausted")]
    Exhausted,
    /// A stacked deck listed the same card twice.
    #[error("card {0} appears more than once")]
    DuplicateCard(Card),
}

/// Errors that can occur while opening a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DealError {
    /// Wager is zero.
    #[error("wager is zero")]
    ZeroWager,
    /// Not enough cards for the initial deal.
    #[error("not enough cards for the initial deal")]
    DeckExhausted,
}

/// Errors that can occur during player actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The round is not accepting player actions.
    #[error("invalid game state for this action")]
    InvalidState,
    /// The deck ran out mid-round.
    #[error("no cards left in the deck")]
    DeckExhausted,
}

/// Errors raised while validating a wager before a round exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WagerError {
    /// Wager is zero or negative.
    #[error("wager must be a positive number")]
    InvalidWager,
    /// Wager exceeds the current balance.
    #[error("insufficient balance ({balance})")]
    InsufficientBalance {
        /// Balance at the time of the check.
        balance: i64,
    },
}

/// Errors raised by the session registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The player already has a round in progress.
    #[error("an active game already exists for this player")]
    DuplicateActiveGame,
    /// The player has no round in progress.
    #[error("no active game for this player")]
    NoActiveGame,
}

/// Errors raised by a balance store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing database failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

fn remaining_text(remaining: &Duration) -> String {
    crate::daily::format_remaining(*remaining)
}

/// Errors raised by the daily bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DailyError {
    /// The cooldown has not elapsed yet.
    #[error("daily reward already claimed, {} left", remaining_text(.remaining))]
    OnCooldown {
        /// Time left until the next claim.
        remaining: Duration,
    },
}

/// Errors surfaced by [`Table`](crate::table::Table) commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Wager rejected before the round was created.
    #[error(transparent)]
    Wager(#[from] WagerError),
    /// Session registry rejected the command.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The round rejected the action.
    #[error(transparent)]
    Action(#[from] ActionError),
    /// The round could not be dealt.
    #[error(transparent)]
    Deal(#[from] DealError),
    /// The balance store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Daily bonus rejected.
    #[error(transparent)]
    Daily(#[from] DailyError),
    /// The round was aborted and the wager returned.
    #[error("round aborted, {refunded} refunded")]
    RoundAborted {
        /// Amount returned to the player.
        refunded: u64,
    },
    /// The caller is not allowed to run this command.
    #[error("permission denied")]
    PermissionDenied,
    /// Unknown setting key or invalid value.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// Errors raised while parsing a chat command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The line does not start with the command prefix.
    #[error("not a command")]
    NotACommand,
    /// The command name is not recognised.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// A required argument is missing.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    /// An argument is not a whole number.
    #[error("`{0}` is not a whole number")]
    InvalidNumber(String),
}
