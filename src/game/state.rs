//! Game state types.

use serde::Serialize;

use crate::card::Card;
use crate::player::PlayerId;
use crate::result::{EndReason, Outcome};

/// Round lifecycle state.
///
/// A round rests in [`GameState::InProgress`] or [`GameState::Finished`].
/// The other two are the steps `hit` and `stand` pass through on their way
/// to `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GameState {
    /// Waiting for the player to hit or stand.
    InProgress,
    /// Player went over 21.
    PlayerBust,
    /// Player stood and the dealer is drawing.
    PlayerStand,
    /// Round is over and the outcome is fixed.
    Finished,
}

/// A card as the player is allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CardView {
    /// Face up.
    Shown(Card),
    /// The dealer's hole card while the round is in progress.
    Hidden,
}

/// The dealer's hand as the player is allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DealerView {
    /// Cards in deal order.
    pub cards: Vec<CardView>,
    /// Total of the visible cards only.
    pub total: u8,
    /// Whether the hole card is still face down.
    pub hole_hidden: bool,
}

/// Read-only projection of a round for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Owner of the round.
    pub player: PlayerId,
    /// Wager placed on the round.
    pub wager: u64,
    /// Player cards in deal order.
    pub player_cards: Vec<Card>,
    /// Player total.
    pub player_total: u8,
    /// Dealer hand, hole card hidden while in progress.
    pub dealer: DealerView,
    /// Lifecycle state.
    pub state: GameState,
    /// Outcome, set once finished.
    pub outcome: Option<Outcome>,
    /// How the round ended, set once finished.
    pub end_reason: Option<EndReason>,
}
