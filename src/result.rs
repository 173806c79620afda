//! Round outcomes and settlement.

use serde::Serialize;

use crate::options::{PayoutOptions, RoundingMode};

/// Final result of a round, from the player's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    /// Player wins (dealer busts or player has the higher total).
    Win,
    /// Player loses (player busts or dealer has the higher total).
    Lose,
    /// Push (tie).
    Push,
    /// Player was dealt a natural.
    PlayerBlackjack,
}

/// How a round came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EndReason {
    /// Decided on the initial deal.
    Natural,
    /// Player went over 21.
    PlayerBust,
    /// Dealer went over 21.
    DealerBust,
    /// Totals were compared after the dealer stood.
    Showdown,
}

/// Money movement at the end of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    /// The outcome that was settled.
    pub outcome: Outcome,
    /// The wager deducted at round start.
    pub wager: u64,
    /// Amount credited back (wager included).
    pub credited: u64,
    /// Balance after the credit.
    pub balance: i64,
}

impl Settlement {
    /// Net change for the round (positive = profit, negative = loss).
    #[expect(clippy::cast_possible_wrap, reason = "currency amounts fit in i64")]
    #[must_use]
    pub const fn net(&self) -> i64 {
        self.credited as i64 - self.wager as i64
    }
}

fn round_amount(amount: f64, mode: RoundingMode) -> u64 {
    match mode {
        RoundingMode::Up => amount.ceil() as u64,
        RoundingMode::Down => amount.floor() as u64,
        RoundingMode::Nearest => amount.round() as u64,
    }
}

/// Returns the amount owed back to the player for `outcome`, given that the
/// wager was already deducted when the round started.
///
/// ```
/// use bjbot::{Outcome, PayoutOptions, settle};
///
/// let payouts = PayoutOptions::default();
/// assert_eq!(settle(Outcome::Win, 10, &payouts), 20);
/// assert_eq!(settle(Outcome::PlayerBlackjack, 10, &payouts), 25);
/// ```
#[must_use]
pub fn settle(outcome: Outcome, wager: u64, payouts: &PayoutOptions) -> u64 {
    match outcome {
        Outcome::Win => wager.saturating_mul(2),
        Outcome::Push => wager,
        Outcome::Lose => 0,
        Outcome::PlayerBlackjack => {
            #[expect(
                clippy::cast_precision_loss,
                reason = "f64 has sufficient precision for monetary values"
            )]
            let winnings = (wager as f64) * payouts.blackjack_pays;
            wager.saturating_add(round_amount(winnings, payouts.rounding_blackjack))
        }
    }
}
