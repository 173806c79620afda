use tracing::{debug, trace};

use crate::card::Card;
use crate::error::ActionError;
use crate::result::{EndReason, Outcome};

use super::{Game, GameState};

impl Game {
    fn ensure_in_progress(&self) -> Result<(), ActionError> {
        if self.state != GameState::InProgress {
            return Err(ActionError::InvalidState);
        }
        Ok(())
    }

    /// Player action: Hit (draw a card).
    ///
    /// A bust finishes the round as [`Outcome::Lose`] without any dealer
    /// play. Reaching 21 does not end the turn.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidState`] unless the round is in
    /// progress, or [`ActionError::DeckExhausted`] if the deck is empty. The
    /// round is unchanged on error.
    pub fn hit(&mut self) -> Result<Card, ActionError> {
        self.ensure_in_progress()?;

        let card = self
            .deck
            .deal_one()
            .map_err(|_| ActionError::DeckExhausted)?;
        let drawn = card.clone();
        self.player_hand.add_card(card);
        debug!(
            player = %self.player,
            card = %drawn,
            total = self.player_hand.total_value(),
            "player hits"
        );

        if self.player_hand.is_bust() {
            self.state = GameState::PlayerBust;
            trace!(player = %self.player, "player bust");
            self.finish(Outcome::Lose, EndReason::PlayerBust);
        }

        Ok(drawn)
    }

    /// Player action: Stand (dealer plays out and the round is resolved).
    ///
    /// Returns the cards the dealer drew. The dealer plays on a working copy
    /// of the round that replaces `self` only once it has finished.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidState`] unless the round is in
    /// progress, or [`ActionError::DeckExhausted`] if the dealer needs a
    /// card and the deck is empty. The round is unchanged on error.
    pub fn stand(&mut self) -> Result<Vec<Card>, ActionError> {
        self.ensure_in_progress()?;

        let mut next = self.clone();
        next.state = GameState::PlayerStand;
        trace!(player = %next.player, total = next.player_hand.total_value(), "player stands");

        let drawn = next.dealer_play()?;
        next.resolve_showdown();

        *self = next;
        Ok(drawn)
    }
}
