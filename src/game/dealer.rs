use tracing::trace;

use crate::card::Card;
use crate::error::ActionError;
use crate::result::{EndReason, Outcome};

use super::{Game, GameState};

impl Game {
    /// Dealer draws according to the rules.
    ///
    /// The dealer draws until reaching 17 or higher. If `stand_on_soft_17`
    /// is false the dealer also draws on a soft 17. A bust stops the loop.
    pub(super) fn dealer_play(&mut self) -> Result<Vec<Card>, ActionError> {
        debug_assert_eq!(self.state, GameState::PlayerStand);

        let mut drawn_cards = Vec::new();
        loop {
            let value = self.dealer_hand.total_value();
            let is_soft = self.dealer_hand.is_soft();

            if value > 17 {
                break;
            }
            if value == 17 && (!is_soft || self.rules.stand_on_soft_17) {
                break;
            }

            let card = self
                .deck
                .deal_one()
                .map_err(|_| ActionError::DeckExhausted)?;
            trace!(player = %self.player, card = %card, "dealer draws");
            drawn_cards.push(card.clone());
            self.dealer_hand.add_card(card);
        }

        Ok(drawn_cards)
    }

    /// Compares the finished hands and finishes the round.
    pub(super) fn resolve_showdown(&mut self) {
        let player_value = self.player_hand.total_value();
        let dealer_value = self.dealer_hand.total_value();

        if self.dealer_hand.is_bust() {
            self.finish(Outcome::Win, EndReason::DealerBust);
        } else if dealer_value > player_value {
            self.finish(Outcome::Lose, EndReason::Showdown);
        } else if dealer_value < player_value {
            self.finish(Outcome::Win, EndReason::Showdown);
        } else {
            self.finish(Outcome::Push, EndReason::Showdown);
        }
    }
}
