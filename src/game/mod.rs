//! Single-round game engine.

use rand::Rng;
use tracing::debug;

use crate::card::Card;
use crate::deck::Deck;
use crate::error::DealError;
use crate::hand::Hand;
use crate::options::RuleOptions;
use crate::player::PlayerId;
use crate::result::{EndReason, Outcome};

mod actions;
mod dealer;
pub mod state;

pub use state::{CardView, DealerView, GameState, Snapshot};

/// One round of blackjack between a player and the dealer.
///
/// The game owns its deck and both hands. The wager is recorded for
/// settlement but never touches a balance: callers deduct it before the game
/// is created and settle it from the [`Outcome`] afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// Owner of the round.
    player: PlayerId,
    /// Wager placed on the round.
    wager: u64,
    /// Dealing rules.
    rules: RuleOptions,
    /// Cards not yet dealt.
    deck: Deck,
    /// Player's hand.
    player_hand: Hand,
    /// Dealer's hand; the second card is the hole card.
    dealer_hand: Hand,
    /// Current lifecycle state.
    state: GameState,
    /// Outcome, set exactly once on finishing.
    outcome: Option<Outcome>,
    /// How the round ended.
    end_reason: Option<EndReason>,
}

impl Game {
    /// Shuffles a fresh deck with `rng` and deals the opening hands.
    ///
    /// # Example
    ///
    /// ```
    /// use bjbot::{Game, GameState, RuleOptions};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// let mut rng = ChaCha8Rng::seed_from_u64(42);
    /// let game = Game::new("alice".into(), 10, RuleOptions::default(), &mut rng).unwrap();
    /// assert_eq!(game.player_hand().len(), 2);
    /// assert!(matches!(game.state(), GameState::InProgress | GameState::Finished));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`DealError::ZeroWager`] if `wager` is zero.
    pub fn new<R: Rng + ?Sized>(
        player: PlayerId,
        wager: u64,
        rules: RuleOptions,
        rng: &mut R,
    ) -> Result<Self, DealError> {
        Self::with_deck(player, wager, rules, Deck::new(rng))
    }

    /// Deals the opening hands from a prepared deck.
    ///
    /// Cards go player, dealer, player, dealer. A player natural finishes
    /// the round on the spot.
    ///
    /// # Errors
    ///
    /// Returns [`DealError::ZeroWager`] if `wager` is zero, or
    /// [`DealError::DeckExhausted`] if the deck holds fewer than four cards.
    pub fn with_deck(
        player: PlayerId,
        wager: u64,
        rules: RuleOptions,
        mut deck: Deck,
    ) -> Result<Self, DealError> {
        if wager == 0 {
            return Err(DealError::ZeroWager);
        }
        if deck.remaining() < 4 {
            return Err(DealError::DeckExhausted);
        }

        let mut player_hand = Hand::new();
        let mut dealer_hand = Hand::new();
        for _ in 0..2 {
            player_hand.add_card(deck.deal_one().map_err(|_| DealError::DeckExhausted)?);
            dealer_hand.add_card(deck.deal_one().map_err(|_| DealError::DeckExhausted)?);
        }

        let mut game = Self {
            player,
            wager,
            rules,
            deck,
            player_hand,
            dealer_hand,
            state: GameState::InProgress,
            outcome: None,
            end_reason: None,
        };

        if game.player_hand.is_blackjack() {
            if game.rules.natural_push && game.dealer_hand.is_blackjack() {
                game.finish(Outcome::Push, EndReason::Natural);
            } else {
                game.finish(Outcome::PlayerBlackjack, EndReason::Natural);
            }
        }

        debug!(
            player = %game.player,
            wager,
            player_total = game.player_hand.total_value(),
            state = ?game.state,
            "dealt opening hands"
        );
        Ok(game)
    }

    /// Moves the round to [`GameState::Finished`].
    fn finish(&mut self, outcome: Outcome, reason: EndReason) {
        debug!(player = %self.player, ?outcome, ?reason, "round finished");
        self.state = GameState::Finished;
        self.outcome = Some(outcome);
        self.end_reason = Some(reason);
    }

    /// Returns the owner of the round.
    #[must_use]
    pub const fn player(&self) -> &PlayerId {
        &self.player
    }

    /// Returns the wager.
    #[must_use]
    pub const fn wager(&self) -> u64 {
        self.wager
    }

    /// Returns the dealing rules.
    #[must_use]
    pub const fn rules(&self) -> &RuleOptions {
        &self.rules
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> GameState {
        self.state
    }

    /// Returns the outcome, set once the round is finished.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Returns how the round ended, set once the round is finished.
    #[must_use]
    pub const fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Returns whether the round is over.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == GameState::Finished
    }

    /// Returns the player's hand.
    #[must_use]
    pub const fn player_hand(&self) -> &Hand {
        &self.player_hand
    }

    /// Returns the dealer's full hand, hole card included.
    #[must_use]
    pub const fn dealer_hand(&self) -> &Hand {
        &self.dealer_hand
    }

    /// Returns the number of cards left in the deck.
    #[must_use]
    pub fn cards_remaining(&self) -> usize {
        self.deck.remaining()
    }

    /// Projects the round for display.
    ///
    /// While the round is in progress only the dealer's up card is shown and
    /// the dealer total counts that card alone.
    #[must_use]
    pub fn describe(&self) -> Snapshot {
        let hole_hidden = self.state == GameState::InProgress;
        let dealer = if hole_hidden {
            let cards = self
                .dealer_hand
                .cards()
                .iter()
                .enumerate()
                .map(|(index, card)| {
                    if index == 0 {
                        CardView::Shown(card.clone())
                    } else {
                        CardView::Hidden
                    }
                })
                .collect();
            DealerView {
                cards,
                total: self.dealer_hand.up_card().map_or(0, Card::value),
                hole_hidden,
            }
        } else {
            DealerView {
                cards: self
                    .dealer_hand
                    .cards()
                    .iter()
                    .cloned()
                    .map(CardView::Shown)
                    .collect(),
                total: self.dealer_hand.total_value(),
                hole_hidden,
            }
        };

        Snapshot {
            player: self.player.clone(),
            wager: self.wager,
            player_cards: self.player_hand.cards().to_vec(),
            player_total: self.player_hand.total_value(),
            dealer,
            state: self.state,
            outcome: self.outcome,
            end_reason: self.end_reason,
        }
    }
}
