//! Command-facing blackjack table.
//!
//! A [`Table`] owns the session registry and the shoe RNG and talks to a
//! [`BalanceStore`]. Every command locks the caller's seat first, so all of
//! a player's balance checks, deductions, and game mutations are serialized.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use crate::daily;
use crate::deck::Deck;
use crate::error::{ActionError, DailyError, SessionError, TableError, WagerError};
use crate::game::{Game, GameState, Snapshot};
use crate::options::{AbandonPolicy, TableOptions};
use crate::player::PlayerId;
use crate::result::{Settlement, settle};
use crate::session::{Seat, Sessions};
use crate::store::{BalanceStore, DAILY_COOLDOWN_KEY};

/// State of a round after a command, plus the settlement if it finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// The round as the player may see it.
    pub snapshot: Snapshot,
    /// Set when the command finished the round.
    pub settlement: Option<Settlement>,
    /// Player balance after the command.
    pub balance: i64,
}

/// Result of a daily claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyClaim {
    /// Amount credited.
    pub reward: i64,
    /// Balance after the credit.
    pub balance: i64,
}

/// A round dropped before the player finished it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abandoned {
    /// Owner of the round.
    pub player: PlayerId,
    /// Wager placed on the round.
    pub wager: u64,
    /// Amount credited back.
    pub refunded: u64,
}

fn to_delta(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

/// Single-player blackjack tables for every player of one bot.
pub struct Table<S> {
    store: S,
    sessions: Sessions,
    options: TableOptions,
    rng: Mutex<ChaCha20Rng>,
}

impl<S: BalanceStore> Table<S> {
    /// Creates a table that shuffles with `rng`.
    #[must_use]
    pub fn new(store: S, options: TableOptions, rng: ChaCha20Rng) -> Self {
        Self {
            store,
            sessions: Sessions::new(),
            options,
            rng: Mutex::new(rng),
        }
    }

    /// Creates a table whose shoe RNG is seeded from `seed`, or from the
    /// operating system when `None`.
    #[must_use]
    pub fn from_seed(store: S, options: TableOptions, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(ChaCha20Rng::from_os_rng, ChaCha20Rng::seed_from_u64);
        Self::new(store, options, rng)
    }

    /// Returns the balance store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the session registry.
    pub const fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Returns the table options.
    pub const fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Locks the player's seat, settling a finished round left behind by an
    /// earlier failed credit.
    async fn open_seat(&self, player: &PlayerId) -> Result<OwnedMutexGuard<Seat>, TableError> {
        let mut seat = self.sessions.lock(player).await;
        if seat.game().is_some_and(Game::is_finished) {
            self.settle_seat(&mut seat).await?;
        }
        Ok(seat)
    }

    /// Credits a finished round and releases it. The round stays seated if
    /// the credit fails.
    async fn settle_seat(&self, seat: &mut Seat) -> Result<Option<Settlement>, TableError> {
        let Some(game) = seat.game() else {
            return Ok(None);
        };
        let Some(outcome) = game.outcome() else {
            return Ok(None);
        };
        let player = game.player().clone();
        let wager = game.wager();

        let credited = settle(outcome, wager, &self.options.payouts);
        let balance = self.store.add_balance(&player, to_delta(credited)).await?;
        seat.release();

        info!(%player, ?outcome, wager, credited, balance, "round settled");
        Ok(Some(Settlement {
            outcome,
            wager,
            credited,
            balance,
        }))
    }

    async fn report(&self, seat: &mut Seat, player: &PlayerId) -> Result<RoundReport, TableError> {
        let snapshot = seat.game_mut()?.describe();
        if snapshot.state == GameState::Finished {
            let settlement = self.settle_seat(seat).await?;
            let balance = match settlement {
                Some(settlement) => settlement.balance,
                None => self.store.get_balance(player).await?,
            };
            return Ok(RoundReport {
                snapshot,
                settlement,
                balance,
            });
        }

        let balance = self.store.get_balance(player).await?;
        Ok(RoundReport {
            snapshot,
            settlement: None,
            balance,
        })
    }

    /// Refunds and releases a round that cannot continue.
    async fn abort(&self, seat: &mut Seat) -> Result<u64, TableError> {
        let game = seat.game_mut()?;
        let player = game.player().clone();
        let wager = game.wager();

        self.store.add_balance(&player, to_delta(wager)).await?;
        seat.release();
        error!(%player, wager, "deck exhausted mid-round, wager refunded");
        Ok(wager)
    }

    /// Validates and deducts `wager`, then deals a new round.
    ///
    /// A natural on the deal finishes and settles the round immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateActiveGame`] if a round is already in
    /// progress, [`WagerError`] if the wager is not positive or exceeds the
    /// balance, or a store error. No currency moves on error.
    pub async fn start_round(
        &self,
        player: &PlayerId,
        wager: i64,
    ) -> Result<RoundReport, TableError> {
        self.open_round(player, wager, None).await
    }

    /// Same as [`Table::start_round`], dealing from `deck` instead of a
    /// fresh shuffle.
    ///
    /// # Errors
    ///
    /// Same as [`Table::start_round`], plus
    /// [`DealError::DeckExhausted`](crate::error::DealError::DeckExhausted)
    /// for a deck too short for the deal.
    #[doc(hidden)]
    pub async fn start_round_with_deck(
        &self,
        player: &PlayerId,
        wager: i64,
        deck: Deck,
    ) -> Result<RoundReport, TableError> {
        self.open_round(player, wager, Some(deck)).await
    }

    async fn open_round(
        &self,
        player: &PlayerId,
        wager: i64,
        deck: Option<Deck>,
    ) -> Result<RoundReport, TableError> {
        let mut seat = self.open_seat(player).await?;
        if seat.is_active() {
            return Err(SessionError::DuplicateActiveGame.into());
        }

        let wager = u64::try_from(wager)
            .ok()
            .filter(|wager| *wager > 0)
            .ok_or(WagerError::InvalidWager)?;
        let balance = self.store.get_balance(player).await?;
        if balance < to_delta(wager) {
            return Err(WagerError::InsufficientBalance { balance }.into());
        }

        self.store.add_balance(player, -to_delta(wager)).await?;
        let dealt = match deck {
            Some(deck) => Game::with_deck(player.clone(), wager, self.options.rules, deck),
            None => {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                Game::new(player.clone(), wager, self.options.rules, &mut *rng)
            }
        };
        let game = match dealt {
            Ok(game) => game,
            Err(err) => {
                self.store.add_balance(player, to_delta(wager)).await?;
                return Err(err.into());
            }
        };

        info!(%player, wager, "round started");
        seat.begin(game, Instant::now())?;
        self.report(&mut seat, player).await
    }

    /// Draws a card for the player.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveGame`] without a round in progress,
    /// or [`TableError::RoundAborted`] if the deck ran out, in which case
    /// the wager has been refunded.
    pub async fn hit(&self, player: &PlayerId) -> Result<RoundReport, TableError> {
        let mut seat = self.open_seat(player).await?;
        let action = seat.game_mut()?.hit();
        match action {
            Ok(card) => debug!(%player, %card, "hit"),
            Err(ActionError::DeckExhausted) => {
                let refunded = self.abort(&mut seat).await?;
                return Err(TableError::RoundAborted { refunded });
            }
            Err(err) => return Err(err.into()),
        }

        seat.touch(Instant::now());
        self.report(&mut seat, player).await
    }

    /// Ends the player's turn; the dealer plays out and the round settles.
    ///
    /// # Errors
    ///
    /// Same as [`Table::hit`].
    pub async fn stand(&self, player: &PlayerId) -> Result<RoundReport, TableError> {
        let mut seat = self.open_seat(player).await?;
        let action = seat.game_mut()?.stand();
        match action {
            Ok(drawn) => debug!(%player, dealer_draws = drawn.len(), "stand"),
            Err(ActionError::DeckExhausted) => {
                let refunded = self.abort(&mut seat).await?;
                return Err(TableError::RoundAborted { refunded });
            }
            Err(err) => return Err(err.into()),
        }

        seat.touch(Instant::now());
        self.report(&mut seat, player).await
    }

    /// Returns the player's round in progress.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveGame`] without a round in progress.
    pub async fn describe(&self, player: &PlayerId) -> Result<Snapshot, TableError> {
        let seat = self.open_seat(player).await?;
        seat.game()
            .map(Game::describe)
            .ok_or_else(|| SessionError::NoActiveGame.into())
    }

    /// Returns the player's balance.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn balance(&self, player: &PlayerId) -> Result<i64, TableError> {
        Ok(self.store.get_balance(player).await?)
    }

    /// Credits the daily reward if the cooldown has elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`DailyError::OnCooldown`] with the time left, or a store
    /// error.
    pub async fn claim_daily(
        &self,
        player: &PlayerId,
        now: DateTime<Utc>,
    ) -> Result<DailyClaim, TableError> {
        let _seat = self.open_seat(player).await?;

        let raw = self.store.get_setting(DAILY_COOLDOWN_KEY).await?;
        let cooldown = daily::cooldown_from_setting(
            raw.as_deref(),
            self.options.default_daily_cooldown_minutes,
        );
        if let Some(last) = self.store.last_daily_claim(player).await? {
            if let Some(remaining) = daily::remaining(last, now, cooldown) {
                return Err(DailyError::OnCooldown { remaining }.into());
            }
        }

        let reward = self.options.daily_reward;
        let balance = self.store.record_daily_claim(player, now, reward).await?;
        info!(%player, reward, balance, "daily reward claimed");
        Ok(DailyClaim { reward, balance })
    }

    /// Changes a bot setting. Only `daily_cooldown` (minutes, > 0) exists.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::PermissionDenied`] unless `caller` is an admin,
    /// or [`TableError::InvalidSetting`] for an unknown key or bad value.
    pub async fn set_setting(
        &self,
        caller: &PlayerId,
        key: &str,
        value: &str,
    ) -> Result<(), TableError> {
        if !self.options.is_admin(caller) {
            warn!(%caller, key, "setting change refused");
            return Err(TableError::PermissionDenied);
        }

        match key {
            "daily_cooldown" => {
                let minutes = value
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|minutes| *minutes > 0)
                    .ok_or_else(|| {
                        TableError::InvalidSetting(format!(
                            "cooldown must be a positive number of minutes, got {value:?}"
                        ))
                    })?;
                self.store
                    .set_setting(DAILY_COOLDOWN_KEY, &minutes.to_string())
                    .await?;
                info!(%caller, minutes, "daily cooldown updated");
                Ok(())
            }
            other => Err(TableError::InvalidSetting(format!("unknown key {other:?}"))),
        }
    }

    /// Settles a dropped round by `policy` and releases it. The round stays
    /// seated if its credit fails.
    async fn abandon(
        &self,
        seat: &mut Seat,
        policy: AbandonPolicy,
    ) -> Result<Abandoned, TableError> {
        let game = seat.game_mut()?;
        let player = game.player().clone();
        let wager = game.wager();
        let owed = match (game.outcome(), policy) {
            (Some(outcome), _) => settle(outcome, wager, &self.options.payouts),
            (None, AbandonPolicy::Refund) => wager,
            (None, AbandonPolicy::Forfeit) => 0,
        };

        if owed > 0 {
            self.store.add_balance(&player, to_delta(owed)).await?;
        }
        seat.release();

        warn!(%player, wager, refunded = owed, ?policy, "round abandoned");
        Ok(Abandoned {
            player,
            wager,
            refunded: owed,
        })
    }

    async fn abandon_all(
        &self,
        seats: Vec<OwnedMutexGuard<Seat>>,
        policy: AbandonPolicy,
    ) -> Vec<Abandoned> {
        let mut abandoned = Vec::with_capacity(seats.len());
        for mut seat in seats {
            match self.abandon(&mut seat, policy).await {
                Ok(round) => abandoned.push(round),
                Err(err) => error!(%err, "failed to credit abandoned round, keeping it seated"),
            }
        }
        self.sessions.prune();
        abandoned
    }

    /// Releases rounds idle past the configured timeout and settles them by
    /// the configured [`AbandonPolicy`]. A round whose credit fails stays
    /// seated and is retried by the next sweep or command.
    pub async fn expire_idle(&self, now: Instant) -> Vec<Abandoned> {
        let seats = self
            .sessions
            .lock_idle(self.options.idle_timeout, now)
            .await;
        self.abandon_all(seats, self.options.payouts.abandon).await
    }

    /// Releases every round, refunding wagers still in play. Rounds whose
    /// credit fails stay seated.
    pub async fn shutdown(&self) -> Vec<Abandoned> {
        let seats = self.sessions.lock_active().await;
        let abandoned = self.abandon_all(seats, AbandonPolicy::Refund).await;
        info!(released = abandoned.len(), "table shut down");
        abandoned
    }
}
