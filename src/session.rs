//! Per-player session registry.
//!
//! Each player owns a [`Seat`] behind an async mutex. A command locks its
//! player's seat for its whole duration, store calls included, so commands
//! for one player run one at a time while different players never contend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::SessionError;
use crate::game::Game;
use crate::player::PlayerId;

/// A player's slot: at most one round in flight.
#[derive(Debug)]
pub struct Seat {
    game: Option<Game>,
    last_action: Instant,
}

impl Seat {
    fn new() -> Self {
        Self {
            game: None,
            last_action: Instant::now(),
        }
    }

    /// Returns the round held by the seat.
    #[must_use]
    pub const fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    /// Returns the round held by the seat for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveGame`] if the seat is empty.
    pub fn game_mut(&mut self) -> Result<&mut Game, SessionError> {
        self.game.as_mut().ok_or(SessionError::NoActiveGame)
    }

    /// Returns whether a round is held.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.game.is_some()
    }

    /// Seats a new round.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateActiveGame`] if a round is already
    /// held; the existing round is kept.
    pub fn begin(&mut self, game: Game, now: Instant) -> Result<(), SessionError> {
        if self.game.is_some() {
            return Err(SessionError::DuplicateActiveGame);
        }
        self.game = Some(game);
        self.last_action = now;
        Ok(())
    }

    /// Records player activity.
    pub const fn touch(&mut self, now: Instant) {
        self.last_action = now;
    }

    /// Removes and returns the held round.
    pub const fn release(&mut self) -> Option<Game> {
        self.game.take()
    }

    /// Returns how long the held round has been idle, if any.
    #[must_use]
    pub fn idle_for(&self, now: Instant) -> Option<Duration> {
        self.game
            .as_ref()
            .map(|_| now.saturating_duration_since(self.last_action))
    }
}

/// Registry of seats keyed by player.
#[derive(Debug, Default)]
pub struct Sessions {
    seats: DashMap<PlayerId, Arc<Mutex<Seat>>>,
}

impl Sessions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn seat(&self, player: &PlayerId) -> Arc<Mutex<Seat>> {
        // Clone the handle so no map guard is held across an await.
        self.seats
            .entry(player.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Seat::new())))
            .clone()
    }

    /// Locks the player's seat, creating it on first use.
    pub async fn lock(&self, player: &PlayerId) -> OwnedMutexGuard<Seat> {
        self.seat(player).lock_owned().await
    }

    fn handles(&self) -> Vec<(PlayerId, Arc<Mutex<Seat>>)> {
        self.seats
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    /// Returns the number of seats holding a round.
    pub async fn active_count(&self) -> usize {
        let mut count = 0;
        for (_, seat) in self.handles() {
            if seat.lock().await.is_active() {
                count += 1;
            }
        }
        count
    }

    /// Locks every seat whose round has been idle for at least `timeout`.
    ///
    /// Commands lock a single seat and never wait on another, so holding
    /// several of these guards at once cannot deadlock against them.
    pub async fn lock_idle(
        &self,
        timeout: Duration,
        now: Instant,
    ) -> Vec<OwnedMutexGuard<Seat>> {
        let mut idle = Vec::new();
        for (player, seat) in self.handles() {
            let seat = seat.lock_owned().await;
            if seat.idle_for(now).is_some_and(|idle| idle >= timeout) {
                debug!(%player, "seat idle");
                idle.push(seat);
            }
        }
        idle
    }

    /// Locks every seat holding a round.
    pub async fn lock_active(&self) -> Vec<OwnedMutexGuard<Seat>> {
        let mut active = Vec::new();
        for (_, seat) in self.handles() {
            let seat = seat.lock_owned().await;
            if seat.is_active() {
                active.push(seat);
            }
        }
        active
    }

    /// Drops empty seats nobody is using.
    pub fn prune(&self) {
        // A handle count of one means no command holds or awaits the seat,
        // and the shard lock held by `retain` keeps new ones out.
        self.seats.retain(|_, seat| {
            if Arc::strong_count(seat) > 1 {
                return true;
            }
            match seat.try_lock() {
                Ok(seat) => seat.is_active(),
                Err(_) => true,
            }
        });
    }

    /// Returns the number of seats in the registry, occupied or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Returns whether the registry holds no seats.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}
