//! Single-player blackjack tables with virtual currency for chat bots.
//!
//! The engine ([`Deck`], [`Hand`], [`Game`]) is synchronous and free of I/O.
//! A [`Table`] drives rounds for many players at once on top of a
//! [`BalanceStore`], which holds balances, daily claims, and bot settings.
//!
//! # Example
//!
//! ```
//! use bjbot::{Card, Deck, Game, GameState, PlayerId, Rank, RuleOptions, Suit};
//!
//! let deck = Deck::stacked([
//!     Card::new(Rank::Ten, Suit::Hearts),
//!     Card::new(Rank::Seven, Suit::Clubs),
//!     Card::new(Rank::Eight, Suit::Spades),
//!     Card::new(Rank::Ten, Suit::Diamonds),
//! ])
//! .unwrap();
//!
//! let mut game = Game::with_deck(PlayerId::new("42"), 10, RuleOptions::default(), deck).unwrap();
//! assert_eq!(game.state(), GameState::InProgress);
//! game.stand().unwrap();
//! assert!(game.is_finished());
//! ```

pub mod card;
pub mod command;
pub mod config;
pub mod daily;
pub mod deck;
pub mod error;
pub mod game;
pub mod hand;
pub mod options;
pub mod player;
pub mod result;
pub mod session;
pub mod store;
pub mod table;

pub use card::{Card, DECK_SIZE, Rank, Suit};
pub use command::Command;
pub use config::Config;
pub use deck::Deck;
pub use error::{
    ActionError, DailyError, DealError, DeckError, ParseError, SessionError, StoreError,
    TableError, WagerError,
};
pub use game::{CardView, DealerView, Game, GameState, Snapshot};
pub use hand::Hand;
pub use options::{AbandonPolicy, PayoutOptions, RoundingMode, RuleOptions, TableOptions};
pub use player::PlayerId;
pub use result::{EndReason, Outcome, Settlement, settle};
pub use session::{Seat, Sessions};
pub use store::{BalanceStore, MemoryStore, SqliteStore};
pub use table::{Abandoned, DailyClaim, RoundReport, Table};
