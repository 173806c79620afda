//! A single shuffled deck.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::card::{Card, DECK_SIZE, Rank, Suit};
use crate::error::DeckError;

/// An ordered deck of unique cards.
///
/// Cards are stored bottom-first, so the top card is the last element and
/// dealing is a `pop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Builds all 52 cards and shuffles them with `rng`.
    ///
    /// The shuffle is a Fisher-Yates pass, so every ordering is equally
    /// likely given a uniform source.
    #[must_use]
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }

        cards.shuffle(rng);
        Self { cards }
    }

    /// Builds a deck that deals `draws` in the given order.
    ///
    /// The deck may hold fewer than 52 cards, which is how rounds with a
    /// known card sequence are set up.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::DuplicateCard`] if a card is listed twice.
    pub fn stacked<I>(draws: I) -> Result<Self, DeckError>
    where
        I: IntoIterator<Item = Card>,
    {
        let mut cards: Vec<Card> = draws.into_iter().collect();
        let mut seen = HashSet::with_capacity(cards.len());
        for card in &cards {
            if !seen.insert(card) {
                return Err(DeckError::DuplicateCard(card.clone()));
            }
        }

        cards.reverse();
        Ok(Self { cards })
    }

    /// Removes and returns the top card.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Exhausted`] when no cards remain.
    pub fn deal_one(&mut self) -> Result<Card, DeckError> {
        self.cards.pop().ok_or(DeckError::Exhausted)
    }

    /// Returns the number of cards left.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Returns whether the deck is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterates over the remaining cards from the top down.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter().rev()
    }
}
