//! Table rule and payout options.

use core::time::Duration;

use serde::Deserialize;

use crate::player::PlayerId;
use crate::store::DEFAULT_DAILY_COOLDOWN_MINUTES;

/// Rounding mode for fractional payouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round up.
    Up,
    /// Round down.
    #[default]
    Down,
    /// Round to nearest.
    Nearest,
}

/// What happens to the wager of a round that is dropped before it finishes,
/// either because the player went idle or the table is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonPolicy {
    /// The wager is kept by the house.
    #[default]
    Forfeit,
    /// The wager is returned.
    Refund,
}

/// Dealing rules applied by every [`Game`](crate::game::Game).
///
/// ```
/// use bjbot::RuleOptions;
///
/// let rules = RuleOptions::default()
///     .with_stand_on_soft_17(false)
///     .with_natural_push(true);
/// assert!(!rules.stand_on_soft_17);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuleOptions {
    /// Whether the dealer stands on soft 17. When `false` the dealer hits it.
    pub stand_on_soft_17: bool,
    /// Whether a player natural pushes against a dealer natural instead of
    /// paying as blackjack.
    pub natural_push: bool,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            stand_on_soft_17: true,
            natural_push: false,
        }
    }
}

impl RuleOptions {
    /// Sets whether the dealer stands on soft 17.
    #[must_use]
    pub const fn with_stand_on_soft_17(mut self, stand: bool) -> Self {
        self.stand_on_soft_17 = stand;
        self
    }

    /// Sets whether two naturals push.
    #[must_use]
    pub const fn with_natural_push(mut self, push: bool) -> Self {
        self.natural_push = push;
        self
    }
}

/// Settlement options applied when a round finishes.
///
/// ```
/// use bjbot::{PayoutOptions, RoundingMode};
///
/// let payouts = PayoutOptions::default()
///     .with_blackjack_pays(1.2)
///     .with_rounding_blackjack(RoundingMode::Nearest);
/// assert_eq!(payouts.blackjack_pays, 1.2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PayoutOptions {
    /// Blackjack winnings as a multiple of the wager (typically 1.5).
    pub blackjack_pays: f64,
    /// Rounding mode for blackjack winnings.
    pub rounding_blackjack: RoundingMode,
    /// Settlement for rounds dropped before they finish.
    pub abandon: AbandonPolicy,
}

impl Default for PayoutOptions {
    fn default() -> Self {
        Self {
            blackjack_pays: 1.5,
            rounding_blackjack: RoundingMode::Down,
            abandon: AbandonPolicy::Forfeit,
        }
    }
}

impl PayoutOptions {
    /// Sets the blackjack payout ratio.
    #[must_use]
    pub const fn with_blackjack_pays(mut self, pays: f64) -> Self {
        self.blackjack_pays = pays;
        self
    }

    /// Sets the rounding mode for blackjack payouts.
    #[must_use]
    pub const fn with_rounding_blackjack(mut self, mode: RoundingMode) -> Self {
        self.rounding_blackjack = mode;
        self
    }

    /// Sets the settlement for abandoned rounds.
    #[must_use]
    pub const fn with_abandon(mut self, policy: AbandonPolicy) -> Self {
        self.abandon = policy;
        self
    }
}

/// Configuration of a [`Table`](crate::table::Table).
///
/// ```
/// use core::time::Duration;
/// use bjbot::{PlayerId, RuleOptions, TableOptions};
///
/// let options = TableOptions::default()
///     .with_rules(RuleOptions::default().with_natural_push(true))
///     .with_daily_reward(500)
///     .with_idle_timeout(Duration::from_secs(60))
///     .with_admin(PlayerId::new("owner"));
/// assert!(options.is_admin(&PlayerId::new("owner")));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    /// Dealing rules.
    pub rules: RuleOptions,
    /// Settlement options.
    pub payouts: PayoutOptions,
    /// Currency credited by a daily claim.
    pub daily_reward: i64,
    /// Cooldown used when the stored setting is missing or invalid.
    pub default_daily_cooldown_minutes: u32,
    /// How long a round may sit without player action before it expires.
    pub idle_timeout: Duration,
    /// Players allowed to change settings.
    pub admins: Vec<PlayerId>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            rules: RuleOptions::default(),
            payouts: PayoutOptions::default(),
            daily_reward: 200,
            default_daily_cooldown_minutes: DEFAULT_DAILY_COOLDOWN_MINUTES,
            idle_timeout: Duration::from_secs(300),
            admins: Vec::new(),
        }
    }
}

impl TableOptions {
    /// Sets the dealing rules.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleOptions) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the settlement options.
    #[must_use]
    pub fn with_payouts(mut self, payouts: PayoutOptions) -> Self {
        self.payouts = payouts;
        self
    }

    /// Sets the daily reward.
    #[must_use]
    pub fn with_daily_reward(mut self, reward: i64) -> Self {
        self.daily_reward = reward;
        self
    }

    /// Sets the idle timeout.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Adds an admin.
    #[must_use]
    pub fn with_admin(mut self, player: PlayerId) -> Self {
        self.admins.push(player);
        self
    }

    /// Returns whether `player` may change settings.
    #[must_use]
    pub fn is_admin(&self, player: &PlayerId) -> bool {
        self.admins.contains(player)
    }
}
