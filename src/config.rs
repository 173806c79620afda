//! Bot configuration file.

use core::time::Duration;

use serde::Deserialize;

use crate::options::{PayoutOptions, RuleOptions, TableOptions};
use crate::player::PlayerId;
use crate::store::DEFAULT_DAILY_COOLDOWN_MINUTES;

/// `database_url` value that selects the in-memory store.
pub const MEMORY_DATABASE: &str = "memory";

/// Configuration loaded from YAML. Every field has a default, so an empty
/// document is valid.
///
/// ```
/// use bjbot::Config;
///
/// let config = Config::from_yaml("log_level: debug\nadmins: [\"owner\"]\n").unwrap();
/// assert_eq!(config.log_level, "debug");
/// assert_eq!(config.idle_timeout_secs, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite URL, or `memory`.
    pub database_url: String,
    /// Maximum log level.
    pub log_level: String,
    /// Emit logs as JSON.
    pub json_logs: bool,
    /// Seed for the shoe RNG. Seeded from the OS when absent.
    pub seed: Option<u64>,
    /// Prefix of chat commands.
    pub prefix: char,
    /// Dealing rules.
    pub rules: RuleOptions,
    /// Settlement options, abandonment policy included.
    pub payouts: PayoutOptions,
    /// Currency credited by a daily claim.
    pub daily_reward: i64,
    /// Cooldown used when the stored setting is missing or invalid.
    pub default_daily_cooldown_minutes: u32,
    /// Seconds a round may sit idle before it expires.
    pub idle_timeout_secs: u64,
    /// Seconds between idle sweeps.
    pub sweep_interval_secs: u64,
    /// Players allowed to change settings.
    pub admins: Vec<PlayerId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://bjbot.db".to_owned(),
            log_level: "info".to_owned(),
            json_logs: false,
            seed: None,
            prefix: crate::command::DEFAULT_PREFIX,
            rules: RuleOptions::default(),
            payouts: PayoutOptions::default(),
            daily_reward: 200,
            default_daily_cooldown_minutes: DEFAULT_DAILY_COOLDOWN_MINUTES,
            idle_timeout_secs: 300,
            sweep_interval_secs: 30,
            admins: Vec::new(),
        }
    }
}

impl Config {
    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this model.
    pub fn from_yaml(document: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(document)
    }

    /// Returns whether the in-memory store was selected.
    #[must_use]
    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE
    }

    /// Returns the interval between idle sweeps, at least one second.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    /// Builds the options of the table.
    #[must_use]
    pub fn table_options(&self) -> TableOptions {
        let mut options = TableOptions::default()
            .with_rules(self.rules)
            .with_payouts(self.payouts)
            .with_daily_reward(self.daily_reward)
            .with_idle_timeout(Duration::from_secs(self.idle_timeout_secs));
        options.default_daily_cooldown_minutes = self.default_daily_cooldown_minutes;
        options.admins.clone_from(&self.admins);
        options
    }
}

#[cfg(test)]
mod tests {
    use crate::options::{AbandonPolicy, RoundingMode};

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn nested_options_are_read() {
        let config = Config::from_yaml(
            r"
database_url: memory
seed: 7
rules:
  stand_on_soft_17: false
payouts:
  blackjack_pays: 1.2
  rounding_blackjack: nearest
  abandon: refund
idle_timeout_secs: 60
sweep_interval_secs: 0
admins: ['100', '200']
",
        )
        .unwrap();

        assert!(config.uses_memory_store());
        assert_eq!(config.seed, Some(7));
        assert!(!config.rules.stand_on_soft_17);
        assert!(!config.rules.natural_push);
        assert_eq!(config.payouts.rounding_blackjack, RoundingMode::Nearest);
        assert_eq!(config.payouts.abandon, AbandonPolicy::Refund);
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));

        let options = config.table_options();
        assert_eq!(options.idle_timeout, Duration::from_secs(60));
        assert!(options.is_admin(&PlayerId::new("200")));
        assert!(!options.is_admin(&PlayerId::new("300")));
    }
}
