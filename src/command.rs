//! Chat command grammar and plain-text replies.

use chrono::Utc;
use tracing::error;

use crate::daily::format_remaining;
use crate::error::{
    ActionError, DailyError, DealError, ParseError, SessionError, TableError, WagerError,
};
use crate::game::CardView;
use crate::player::PlayerId;
use crate::result::{EndReason, Outcome};
use crate::store::BalanceStore;
use crate::table::{Abandoned, RoundReport, Table};

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: char = '!';

const HELP: &str = "\
!blackjack <bet> (or !bj <bet>): start a round
!hit: draw a card
!stand (or !hold): end your turn
!daily: claim your daily reward
!balance: show your balance
!set daily_cooldown <minutes>: change the daily cooldown (admins only)";

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a round with the given wager.
    Blackjack {
        /// Wager as typed; the table rejects non-positive values.
        wager: i64,
    },
    /// Draw a card.
    Hit,
    /// End the player's turn.
    Stand,
    /// Claim the daily reward.
    Daily,
    /// Show the balance.
    Balance,
    /// Change a setting.
    Set {
        /// Setting name.
        key: String,
        /// New value.
        value: String,
    },
    /// List the commands.
    Help,
}

impl Command {
    /// Parses a chat line such as `!bj 50`. Command names are case
    /// insensitive.
    ///
    /// ```
    /// use bjbot::Command;
    ///
    /// assert_eq!(Command::parse("!bj 50", '!'), Ok(Command::Blackjack { wager: 50 }));
    /// assert_eq!(Command::parse("!HOLD", '!'), Ok(Command::Stand));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::NotACommand`] if the line lacks the prefix, or
    /// another [`ParseError`] for an unknown name or bad argument.
    pub fn parse(line: &str, prefix: char) -> Result<Self, ParseError> {
        let body = line
            .trim()
            .strip_prefix(prefix)
            .ok_or(ParseError::NotACommand)?;
        let mut words = body.split_whitespace();
        let name = words.next().ok_or(ParseError::NotACommand)?.to_lowercase();

        match name.as_str() {
            "blackjack" | "bj" => {
                let raw = words.next().ok_or(ParseError::MissingArgument("bet"))?;
                let wager = raw
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(raw.to_owned()))?;
                Ok(Self::Blackjack { wager })
            }
            "hit" => Ok(Self::Hit),
            "stand" | "hold" => Ok(Self::Stand),
            "daily" => Ok(Self::Daily),
            "balance" | "bal" => Ok(Self::Balance),
            "set" => {
                let key = words.next().ok_or(ParseError::MissingArgument("key"))?;
                let value = words.next().ok_or(ParseError::MissingArgument("value"))?;
                Ok(Self::Set {
                    key: key.to_lowercase(),
                    value: value.to_owned(),
                })
            }
            "help" => Ok(Self::Help),
            _ => Err(ParseError::UnknownCommand(name)),
        }
    }
}

/// Runs `command` for `player` and returns the reply to post.
pub async fn execute<S: BalanceStore>(
    table: &Table<S>,
    player: &PlayerId,
    command: Command,
) -> String {
    let reply = match command {
        Command::Blackjack { wager } => table
            .start_round(player, wager)
            .await
            .map(|report| render_round(&report)),
        Command::Hit => table.hit(player).await.map(|report| render_round(&report)),
        Command::Stand => table.stand(player).await.map(|report| render_round(&report)),
        Command::Daily => table.claim_daily(player, Utc::now()).await.map(|claim| {
            format!(
                "You claimed your daily reward of {}. Balance: {}.",
                claim.reward, claim.balance
            )
        }),
        Command::Balance => table
            .balance(player)
            .await
            .map(|balance| format!("Your balance is {balance}.")),
        Command::Set { key, value } => table
            .set_setting(player, &key, &value)
            .await
            .map(|()| format!("Set {key} to {value}.")),
        Command::Help => Ok(HELP.to_owned()),
    };

    reply.unwrap_or_else(|err| render_error(player, &err))
}

/// Renders a round report as a multi-line reply.
#[must_use]
pub fn render_round(report: &RoundReport) -> String {
    let snapshot = &report.snapshot;
    let player_cards = snapshot
        .player_cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let dealer_cards = snapshot
        .dealer
        .cards
        .iter()
        .map(|card| match card {
            CardView::Shown(card) => card.to_string(),
            CardView::Hidden => "[hidden]".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        format!("Your hand: {player_cards} ({})", snapshot.player_total),
        format!("Dealer: {dealer_cards} ({})", snapshot.dealer.total),
    ];

    let Some(settlement) = report.settlement else {
        lines.push(format!(
            "Bet: {}. Type !hit or !stand. Balance: {}.",
            snapshot.wager, report.balance
        ));
        return lines.join("\n");
    };

    let wager = settlement.wager;
    let net = settlement.net();
    let verdict = match (settlement.outcome, snapshot.end_reason) {
        (Outcome::PlayerBlackjack, _) => format!("Blackjack! You win {net}."),
        (Outcome::Win, Some(EndReason::DealerBust)) => format!("Dealer busts, you win {net}."),
        (Outcome::Win, _) => format!("You win {net}."),
        (Outcome::Lose, Some(EndReason::PlayerBust)) => format!("Bust! You lose {wager}."),
        (Outcome::Lose, _) => format!("Dealer wins, you lose {wager}."),
        (Outcome::Push, _) => format!("Push, your bet of {wager} is returned."),
    };
    lines.push(format!("{verdict} Balance: {}.", settlement.balance));
    lines.join("\n")
}

/// Renders the notice for a round released at shutdown, or `None` if
/// nothing was credited.
#[must_use]
pub fn render_shutdown(round: &Abandoned) -> Option<String> {
    (round.refunded > 0).then(|| {
        format!(
            "The bot is shutting down, {} was credited to your balance.",
            round.refunded
        )
    })
}

fn render_error(player: &PlayerId, err: &TableError) -> String {
    match err {
        TableError::Wager(WagerError::InvalidWager) => {
            "Your bet must be a positive number.".to_owned()
        }
        TableError::Wager(WagerError::InsufficientBalance { balance }) => {
            format!("You don't have enough currency for that bet. Balance: {balance}.")
        }
        TableError::Session(SessionError::DuplicateActiveGame) => {
            "You already have a game in progress. Finish it with !hit or !stand.".to_owned()
        }
        TableError::Session(SessionError::NoActiveGame) => {
            "You don't have a game in progress. Start one with !blackjack <bet>.".to_owned()
        }
        TableError::Action(ActionError::InvalidState) => "That round is already over.".to_owned(),
        TableError::Action(ActionError::DeckExhausted)
        | TableError::Deal(DealError::DeckExhausted | DealError::ZeroWager) => {
            "The dealer could not deal that round. Please try again.".to_owned()
        }
        TableError::Daily(DailyError::OnCooldown { remaining }) => format!(
            "You already claimed your daily reward. Try again in {}.",
            format_remaining(*remaining)
        ),
        TableError::RoundAborted { refunded } => format!(
            "The deck ran out, so the round was cancelled and your bet of {refunded} was refunded."
        ),
        TableError::PermissionDenied => "You are not allowed to change settings.".to_owned(),
        TableError::InvalidSetting(reason) => format!("Invalid setting: {reason}."),
        TableError::Store(store) => {
            error!(%player, %store, "balance store failed");
            "Something went wrong with the bank. Please try again later.".to_owned()
        }
    }
}
