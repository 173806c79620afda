//! Table integration tests over the in-memory store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bjbot::command::execute;
use bjbot::store::DAILY_COOLDOWN_KEY;
use bjbot::{
    AbandonPolicy, BalanceStore, Card, CardView, Command, DailyError, DealError, Deck, GameState,
    MemoryStore, Outcome, PayoutOptions, PlayerId, Rank, RoundReport, SessionError, StoreError,
    Suit, Table, TableError, TableOptions, WagerError, settle,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

/// Memory store whose credits and claim writes can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_credits: AtomicBool,
    fail_claims: AtomicBool,
}

impl FlakyStore {
    fn fail_credits(&self, fail: bool) {
        self.fail_credits.store(fail, Ordering::SeqCst);
    }

    fn fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }
}

fn unavailable() -> StoreError {
    StoreError::Database("connection reset".to_owned())
}

#[async_trait]
impl BalanceStore for FlakyStore {
    async fn get_balance(&self, player: &PlayerId) -> Result<i64, StoreError> {
        self.inner.get_balance(player).await
    }

    async fn add_balance(&self, player: &PlayerId, delta: i64) -> Result<i64, StoreError> {
        if delta > 0 && self.fail_credits.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.add_balance(player, delta).await
    }

    async fn last_daily_claim(
        &self,
        player: &PlayerId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.inner.last_daily_claim(player).await
    }

    async fn set_last_daily_claim(
        &self,
        player: &PlayerId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.set_last_daily_claim(player, at).await
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_setting(key).await
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set_setting(key, value).await
    }
}

fn table(options: TableOptions) -> Table<MemoryStore> {
    Table::from_seed(MemoryStore::new(), options, Some(2024))
}

fn flaky_table(options: TableOptions) -> Table<FlakyStore> {
    Table::from_seed(FlakyStore::default(), options, Some(2024))
}

async fn fund<S: BalanceStore>(table: &Table<S>, player: &PlayerId, amount: i64) {
    table.store().add_balance(player, amount).await.unwrap();
}

const fn card(rank: Rank, suit: Suit) -> Card {
    Card::new(rank, suit)
}

/// Player 18 against dealer 12, with `rest` left for the dealer.
fn eighteen_against_twelve(rest: &[Card]) -> Deck {
    let mut draws = vec![
        card(Rank::Ten, Suit::Spades),
        card(Rank::Ten, Suit::Hearts),
        card(Rank::Eight, Suit::Clubs),
        card(Rank::Two, Suit::Clubs),
    ];
    draws.extend_from_slice(rest);
    Deck::stacked(draws).unwrap()
}

/// Starts rounds until one is still in progress after the deal.
async fn open_round<S: BalanceStore>(
    table: &Table<S>,
    player: &PlayerId,
    wager: i64,
) -> RoundReport {
    for _ in 0..50 {
        let report = table.start_round(player, wager).await.unwrap();
        if report.settlement.is_none() {
            return report;
        }
    }
    panic!("every deal was a natural");
}

#[tokio::test]
async fn wager_must_be_positive_and_covered() {
    let table = table(TableOptions::default());
    let player = PlayerId::new("1");

    assert_eq!(
        table.start_round(&player, 10).await.unwrap_err(),
        TableError::Wager(WagerError::InsufficientBalance { balance: 0 })
    );

    fund(&table, &player, 50).await;
    assert_eq!(
        table.start_round(&player, 0).await.unwrap_err(),
        TableError::Wager(WagerError::InvalidWager)
    );
    assert_eq!(
        table.start_round(&player, -5).await.unwrap_err(),
        TableError::Wager(WagerError::InvalidWager)
    );
    assert_eq!(
        table.start_round(&player, 51).await.unwrap_err(),
        TableError::Wager(WagerError::InsufficientBalance { balance: 50 })
    );
    assert_eq!(table.balance(&player).await.unwrap(), 50);
    assert_eq!(table.sessions().active_count().await, 0);
}

#[tokio::test]
async fn second_round_is_refused_while_one_is_open() {
    let table = table(TableOptions::default());
    let player = PlayerId::new("1");
    fund(&table, &player, 10_000).await;

    let open = open_round(&table, &player, 100).await;
    assert_eq!(open.snapshot.state, GameState::InProgress);

    assert_eq!(
        table.start_round(&player, 100).await.unwrap_err(),
        TableError::Session(SessionError::DuplicateActiveGame)
    );
    assert_eq!(table.balance(&player).await.unwrap(), open.balance);
    assert_eq!(table.sessions().active_count().await, 1);
}

#[tokio::test]
async fn stand_settles_and_frees_the_seat() {
    let table = table(TableOptions::default());
    let player = PlayerId::new("1");
    fund(&table, &player, 10_000).await;

    let open = open_round(&table, &player, 100).await;
    assert!(open.snapshot.dealer.hole_hidden);

    let done = table.stand(&player).await.unwrap();
    let settlement = done.settlement.unwrap();
    assert_eq!(done.snapshot.state, GameState::Finished);
    assert_eq!(
        settlement.credited,
        settle(settlement.outcome, 100, &PayoutOptions::default())
    );
    assert_eq!(settlement.balance, open.balance + settlement.net() + 100);
    assert_eq!(done.balance, settlement.balance);
    assert_eq!(table.balance(&player).await.unwrap(), settlement.balance);

    assert_eq!(
        table.hit(&player).await.unwrap_err(),
        TableError::Session(SessionError::NoActiveGame)
    );
    assert_eq!(
        table.stand(&player).await.unwrap_err(),
        TableError::Session(SessionError::NoActiveGame)
    );
}

#[tokio::test]
async fn hitting_until_the_round_ends_settles_once() {
    let table = table(TableOptions::default());
    let player = PlayerId::new("1");
    fund(&table, &player, 10_000).await;
    let open = open_round(&table, &player, 40).await;

    let mut report = table.hit(&player).await.unwrap();
    while report.settlement.is_none() {
        assert!(report.snapshot.player_total <= 21);
        report = table.hit(&player).await.unwrap();
    }

    let settlement = report.settlement.unwrap();
    assert_eq!(report.snapshot.state, GameState::Finished);
    assert!(report.snapshot.player_total > 21);
    assert_eq!(settlement.credited, 0);
    assert_eq!(table.balance(&player).await.unwrap(), open.balance);
}

#[tokio::test]
async fn describe_shows_only_the_open_round() {
    let table = table(TableOptions::default());
    let player = PlayerId::new("1");

    assert_eq!(
        table.describe(&player).await.unwrap_err(),
        TableError::Session(SessionError::NoActiveGame)
    );

    fund(&table, &player, 10_000).await;
    let open = open_round(&table, &player, 10).await;
    let snapshot = table.describe(&player).await.unwrap();
    assert_eq!(snapshot, open.snapshot);
    assert_eq!(snapshot.dealer.cards[1], CardView::Hidden);
}

#[tokio::test]
async fn daily_reward_respects_the_cooldown() {
    let table = table(TableOptions::default());
    let player = PlayerId::new("1");
    let morning = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

    let first = table.claim_daily(&player, morning).await.unwrap();
    assert_eq!(first.reward, 200);
    assert_eq!(first.balance, 200);

    assert_eq!(
        table
            .claim_daily(&player, morning + TimeDelta::minutes(30))
            .await
            .unwrap_err(),
        TableError::Daily(DailyError::OnCooldown {
            remaining: Duration::from_secs(90 * 60)
        })
    );

    let second = table
        .claim_daily(&player, morning + TimeDelta::hours(2))
        .await
        .unwrap();
    assert_eq!(second.balance, 400);
}

#[tokio::test]
async fn daily_cooldown_follows_the_stored_setting() {
    let table = table(TableOptions::default().with_daily_reward(50));
    let player = PlayerId::new("1");
    let morning = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

    table
        .store()
        .set_setting(DAILY_COOLDOWN_KEY, "10")
        .await
        .unwrap();
    table.claim_daily(&player, morning).await.unwrap();
    let again = table
        .claim_daily(&player, morning + TimeDelta::minutes(11))
        .await
        .unwrap();
    assert_eq!(again.balance, 100);

    table
        .store()
        .set_setting(DAILY_COOLDOWN_KEY, "not a number")
        .await
        .unwrap();
    assert!(matches!(
        table
            .claim_daily(&player, morning + TimeDelta::minutes(30))
            .await,
        Err(TableError::Daily(DailyError::OnCooldown { .. }))
    ));
}

#[tokio::test]
async fn only_admins_change_the_cooldown() {
    let admin = PlayerId::new("owner");
    let table = table(TableOptions::default().with_admin(admin.clone()));

    assert_eq!(
        table
            .set_setting(&PlayerId::new("1"), "daily_cooldown", "30")
            .await
            .unwrap_err(),
        TableError::PermissionDenied
    );
    for bad in ["0", "-3", "soon"] {
        assert!(matches!(
            table.set_setting(&admin, "daily_cooldown", bad).await,
            Err(TableError::InvalidSetting(_))
        ));
    }
    assert!(matches!(
        table.set_setting(&admin, "payout", "3").await,
        Err(TableError::InvalidSetting(_))
    ));

    table
        .set_setting(&admin, "daily_cooldown", "45")
        .await
        .unwrap();
    assert_eq!(
        table
            .store()
            .get_setting(DAILY_COOLDOWN_KEY)
            .await
            .unwrap()
            .as_deref(),
        Some("45")
    );
}

#[tokio::test]
async fn idle_rounds_are_forfeited_by_default() {
    let table = table(TableOptions::default().with_idle_timeout(Duration::from_secs(60)));
    let player = PlayerId::new("1");
    fund(&table, &player, 10_000).await;
    let open = open_round(&table, &player, 100).await;

    assert!(table.expire_idle(Instant::now()).await.is_empty());

    let expired = table
        .expire_idle(Instant::now() + Duration::from_secs(120))
        .await;
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].player, player);
    assert_eq!(expired[0].wager, 100);
    assert_eq!(expired[0].refunded, 0);
    assert_eq!(table.balance(&player).await.unwrap(), open.balance);
    assert_eq!(
        table.hit(&player).await.unwrap_err(),
        TableError::Session(SessionError::NoActiveGame)
    );
}

#[tokio::test]
async fn idle_rounds_can_be_refunded() {
    let options = TableOptions::default()
        .with_idle_timeout(Duration::from_secs(60))
        .with_payouts(PayoutOptions::default().with_abandon(AbandonPolicy::Refund));
    let table = table(options);
    let player = PlayerId::new("1");
    fund(&table, &player, 10_000).await;
    let open = open_round(&table, &player, 100).await;

    let expired = table
        .expire_idle(Instant::now() + Duration::from_secs(120))
        .await;
    assert_eq!(expired[0].refunded, 100);
    assert_eq!(table.balance(&player).await.unwrap(), open.balance + 100);
    assert_eq!(table.sessions().active_count().await, 0);
}

#[tokio::test]
async fn shutdown_refunds_every_open_round() {
    let table = table(TableOptions::default());
    let alice = PlayerId::new("alice");
    let bob = PlayerId::new("bob");
    fund(&table, &alice, 10_000).await;
    fund(&table, &bob, 10_000).await;
    let alice_open = open_round(&table, &alice, 30).await;
    let bob_open = open_round(&table, &bob, 70).await;

    let mut released = table.shutdown().await;
    released.sort_by(|a, b| a.player.cmp(&b.player));
    assert_eq!(released.len(), 2);
    assert_eq!(released[0].refunded, 30);
    assert_eq!(released[1].refunded, 70);

    assert_eq!(table.balance(&alice).await.unwrap(), alice_open.balance + 30);
    assert_eq!(table.balance(&bob).await.unwrap(), bob_open.balance + 70);
    assert_eq!(table.sessions().active_count().await, 0);
}

#[tokio::test]
async fn replies_are_plain_text() {
    let table = table(TableOptions::default());
    let player = PlayerId::new("1");

    assert_eq!(
        execute(&table, &player, Command::Balance).await,
        "Your balance is 0."
    );
    assert!(
        execute(&table, &player, Command::Hit)
            .await
            .contains("don't have a game in progress")
    );
    assert!(
        execute(&table, &player, Command::Blackjack { wager: 5 })
            .await
            .contains("Balance: 0")
    );
    assert!(
        execute(&table, &player, Command::Daily)
            .await
            .starts_with("You claimed your daily reward of 200")
    );
}

#[tokio::test]
async fn deck_running_out_aborts_and_refunds() {
    let table = table(TableOptions::default());
    let player = PlayerId::new("1");
    fund(&table, &player, 1_000).await;

    let open = table
        .start_round_with_deck(&player, 100, eighteen_against_twelve(&[]))
        .await
        .unwrap();
    assert_eq!(open.snapshot.state, GameState::InProgress);
    assert_eq!(open.balance, 900);

    assert_eq!(
        table.stand(&player).await.unwrap_err(),
        TableError::RoundAborted { refunded: 100 }
    );
    assert_eq!(table.balance(&player).await.unwrap(), 1_000);
    assert_eq!(
        table.describe(&player).await.unwrap_err(),
        TableError::Session(SessionError::NoActiveGame)
    );

    table
        .start_round_with_deck(&player, 50, eighteen_against_twelve(&[]))
        .await
        .unwrap();
    assert_eq!(
        table.hit(&player).await.unwrap_err(),
        TableError::RoundAborted { refunded: 50 }
    );
    assert_eq!(table.balance(&player).await.unwrap(), 1_000);
    assert_eq!(table.sessions().active_count().await, 0);
}

#[tokio::test]
async fn short_deck_refunds_the_wager_before_the_deal() {
    let table = table(TableOptions::default());
    let player = PlayerId::new("1");
    fund(&table, &player, 1_000).await;

    let deck = Deck::stacked([
        card(Rank::Two, Suit::Hearts),
        card(Rank::Three, Suit::Hearts),
        card(Rank::Four, Suit::Hearts),
    ])
    .unwrap();
    assert_eq!(
        table
            .start_round_with_deck(&player, 100, deck)
            .await
            .unwrap_err(),
        TableError::Deal(DealError::DeckExhausted)
    );
    assert_eq!(table.balance(&player).await.unwrap(), 1_000);
    assert_eq!(table.sessions().active_count().await, 0);
}

#[tokio::test]
async fn failed_payout_is_retried_by_the_next_command() {
    let table = flaky_table(TableOptions::default());
    let player = PlayerId::new("1");
    fund(&table, &player, 1_000).await;

    let deck = eighteen_against_twelve(&[card(Rank::Five, Suit::Diamonds)]);
    table
        .start_round_with_deck(&player, 100, deck)
        .await
        .unwrap();

    table.store().fail_credits(true);
    assert!(matches!(
        table.stand(&player).await,
        Err(TableError::Store(_))
    ));
    assert_eq!(table.balance(&player).await.unwrap(), 900);
    assert_eq!(table.sessions().active_count().await, 1);

    table.store().fail_credits(false);
    assert_eq!(
        table.describe(&player).await.unwrap_err(),
        TableError::Session(SessionError::NoActiveGame)
    );
    assert_eq!(table.balance(&player).await.unwrap(), 1_100);
    assert_eq!(table.sessions().active_count().await, 0);
}

#[tokio::test]
async fn stacked_deck_stand_pays_the_win() {
    let table = flaky_table(TableOptions::default());
    let player = PlayerId::new("1");
    fund(&table, &player, 1_000).await;

    let deck = eighteen_against_twelve(&[card(Rank::Five, Suit::Diamonds)]);
    table
        .start_round_with_deck(&player, 100, deck)
        .await
        .unwrap();
    let done = table.stand(&player).await.unwrap();
    let settlement = done.settlement.unwrap();
    assert_eq!(settlement.outcome, Outcome::Win);
    assert_eq!(settlement.credited, 200);
    assert_eq!(settlement.balance, 1_100);
}

#[tokio::test]
async fn failed_idle_refund_stays_seated_until_a_later_sweep() {
    let options = TableOptions::default()
        .with_idle_timeout(Duration::from_secs(60))
        .with_payouts(PayoutOptions::default().with_abandon(AbandonPolicy::Refund));
    let table = flaky_table(options);
    let player = PlayerId::new("1");
    fund(&table, &player, 1_000).await;
    table
        .start_round_with_deck(&player, 100, eighteen_against_twelve(&[]))
        .await
        .unwrap();

    table.store().fail_credits(true);
    let expired = table
        .expire_idle(Instant::now() + Duration::from_secs(120))
        .await;
    assert!(expired.is_empty());
    assert_eq!(table.sessions().active_count().await, 1);
    assert_eq!(table.balance(&player).await.unwrap(), 900);

    table.store().fail_credits(false);
    let expired = table
        .expire_idle(Instant::now() + Duration::from_secs(240))
        .await;
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].refunded, 100);
    assert_eq!(table.balance(&player).await.unwrap(), 1_000);
    assert_eq!(table.sessions().active_count().await, 0);
}

#[tokio::test]
async fn failed_shutdown_refund_keeps_the_round() {
    let table = flaky_table(TableOptions::default());
    let player = PlayerId::new("1");
    fund(&table, &player, 1_000).await;
    table
        .start_round_with_deck(&player, 100, eighteen_against_twelve(&[]))
        .await
        .unwrap();

    table.store().fail_credits(true);
    assert!(table.shutdown().await.is_empty());
    assert_eq!(table.sessions().active_count().await, 1);

    table.store().fail_credits(false);
    let released = table.shutdown().await;
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].refunded, 100);
    assert_eq!(table.balance(&player).await.unwrap(), 1_000);
    assert!(table.sessions().is_empty());
}

#[tokio::test]
async fn daily_reward_is_not_granted_when_the_claim_cannot_be_recorded() {
    let table = flaky_table(TableOptions::default());
    let player = PlayerId::new("1");
    let morning = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

    table.store().fail_claims(true);
    assert!(matches!(
        table.claim_daily(&player, morning).await,
        Err(TableError::Store(_))
    ));
    assert_eq!(table.balance(&player).await.unwrap(), 0);

    table.store().fail_claims(false);
    assert_eq!(
        table.claim_daily(&player, morning).await.unwrap().balance,
        200
    );
    assert!(matches!(
        table
            .claim_daily(&player, morning + TimeDelta::minutes(1))
            .await,
        Err(TableError::Daily(DailyError::OnCooldown { .. }))
    ));
    assert_eq!(table.balance(&player).await.unwrap(), 200);
}
