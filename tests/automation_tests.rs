// ============================================================================
// AUTOMATION TESTS
// ============================================================================
//
// Full webhook invocations against a mocked contract, market and alert relay.
//
// Run with: cargo test --test automation_tests


use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ace_automation::automation::store::{minute_of, EXECUTED_KEY, LAST_ATTEMPT_KEY};
use ace_automation::{
    AdvanceAutomation, AutomationConfig, AutomationSettings, BracketWidth, GuardDecision,
    KeyValueStore, MemoryStore, RunOutcome,
};
use test_helpers::*;

const NOW: u64 = 1_700_000_010;

struct Harness {
    contract: Arc<MockContract>,
    market: Arc<MockMarket>,
    alerts: Arc<RecordingAlerts>,
    store: Arc<MemoryStore>,
    automation: AdvanceAutomation,
}

fn harness(width: BracketWidth, contract: MockContract, market: MockMarket) -> Harness {
    let contract = Arc::new(contract);
    let market = Arc::new(market);
    let alerts = Arc::new(RecordingAlerts::default());
    let store = Arc::new(MemoryStore::new());
    let settings = AutomationSettings {
        width,
        listing_limit: 150,
        min_interval_secs: 480,
        network: "sepolia".to_string(),
    };
    let automation = AdvanceAutomation::new(
        settings,
        contract.clone(),
        market.clone(),
        alerts.clone(),
        store.clone(),
    )
    .with_seed(42);
    Harness { contract, market, alerts, store, automation }
}

/// Quotes for every listed coin plus the round-1 test game
fn priced_market() -> MockMarket {
    MockMarket::with_quotes(&[
        ("BTC", quote(BTC, 110.0, None)),
        ("ETH", quote(ETH, 180.0, None)),
        ("SOL", quote(5426, 150.0, None)),
        ("XRP", quote(52, 0.5, None)),
        ("USDT", quote(825, 1.0, None)),
        ("DOGE", quote(74, 0.2, None)),
        ("ADA", quote(2010, 0.4, None)),
        ("AVAX", quote(5805, 30.0, None)),
        ("LINK", quote(1975, 14.0, None)),
        ("TRX", quote(1958, 0.15, None)),
    ])
}

fn round_one_game(game_id: u64) -> ace_automation::BracketGame {
    game(
        game_id,
        1,
        8,
        &[("BTC", usd(100)), ("ETH", usd(200)), ("SOL", usd(100)), ("XRP", usd(1))],
    )
}

#[tokio::test]
async fn test_ready_game_and_new_game_are_submitted_together() {
    let blocked = game(6, 1, 8, &[("BTC", usd(100)), ("ZZZ", usd(1)), ("SOL", usd(100)), ("XRP", usd(1))]);
    let h = harness(
        BracketWidth::Eight,
        MockContract::with_games(vec![round_one_game(5), blocked]),
        priced_market(),
    );

    let outcome = h.automation.run(NOW).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Submitted { tx_hash: format!("0xtx{}", minute_of(NOW)), advanced: 1, new_game: true }
    );

    let submissions = h.contract.submissions.lock().clone();
    assert_eq!(submissions.len(), 1);
    let submission = &submissions[0];
    assert_eq!(submission.timestamp, minute_of(NOW));

    let batch = submission.update.as_ref().unwrap();
    assert_eq!(batch.game_ids, vec![5, 0, 0, 0]);
    assert_eq!(batch.winners[0], vec![BTC, 5426, 0, 0, 0, 0, 0, 0]);
    assert_eq!(batch.prices_winners[0][..2], [usd(110), usd(150)]);
    assert_eq!(batch.prices[0][..4], [usd(110), usd(180), usd(150), 50_000_000]);

    let new_game = submission.new_game.as_ref().unwrap();
    let symbols: HashSet<&str> = new_game.active_symbols().collect();
    assert_eq!(symbols.len(), 8);
    assert!(!symbols.contains("USDT"));

    assert_eq!(h.store.get_number(EXECUTED_KEY).await.unwrap(), Some(minute_of(NOW)));
    assert!(h.alerts.messages().is_empty());
}

#[tokio::test]
async fn test_repeated_and_early_triggers_are_skipped() {
    let h = harness(BracketWidth::Eight, MockContract::with_games(vec![round_one_game(5)]), priced_market());
    let minute = minute_of(NOW);

    assert!(matches!(h.automation.run(NOW).await.unwrap(), RunOutcome::Submitted { .. }));
    assert_eq!(
        h.automation.run(NOW + 5).await.unwrap(),
        RunOutcome::Skipped(GuardDecision::AlreadyExecuted { minute })
    );
    assert!(matches!(
        h.automation.run(NOW + 120).await.unwrap(),
        RunOutcome::Skipped(GuardDecision::TooRecent { .. })
    ));
    assert!(matches!(h.automation.run(NOW + 600).await.unwrap(), RunOutcome::Submitted { .. }));
    assert_eq!(h.contract.submissions.lock().len(), 2);
}

#[tokio::test]
async fn test_price_failure_aborts_and_alerts() {
    let market = MockMarket { fail_quotes: true, ..priced_market() };
    let h = harness(BracketWidth::Eight, MockContract::with_games(vec![round_one_game(5)]), market);

    let outcome = h.automation.run(NOW).await.unwrap();
    assert_eq!(outcome, RunOutcome::Aborted("Failed to fetch prices".to_string()));
    assert_eq!(h.alerts.messages(), vec!["Failed to fetch prices on sepolia"]);
    assert!(h.contract.submissions.lock().is_empty());

    assert_eq!(h.store.get_number(EXECUTED_KEY).await.unwrap(), None);
    assert_eq!(h.store.get_number(LAST_ATTEMPT_KEY).await.unwrap(), Some(minute_of(NOW)));
}

#[tokio::test]
async fn test_submission_failure_is_alerted_with_short_reason() {
    let contract = MockContract { fail_submit: true, ..MockContract::with_games(vec![round_one_game(5)]) };
    let h = harness(BracketWidth::Eight, contract, priced_market());

    let outcome = h.automation.run(NOW).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Aborted(_)));

    let messages = h.alerts.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Failed to perform games: "));
    assert!(messages[0].contains("round not finished"));
    assert!(!messages[0].contains("links.ethers.org"));
    assert!(messages[0].ends_with(" on sepolia"));
    assert_eq!(h.store.get_number(EXECUTED_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_unreadable_contract_aborts() {
    let contract = MockContract { fail_reads: true, ..Default::default() };
    let h = harness(BracketWidth::Eight, contract, priced_market());

    let outcome = h.automation.run(NOW).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Aborted(_)));
    assert_eq!(h.alerts.messages(), vec!["Failed to fetch active games on sepolia"]);
}

#[tokio::test]
async fn test_bulk_miss_is_fetched_individually() {
    let mut market = priced_market();
    market.bulk_omits.insert("XRP".to_string());
    let h = harness(BracketWidth::Eight, MockContract::with_games(vec![round_one_game(5)]), market);

    let outcome = h.automation.run(NOW).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Submitted { advanced: 1, .. }));
    assert!(h.market.requests.lock().iter().any(|r| r == "symbols:XRP"));
}

#[tokio::test]
async fn test_sixteen_slots_without_a_final_has_nothing_to_do() {
    let h = harness(BracketWidth::Sixteen, MockContract::default(), priced_market());

    assert_eq!(h.automation.run(NOW).await.unwrap(), RunOutcome::NothingToDo);
    assert_eq!(h.market.request_count(), 0);
    assert!(h.contract.submissions.lock().is_empty());
}

fn final_game() -> ace_automation::BracketGame {
    game(40, 3, 16, &[("SOL", usd(100)), ("DOGE", 10_000_000)])
}

#[tokio::test]
async fn test_sixteen_slot_final_triggers_a_new_game() {
    let mut market = priced_market();
    market.listing = (0..24)
        .map(|i| listed(9_000 + i, &format!("T{}", i), &format!("Token {}", i), &[]))
        .collect();
    let h = harness(BracketWidth::Sixteen, MockContract::with_games(vec![final_game()]), market);

    let outcome = h.automation.run(NOW).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Submitted { tx_hash: format!("0xtx{}", minute_of(NOW)), advanced: 1, new_game: true }
    );

    let submissions = h.contract.submissions.lock().clone();
    let new_game = submissions[0].new_game.as_ref().unwrap();
    assert_eq!(new_game.active_symbols().count(), 16);

    let batch = submissions[0].update.as_ref().unwrap();
    assert_eq!(batch.game_ids, vec![40, 0, 0, 0, 0]);
    assert_eq!(batch.winners[0][0], 74);
    assert_eq!(batch.winners[0].len(), 16);
}

#[tokio::test]
async fn test_failed_draw_still_advances_games() {
    // Nine eligible coins cannot seed a 16-slot bracket
    let h = harness(BracketWidth::Sixteen, MockContract::with_games(vec![final_game()]), priced_market());

    let outcome = h.automation.run(NOW).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Submitted { advanced: 1, new_game: false, .. }));
    assert_eq!(h.alerts.messages(), vec!["Failed to select coins for a new game on sepolia"]);
}

#[tokio::test]
async fn test_more_ready_games_than_a_batch_holds_aborts() {
    let games: Vec<_> = (1..=5).map(round_one_game).collect();
    let h = harness(BracketWidth::Eight, MockContract::with_games(games), priced_market());

    let outcome = h.automation.run(NOW).await.unwrap();
    assert_eq!(outcome, RunOutcome::Aborted("Failed to create update games calldata".to_string()));
    assert_eq!(h.alerts.messages(), vec!["Failed to create update games calldata on sepolia"]);
    assert!(h.contract.submissions.lock().is_empty());
    assert_eq!(h.store.get_number(EXECUTED_KEY).await.unwrap(), None);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[tokio::test]
async fn test_automation_built_from_config_uses_its_settings() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("CMC_API_KEY", "key"),
        ("BRACKET_WIDTH", "16"),
        ("LISTING_LIMIT", "200"),
        ("MIN_INTERVAL_SECS", "60"),
        ("HTTP_TIMEOUT_SECS", "1"),
        ("ALERT_URL", "http://127.0.0.1:9/log"),
        ("ALERT_API_KEY", "secret"),
    ]);
    let config = AutomationConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();

    let contract = Arc::new(MockContract { fail_reads: true, ..Default::default() });
    let store = Arc::new(MemoryStore::new());
    let automation = AdvanceAutomation::from_config(
        &config,
        "mainnet",
        contract,
        Arc::new(priced_market()),
        store.clone(),
    )
    .unwrap();

    let settings = automation.settings();
    assert_eq!(settings.width, BracketWidth::Sixteen);
    assert_eq!(settings.listing_limit, 200);
    assert_eq!(settings.min_interval_secs, 60);
    assert_eq!(settings.network, "mainnet");

    // An unreachable alert relay does not change the outcome
    let outcome = automation.run(NOW).await.unwrap();
    assert_eq!(outcome, RunOutcome::Aborted("Failed to fetch active games".to_string()));

    // A 60s spacing lets the next minute through; the default 480s would not
    let retry = automation.run(NOW + 60).await.unwrap();
    assert!(matches!(retry, RunOutcome::Aborted(_)));
    assert_eq!(store.get_number(LAST_ATTEMPT_KEY).await.unwrap(), Some(minute_of(NOW + 60)));
}
