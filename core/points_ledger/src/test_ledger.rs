use crate::invariants::{assert_all_account_invariants, assert_transfer_conserves};
use crate::{
    ActivityKind, EntityKind, LedgerError, LedgerStore, Memo, MemoryStore, PointsLedger,
    ProjectConfig, ProjectState,
};

const OPENING: u64 = 1250;

fn project_config() -> ProjectConfig {
    ProjectConfig {
        id: "proj1".to_string(),
        name: "Amazon Reforestation".to_string(),
        description: "Plant native trees".to_string(),
        points_needed: 500,
        total_points: 10_000,
        impact: "Every 500 points = 1 tree planted".to_string(),
    }
}

fn setup() -> PointsLedger<MemoryStore> {
    let store = MemoryStore::with_projects([("proj1", ProjectState { current_points: 320 })]);
    let ledger = PointsLedger::new(store);
    ledger.open_account("user123", OPENING).unwrap();
    ledger
}

#[test]
fn test_reference_scenario() {
    let ledger = setup();
    let project = project_config();

    let account = ledger.spend("user123", 200, Memo::new("Redeemed Premium Compost")).unwrap();
    assert_eq!(account.balance, 1050);

    let err = ledger.spend("user123", 2000, Memo::new("too much")).unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientBalance {
            account_id: "user123".to_string(),
            balance: 1050,
            requested: 2000,
        }
    );
    assert_eq!(ledger.balance("user123").unwrap(), 1050);

    // 5 kg of food scraps at 20 points/kg.
    let account = ledger
        .earn("user123", 100, Memo::new("Delivered 5 kg").kilograms(5.0))
        .unwrap();
    assert_eq!(account.balance, 1150);

    let (account, state) = ledger
        .donate("user123", &project, 50, Memo::new("Donated"))
        .unwrap();
    assert_eq!(account.balance, 1100);
    assert_eq!(state.current_points, 370);
    assert_eq!(ledger.project_state("proj1").unwrap().current_points, 370);

    let history = ledger.store().history("user123").unwrap();
    assert_eq!(history.len(), 3);
    assert_all_account_invariants(OPENING, &account, &history);
}

#[test]
fn test_earn_then_spend_round_trips() {
    let ledger = setup();
    for amount in [1, 37, 500, 10_000] {
        let before = ledger.balance("user123").unwrap();
        ledger.earn("user123", amount, Memo::new("in")).unwrap();
        let after = ledger.spend("user123", amount, Memo::new("out")).unwrap();
        assert_eq!(after.balance, before);
    }
}

#[test]
fn test_zero_amount_is_invalid_for_every_operation() {
    let ledger = setup();
    let project = project_config();

    assert!(matches!(
        ledger.earn("user123", 0, Memo::default()),
        Err(LedgerError::InvalidAmount(_))
    ));
    assert!(matches!(
        ledger.spend("user123", 0, Memo::default()),
        Err(LedgerError::InvalidAmount(_))
    ));
    assert!(matches!(
        ledger.donate("user123", &project, 0, Memo::default()),
        Err(LedgerError::InvalidAmount(_))
    ));
    assert!(ledger.activity("user123").unwrap().is_empty());
}

#[test]
fn test_amount_outside_signed_range_is_invalid() {
    let ledger = setup();
    let err = ledger.earn("user123", u64::MAX, Memo::default()).unwrap_err();
    assert_eq!(err.code(), 1);
    assert_eq!(ledger.balance("user123").unwrap(), OPENING);
}

#[test]
fn test_earn_overflow_leaves_balance_untouched() {
    let ledger = PointsLedger::new(MemoryStore::new());
    ledger.open_account("whale", u64::MAX - 10).unwrap();
    let err = ledger.earn("whale", 11, Memo::default()).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
    assert_eq!(ledger.balance("whale").unwrap(), u64::MAX - 10);
}

#[test]
fn test_spend_entire_balance_reaches_zero() {
    let ledger = setup();
    let account = ledger.spend("user123", OPENING, Memo::default()).unwrap();
    assert_eq!(account.balance, 0);

    let err = ledger.spend("user123", 1, Memo::default()).unwrap_err();
    assert_eq!(err.code(), 2);
    assert_eq!(ledger.balance("user123").unwrap(), 0);
}

#[test]
fn test_unknown_account_is_reported() {
    let ledger = setup();
    let err = ledger.earn("ghost", 10, Memo::default()).unwrap_err();
    assert_eq!(
        err,
        LedgerError::UnknownEntity {
            kind: EntityKind::Account,
            id: "ghost".to_string(),
        }
    );
    assert!(ledger.activity("ghost").is_err());
}

#[test]
fn test_open_account_keeps_existing_balance() {
    let ledger = setup();
    ledger.spend("user123", 250, Memo::default()).unwrap();
    let account = ledger.open_account("user123", OPENING).unwrap();
    assert_eq!(account.balance, 1000);
}

#[test]
fn test_donate_conserves_points() {
    let ledger = setup();
    let project = project_config();

    let balance_before = ledger.balance("user123").unwrap();
    let pool_before = ledger.project_state("proj1").unwrap().current_points;

    let (account, state) = ledger
        .donate("user123", &project, 777, Memo::default())
        .unwrap();

    assert_eq!(account.balance, balance_before - 777);
    assert_eq!(state.current_points, pool_before + 777);
    assert_transfer_conserves(balance_before, pool_before, account.balance, state.current_points);
}

#[test]
fn test_donate_with_insufficient_balance_changes_nothing() {
    let ledger = setup();
    let project = project_config();

    let err = ledger
        .donate("user123", &project, OPENING + 1, Memo::default())
        .unwrap_err();
    assert_eq!(err.code(), 2);
    assert_eq!(ledger.balance("user123").unwrap(), OPENING);
    assert_eq!(ledger.project_state("proj1").unwrap().current_points, 320);
    assert!(ledger.activity("user123").unwrap().is_empty());
}

#[test]
fn test_donate_past_goal_is_rejected() {
    let store = MemoryStore::with_projects([("proj1", ProjectState { current_points: 9_990 })]);
    let ledger = PointsLedger::new(store);
    ledger.open_account("user123", OPENING).unwrap();
    let project = project_config();

    let err = ledger
        .donate("user123", &project, 11, Memo::default())
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::GoalExceeded {
            project_id: "proj1".to_string(),
            remaining: 10,
        }
    );
    assert_eq!(ledger.balance("user123").unwrap(), OPENING);

    let (_, state) = ledger
        .donate("user123", &project, 10, Memo::default())
        .unwrap();
    assert_eq!(state.current_points, 10_000);
}

#[test]
fn test_donate_to_unseeded_project_fails() {
    let ledger = setup();
    let mut project = project_config();
    project.id = "proj9".to_string();

    let err = ledger
        .donate("user123", &project, 10, Memo::default())
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::UnknownEntity {
            kind: EntityKind::Project,
            ..
        }
    ));
    assert_eq!(ledger.balance("user123").unwrap(), OPENING);
}

#[test]
fn test_activity_is_newest_first_with_signed_amounts() {
    let ledger = setup();
    let project = project_config();

    ledger
        .earn("user123", 100, Memo::new("Delivered").reference("food").kilograms(5.0))
        .unwrap();
    ledger
        .spend("user123", 200, Memo::new("Redeemed").reference("prod1"))
        .unwrap();
    ledger
        .donate("user123", &project, 50, Memo::new("Donated").reference("proj1"))
        .unwrap();

    let activity = ledger.activity("user123").unwrap();
    let summary: Vec<_> = activity
        .iter()
        .map(|r| (r.sequence, r.kind, r.amount, r.reference.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (3, ActivityKind::Donate, -50, Some("proj1")),
            (2, ActivityKind::Spend, -200, Some("prod1")),
            (1, ActivityKind::Earn, 100, Some("food")),
        ]
    );
    assert_eq!(activity[2].kilograms, Some(5.0));
    assert!(activity.iter().all(|r| r.account_id == "user123"));
}

#[test]
fn test_each_mutation_appends_one_matching_record() {
    let ledger = setup();
    let project = project_config();

    let mut balance = OPENING as i64;
    for step in 0..30u64 {
        let before = ledger.activity("user123").unwrap().len();
        let result = match step % 3 {
            0 => ledger.earn("user123", step * 7 + 1, Memo::default()).map(|a| a.balance),
            1 => ledger.spend("user123", step * 11, Memo::default()).map(|a| a.balance),
            _ => ledger
                .donate("user123", &project, step + 1, Memo::default())
                .map(|(a, _)| a.balance),
        };
        let activity = ledger.activity("user123").unwrap();
        match result {
            Ok(new_balance) => {
                assert_eq!(activity.len(), before + 1);
                assert_eq!(activity[0].amount, new_balance as i64 - balance);
                balance = new_balance as i64;
            }
            Err(_) => assert_eq!(activity.len(), before),
        }
    }

    let account = ledger.account("user123").unwrap();
    let history = ledger.store().history("user123").unwrap();
    assert_all_account_invariants(OPENING, &account, &history);
}
