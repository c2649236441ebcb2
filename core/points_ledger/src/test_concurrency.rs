use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crate::invariants::assert_all_account_invariants;
use crate::{LedgerError, LedgerStore, Memo, MemoryStore, PointsLedger, ProjectConfig, ProjectState};

fn project_config(id: &str, total_points: u64) -> ProjectConfig {
    ProjectConfig {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        points_needed: 1,
        total_points,
        impact: String::new(),
    }
}

#[test]
fn test_racing_spends_never_overdraw() {
    let ledger = PointsLedger::new(MemoryStore::new());
    ledger.open_account("user123", 1000).unwrap();

    let succeeded = AtomicU64::new(0);
    let rejected = AtomicU64::new(0);

    thread::scope(|s| {
        for _ in 0..16 {
            s.spawn(|| {
                for _ in 0..10 {
                    match ledger.spend("user123", 30, Memo::new("race")) {
                        Ok(_) => succeeded.fetch_add(1, Ordering::SeqCst),
                        Err(LedgerError::InsufficientBalance { .. }) => {
                            rejected.fetch_add(1, Ordering::SeqCst)
                        }
                        Err(e) => panic!("unexpected error: {e}"),
                    };
                }
            });
        }
    });

    // 1000 / 30 = 33 spends fit, the remaining 127 must be rejected.
    assert_eq!(succeeded.load(Ordering::SeqCst), 33);
    assert_eq!(rejected.load(Ordering::SeqCst), 127);
    assert_eq!(ledger.balance("user123").unwrap(), 10);

    let account = ledger.account("user123").unwrap();
    let history = ledger.store().history("user123").unwrap();
    assert_eq!(history.len(), 33);
    assert_all_account_invariants(1000, &account, &history);
}

#[test]
fn test_mixed_operations_keep_history_consistent() {
    let store = MemoryStore::with_projects([("pool", ProjectState::default())]);
    let ledger = PointsLedger::new(store);
    ledger.open_account("user123", 500).unwrap();
    let project = project_config("pool", u64::MAX);

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..200 {
                ledger.earn("user123", 5, Memo::new("earn")).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..200 {
                let _ = ledger.spend("user123", 7, Memo::new("spend"));
            }
        });
        s.spawn(|| {
            for _ in 0..200 {
                let _ = ledger.donate("user123", &project, 3, Memo::new("donate"));
            }
        });
        s.spawn(|| {
            for _ in 0..200 {
                // Readers only ever see committed, replayable states.
                let activity = ledger.activity("user123").unwrap();
                let replayed: i64 = 500 + activity.iter().map(|r| r.amount).sum::<i64>();
                assert!(replayed >= 0);
            }
        });
    });

    let account = ledger.account("user123").unwrap();
    let history = ledger.store().history("user123").unwrap();
    assert_all_account_invariants(500, &account, &history);

    let donated: i64 = history
        .iter()
        .filter(|r| r.kind == crate::ActivityKind::Donate)
        .map(|r| -r.amount)
        .sum();
    assert_eq!(
        ledger.project_state("pool").unwrap().current_points as i64,
        donated
    );
}

#[test]
fn test_competing_donors_respect_project_goal() {
    let store = MemoryStore::with_projects([("pool", ProjectState { current_points: 0 })]);
    let ledger = PointsLedger::new(store);
    let project = project_config("pool", 1_000);
    for i in 0..8 {
        ledger.open_account(&format!("donor{i}"), 10_000).unwrap();
    }

    thread::scope(|s| {
        for i in 0..8 {
            let ledger = &ledger;
            let project = &project;
            s.spawn(move || {
                let donor = format!("donor{i}");
                for _ in 0..50 {
                    let _ = ledger.donate(&donor, project, 10, Memo::new("donate"));
                }
            });
        }
    });

    assert_eq!(ledger.project_state("pool").unwrap().current_points, 1_000);
    let remaining: u64 = (0..8)
        .map(|i| ledger.balance(&format!("donor{i}")).unwrap())
        .sum();
    assert_eq!(remaining, 8 * 10_000 - 1_000);
}
