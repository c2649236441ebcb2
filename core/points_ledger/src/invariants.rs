#![allow(dead_code)]

use crate::types::{Account, ActivityKind, ActivityRecord, Project};

/// INV-1: An account's activity replays to its balance from the opening balance.
pub fn assert_history_replays_balance(opening: u64, account: &Account, history: &[ActivityRecord]) {
    let replayed = history
        .iter()
        .fold(opening as i128, |acc, r| acc + r.amount as i128);
    assert!(
        replayed >= 0,
        "INV-1 violated: history of {} replays to a negative balance ({})",
        account.id,
        replayed
    );
    assert_eq!(
        replayed,
        account.balance as i128,
        "INV-1 violated: history of {} replays to {} but balance is {}",
        account.id,
        replayed,
        account.balance
    );
}

/// INV-2: Activity amounts carry the sign of their kind and are never zero.
pub fn assert_amount_signs(history: &[ActivityRecord]) {
    for record in history {
        let ok = match record.kind {
            ActivityKind::Earn => record.amount > 0,
            ActivityKind::Spend | ActivityKind::Donate => record.amount < 0,
        };
        assert!(
            ok,
            "INV-2 violated: record {} of kind {:?} has amount {}",
            record.id, record.kind, record.amount
        );
    }
}

/// INV-3: Sequence numbers are 1, 2, 3, ... in log order (oldest first).
pub fn assert_sequential(history: &[ActivityRecord]) {
    for (i, record) in history.iter().enumerate() {
        assert_eq!(
            record.sequence,
            i as u64 + 1,
            "INV-3 violated: expected sequence {}, got {}",
            i + 1,
            record.sequence
        );
    }
}

/// INV-4: A donation moves points without creating or destroying any.
pub fn assert_transfer_conserves(
    balance_before: u64,
    pool_before: u64,
    balance_after: u64,
    pool_after: u64,
) {
    assert_eq!(
        balance_before + pool_before,
        balance_after + pool_after,
        "INV-4 violated: {} + {} != {} + {}",
        balance_before,
        pool_before,
        balance_after,
        pool_after
    );
}

/// INV-5: Project pools never pass their target.
pub fn assert_within_target(project: &Project) {
    assert!(
        project.current_points <= project.total_points,
        "INV-5 violated: project {} holds {} of {}",
        project.id,
        project.current_points,
        project.total_points
    );
}

/// Run all history invariants for one account.
pub fn assert_all_account_invariants(opening: u64, account: &Account, history: &[ActivityRecord]) {
    assert_history_replays_balance(opening, account, history);
    assert_amount_signs(history);
    assert_sequential(history);
}
