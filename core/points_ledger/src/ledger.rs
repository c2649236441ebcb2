//! # Points ledger
//!
//! [`PointsLedger`] is the single source of truth for account balances. It
//! validates every mutation before applying it and hands the result to the
//! [`LedgerStore`] as one [`Commit`], so a balance and the activity record
//! describing its change are never visible apart.
//!
//! ## Serialization
//!
//! Each mutation holds an exclusive per-account lock for its whole
//! read-check-write sequence. `donate` additionally holds the project's lock.
//! Locks are always taken account first, project second. Nothing inside a
//! critical section blocks on I/O of its own; the store's commit is the only
//! call made while locked.
//!
//! Reads go straight to the store and see committed state only.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::storage::{Commit, LedgerStore};
use crate::types::{Account, ActivityKind, ActivityRecord, Points, ProjectConfig, ProjectState};

/// Describes the activity record a mutation appends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Memo {
    pub description: String,
    pub reference: Option<String>,
    pub kilograms: Option<f64>,
}

impl Memo {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn kilograms(mut self, kilograms: f64) -> Self {
        self.kilograms = Some(kilograms);
        self
    }
}

/// Lazily populated table of per-entity mutexes.
#[derive(Debug, Default)]
struct LockTable {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockTable {
    fn handle(&self, id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(id) {
            return Arc::clone(lock.value());
        }
        Arc::clone(self.locks.entry(id.to_string()).or_default().value())
    }
}

pub struct PointsLedger<S> {
    store: S,
    accounts: LockTable,
    projects: LockTable,
}

impl<S: LedgerStore> PointsLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            accounts: LockTable::default(),
            projects: LockTable::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch an account, creating it with `opening_balance` on first use.
    pub fn open_account(&self, account_id: &str, opening_balance: Points) -> Result<Account> {
        let lock = self.accounts.handle(account_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.open(Account::new(account_id, opening_balance))
    }

    /// Credit `amount` points to an account.
    pub fn earn(&self, account_id: &str, amount: Points, memo: Memo) -> Result<Account> {
        let delta = checked_delta(amount)?;

        let lock = self.account_lock(account_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut account = self.store.load(account_id)?;
        account.balance = account.balance.checked_add(amount).ok_or_else(|| {
            LedgerError::InvalidAmount(format!("crediting {amount} overflows the balance"))
        })?;

        let record = self.next_record(account_id, ActivityKind::Earn, delta, memo)?;
        self.store.commit(&Commit {
            account: account.clone(),
            project: None,
            records: vec![record],
        })?;

        info!("Earned {amount} points on {account_id}, balance {}", account.balance);
        Ok(account)
    }

    /// Debit `amount` points from an account.
    pub fn spend(&self, account_id: &str, amount: Points, memo: Memo) -> Result<Account> {
        let delta = checked_delta(amount)?;

        let lock = self.account_lock(account_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut account = self.store.load(account_id)?;
        account.balance = debit(&account, amount)?;

        let record = self.next_record(account_id, ActivityKind::Spend, -delta, memo)?;
        self.store.commit(&Commit {
            account: account.clone(),
            project: None,
            records: vec![record],
        })?;

        info!("Spent {amount} points on {account_id}, balance {}", account.balance);
        Ok(account)
    }

    /// Move `amount` points from an account into a project pool.
    ///
    /// Rejected with [`LedgerError::GoalExceeded`] when the pool would pass
    /// the project's `total_points`.
    pub fn donate(
        &self,
        account_id: &str,
        project: &ProjectConfig,
        amount: Points,
        memo: Memo,
    ) -> Result<(Account, ProjectState)> {
        let delta = checked_delta(amount)?;

        let account_lock = self.account_lock(account_id)?;
        let _account_guard = account_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let project_lock = self.project_lock(&project.id)?;
        let _project_guard = project_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut account = self.store.load(account_id)?;
        let mut state = self.store.load_project(&project.id)?;
        account.balance = debit(&account, amount)?;

        let remaining = project.total_points.saturating_sub(state.current_points);
        if amount > remaining {
            warn!(
                "Donation of {amount} to {} rejected: {remaining} points remaining",
                project.id
            );
            return Err(LedgerError::GoalExceeded {
                project_id: project.id.clone(),
                remaining,
            });
        }
        state.current_points += amount;

        let record = self.next_record(account_id, ActivityKind::Donate, -delta, memo)?;
        self.store.commit(&Commit {
            account: account.clone(),
            project: Some((project.id.clone(), state)),
            records: vec![record],
        })?;

        info!(
            "Donated {amount} points from {account_id} to {}, project at {}/{}",
            project.id, state.current_points, project.total_points
        );
        Ok((account, state))
    }

    pub fn account(&self, account_id: &str) -> Result<Account> {
        self.store.load(account_id)
    }

    pub fn balance(&self, account_id: &str) -> Result<Points> {
        Ok(self.store.load(account_id)?.balance)
    }

    /// Activity of an account, newest first.
    pub fn activity(&self, account_id: &str) -> Result<Vec<ActivityRecord>> {
        let mut log = self.store.history(account_id)?;
        log.reverse();
        Ok(log)
    }

    pub fn project_state(&self, project_id: &str) -> Result<ProjectState> {
        self.store.load_project(project_id)
    }

    // Unknown ids never get a lock entry. Accounts and projects are never
    // removed, so the existence check still holds once the lock is taken.
    fn account_lock(&self, account_id: &str) -> Result<Arc<Mutex<()>>> {
        self.store.load(account_id)?;
        Ok(self.accounts.handle(account_id))
    }

    fn project_lock(&self, project_id: &str) -> Result<Arc<Mutex<()>>> {
        self.store.load_project(project_id)?;
        Ok(self.projects.handle(project_id))
    }

    // Caller must hold the account lock.
    fn next_record(
        &self,
        account_id: &str,
        kind: ActivityKind,
        amount: i64,
        memo: Memo,
    ) -> Result<ActivityRecord> {
        Ok(ActivityRecord {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            sequence: self.store.last_sequence(account_id)? + 1,
            kind,
            amount,
            timestamp: Utc::now(),
            description: memo.description,
            reference: memo.reference,
            kilograms: memo.kilograms,
        })
    }
}

/// Signed form of a positive amount.
fn checked_delta(amount: Points) -> Result<i64> {
    if amount == 0 {
        return Err(LedgerError::InvalidAmount(
            "amount must be a positive number of points".to_string(),
        ));
    }
    i64::try_from(amount)
        .map_err(|_| LedgerError::InvalidAmount(format!("amount {amount} is out of range")))
}

fn debit(account: &Account, amount: Points) -> Result<Points> {
    account.balance.checked_sub(amount).ok_or_else(|| {
        warn!(
            "Debit of {amount} on {} rejected: balance {}",
            account.id, account.balance
        );
        LedgerError::InsufficientBalance {
            account_id: account.id.clone(),
            balance: account.balance,
            requested: amount,
        }
    })
}
