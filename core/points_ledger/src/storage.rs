//! # Storage
//!
//! The ledger never touches a backing store directly; it goes through the
//! [`LedgerStore`] capability:
//!
//! | Operation      | Purpose                                                |
//! |----------------|--------------------------------------------------------|
//! | `load`         | Committed state of one account                         |
//! | `load_project` | Committed state of one project pool                    |
//! | `history`      | Append-only activity of one account, oldest first      |
//! | `open`         | Create an account if absent, return it either way      |
//! | `commit`       | Apply a [`Commit`] all-or-nothing                       |
//!
//! A commit is the unit of atomicity: an account's new balance, the optional
//! project credit of a donation, and the activity records describing both are
//! published together. A reader must observe either the state before a
//! commit or the state after it.
//!
//! [`MemoryStore`] is the in-process implementation. Durable stores wrap it
//! (see the backend's journal) or implement the trait directly.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{EntityKind, LedgerError, Result};
use crate::types::{Account, ActivityRecord, ProjectState};

/// Everything one ledger mutation writes.
#[derive(Clone, Debug, PartialEq)]
pub struct Commit {
    pub account: Account,
    /// Project credited by a donation, with its new state.
    pub project: Option<(String, ProjectState)>,
    pub records: Vec<ActivityRecord>,
}

pub trait LedgerStore: Send + Sync {
    fn load(&self, account_id: &str) -> Result<Account>;

    fn load_project(&self, project_id: &str) -> Result<ProjectState>;

    fn history(&self, account_id: &str) -> Result<Vec<ActivityRecord>>;

    /// Sequence number of the newest activity record, `0` for an empty log.
    fn last_sequence(&self, account_id: &str) -> Result<u64> {
        Ok(self
            .history(account_id)?
            .last()
            .map(|r| r.sequence)
            .unwrap_or(0))
    }

    fn open(&self, account: Account) -> Result<Account>;

    fn commit(&self, commit: &Commit) -> Result<()>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    fn load(&self, account_id: &str) -> Result<Account> {
        (**self).load(account_id)
    }

    fn load_project(&self, project_id: &str) -> Result<ProjectState> {
        (**self).load_project(project_id)
    }

    fn history(&self, account_id: &str) -> Result<Vec<ActivityRecord>> {
        (**self).history(account_id)
    }

    fn last_sequence(&self, account_id: &str) -> Result<u64> {
        (**self).last_sequence(account_id)
    }

    fn open(&self, account: Account) -> Result<Account> {
        (**self).open(account)
    }

    fn commit(&self, commit: &Commit) -> Result<()> {
        (**self).commit(commit)
    }
}

// ── In-memory store ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    projects: HashMap<String, ProjectState>,
    activity: HashMap<String, Vec<ActivityRecord>>,
}

/// Process-local store. One `RwLock` guards all tables, so a commit is
/// published to readers in a single step.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given project pools.
    pub fn with_projects<I, K>(projects: I) -> Self
    where
        I: IntoIterator<Item = (K, ProjectState)>,
        K: Into<String>,
    {
        let tables = Tables {
            projects: projects.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..Tables::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| LedgerError::Storage("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| LedgerError::Storage("memory store lock poisoned".to_string()))
    }

    /// Overwrite an account's committed state. Used when rebuilding from a journal.
    pub fn restore_account(&self, account: Account) -> Result<()> {
        let mut tables = self.write()?;
        tables.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    /// Overwrite a project's committed state. Used when rebuilding from a journal.
    pub fn restore_project(&self, project_id: &str, state: ProjectState) -> Result<()> {
        let mut tables = self.write()?;
        tables.projects.insert(project_id.to_string(), state);
        Ok(())
    }

    /// Re-append journaled activity. Records are kept ordered by sequence.
    pub fn restore_activity(&self, records: Vec<ActivityRecord>) -> Result<()> {
        let mut tables = self.write()?;
        for record in records {
            tables
                .activity
                .entry(record.account_id.clone())
                .or_default()
                .push(record);
        }
        for log in tables.activity.values_mut() {
            log.sort_by_key(|r| r.sequence);
            log.dedup_by(|a, b| a.id == b.id);
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self, account_id: &str) -> Result<Account> {
        self.read()?
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| LedgerError::unknown(EntityKind::Account, account_id))
    }

    fn load_project(&self, project_id: &str) -> Result<ProjectState> {
        self.read()?
            .projects
            .get(project_id)
            .copied()
            .ok_or_else(|| LedgerError::unknown(EntityKind::Project, project_id))
    }

    fn history(&self, account_id: &str) -> Result<Vec<ActivityRecord>> {
        let tables = self.read()?;
        if !tables.accounts.contains_key(account_id) {
            return Err(LedgerError::unknown(EntityKind::Account, account_id));
        }
        Ok(tables.activity.get(account_id).cloned().unwrap_or_default())
    }

    fn last_sequence(&self, account_id: &str) -> Result<u64> {
        Ok(self
            .read()?
            .activity
            .get(account_id)
            .and_then(|log| log.last())
            .map(|r| r.sequence)
            .unwrap_or(0))
    }

    fn open(&self, account: Account) -> Result<Account> {
        let mut tables = self.write()?;
        Ok(tables
            .accounts
            .entry(account.id.clone())
            .or_insert(account)
            .clone())
    }

    fn commit(&self, commit: &Commit) -> Result<()> {
        let mut tables = self.write()?;

        // Validate every target before touching any table.
        if !tables.accounts.contains_key(&commit.account.id) {
            return Err(LedgerError::unknown(
                EntityKind::Account,
                &commit.account.id,
            ));
        }
        if let Some((project_id, _)) = &commit.project {
            if !tables.projects.contains_key(project_id) {
                return Err(LedgerError::unknown(EntityKind::Project, project_id));
            }
        }

        tables
            .accounts
            .insert(commit.account.id.clone(), commit.account.clone());
        if let Some((project_id, state)) = &commit.project {
            tables.projects.insert(project_id.clone(), *state);
        }
        for record in &commit.records {
            tables
                .activity
                .entry(record.account_id.clone())
                .or_default()
                .push(record.clone());
        }
        Ok(())
    }
}
