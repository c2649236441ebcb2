//! Write-behind journal of ledger mutations.
//!
//! [`JournaledStore`] wraps the in-memory store. Every account opening and
//! every successful commit is forwarded over an unbounded channel; sending
//! never suspends, so the ledger's critical sections stay short. A
//! long-running background task drains the channel into SQLite, and the
//! journal is read back at startup to rebuild the in-memory state.
//!
//! Batches are written strictly in order. A batch that still fails after
//! its retries stops the writer, since writing later batches past it would
//! leave balances in SQLite that their activity rows do not replay.

use std::time::Duration;

use points_ledger::{
    Account, ActivityRecord, Catalog, Commit, LedgerStore, MemoryStore, ProjectState,
};
use sqlx::SqlitePool;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db;
use crate::errors::{ApiError, Result};

/// Delay before retrying a batch that failed to write.
#[cfg(not(test))]
const RETRY_DELAY: Duration = Duration::from_secs(1);
#[cfg(test)]
const RETRY_DELAY: Duration = Duration::from_millis(10);
const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    Opened(Account),
    Committed(Commit),
}

pub struct JournaledStore {
    inner: MemoryStore,
    tx: UnboundedSender<JournalEntry>,
}

impl JournaledStore {
    pub fn new(inner: MemoryStore) -> (Self, UnboundedReceiver<JournalEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { inner, tx }, rx)
    }

    fn forward(&self, entry: JournalEntry) {
        if self.tx.send(entry).is_err() {
            warn!("Journal writer is gone; mutation kept in memory only");
        }
    }
}

impl LedgerStore for JournaledStore {
    fn load(&self, account_id: &str) -> points_ledger::Result<Account> {
        self.inner.load(account_id)
    }

    fn load_project(&self, project_id: &str) -> points_ledger::Result<ProjectState> {
        self.inner.load_project(project_id)
    }

    fn history(&self, account_id: &str) -> points_ledger::Result<Vec<ActivityRecord>> {
        self.inner.history(account_id)
    }

    fn last_sequence(&self, account_id: &str) -> points_ledger::Result<u64> {
        self.inner.last_sequence(account_id)
    }

    fn open(&self, account: Account) -> points_ledger::Result<Account> {
        let existed = self.inner.load(&account.id).is_ok();
        let account = self.inner.open(account)?;
        if !existed {
            self.forward(JournalEntry::Opened(account.clone()));
        }
        Ok(account)
    }

    fn commit(&self, commit: &Commit) -> points_ledger::Result<()> {
        self.inner.commit(commit)?;
        self.forward(JournalEntry::Committed(commit.clone()));
        Ok(())
    }
}

/// Rebuild the in-memory store from the journal.
///
/// Projects start from their catalog seed; journaled pools override the
/// seed. Journaled projects missing from the catalog are skipped.
pub async fn hydrate(pool: &SqlitePool, catalog: &Catalog) -> Result<MemoryStore> {
    let store = MemoryStore::with_projects(catalog.project_states());
    let snapshot = db::load_snapshot(pool).await?;

    for (project_id, state) in snapshot.projects {
        if catalog.project(&project_id).is_err() {
            warn!("Skipping journaled project {project_id}: not in catalog");
            continue;
        }
        store.restore_project(&project_id, state)?;
    }

    let accounts = snapshot.accounts.len();
    for account in snapshot.accounts {
        store.restore_account(account)?;
    }

    let records = snapshot.activity.len();
    store.restore_activity(snapshot.activity)?;

    info!("Hydrated {accounts} accounts and {records} activity records from journal");
    Ok(store)
}

/// Drain the journal channel into SQLite until `shutdown` fires, then flush
/// whatever is still queued.
///
/// A batch that cannot be written stops the writer with an error and cancels
/// `shutdown`, so the server stops accepting mutations it can no longer
/// persist.
pub async fn run(
    pool: SqlitePool,
    mut rx: UnboundedReceiver<JournalEntry>,
    batch_size: usize,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Journal writer starting (batch size {batch_size})");

    loop {
        let first = tokio::select! {
            entry = rx.recv() => entry,
            _ = shutdown.cancelled() => None,
        };
        let Some(first) = first else { break };

        let mut batch = vec![first];
        while batch.len() < batch_size {
            match rx.try_recv() {
                Ok(entry) => batch.push(entry),
                Err(_) => break,
            }
        }
        if let Err(e) = flush(&pool, &batch).await {
            shutdown.cancel();
            return Err(e);
        }
    }

    // Senders outlive the writer, so drain with try_recv rather than recv.
    let mut rest = Vec::new();
    while let Ok(entry) = rx.try_recv() {
        rest.push(entry);
    }
    for chunk in rest.chunks(batch_size) {
        flush(&pool, chunk).await?;
    }

    info!("Journal writer stopped");
    Ok(())
}

async fn flush(pool: &SqlitePool, batch: &[JournalEntry]) -> Result<()> {
    let mut attempt = 1;
    loop {
        match db::write_entries(pool, batch).await {
            Ok(inserted) => {
                info!(
                    "Journaled {} entries → {} new activity records",
                    batch.len(),
                    inserted
                );
                return Ok(());
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!("Journal write failed (attempt {attempt}, will retry): {e}");
                attempt += 1;
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => {
                error!(
                    "Journal writer stopping: {} entries failed after {attempt} attempts: {e}",
                    batch.len()
                );
                return Err(ApiError::Journal(format!(
                    "batch of {} entries not written: {e}",
                    batch.len()
                )));
            }
        }
    }
}
