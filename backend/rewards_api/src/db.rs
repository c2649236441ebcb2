//! Database layer: migrations, journal writes, and startup snapshot reads.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use points_ledger::{Account, ActivityKind, ActivityRecord, ProjectState};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqliteConnection, SqlitePool,
};
use tracing::info;

use crate::errors::{ApiError, Result};
use crate::journal::JournalEntry;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // An in-memory database lives and dies with its single connection.
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Journal writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of journal entries in one transaction.
///
/// Activity rows that already exist (same id) are silently ignored so that
/// replaying a batch is idempotent. Returns the number of new activity rows.
pub async fn write_entries(pool: &SqlitePool, entries: &[JournalEntry]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for entry in entries {
        match entry {
            JournalEntry::Opened(account) => insert_account(&mut tx, account).await?,
            JournalEntry::Committed(commit) => {
                upsert_account(&mut tx, &commit.account).await?;
                if let Some((project_id, state)) = &commit.project {
                    upsert_project_state(&mut tx, project_id, state).await?;
                }
                for record in &commit.records {
                    inserted += insert_activity(&mut tx, record).await?;
                }
            }
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

async fn insert_account(conn: &mut SqliteConnection, account: &Account) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO accounts (id, balance, updated_at) VALUES (?1, ?2, ?3)")
        .bind(&account.id)
        .bind(to_i64(account.balance)?)
        .bind(Utc::now().timestamp_millis())
        .execute(conn)
        .await?;
    Ok(())
}

async fn upsert_account(conn: &mut SqliteConnection, account: &Account) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO accounts (id, balance, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT (id) DO UPDATE SET balance = excluded.balance,
                                       updated_at = excluded.updated_at
        "#,
    )
    .bind(&account.id)
    .bind(to_i64(account.balance)?)
    .bind(Utc::now().timestamp_millis())
    .execute(conn)
    .await?;
    Ok(())
}

async fn upsert_project_state(
    conn: &mut SqliteConnection,
    project_id: &str,
    state: &ProjectState,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO project_states (id, current_points, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT (id) DO UPDATE SET current_points = excluded.current_points,
                                       updated_at = excluded.updated_at
        "#,
    )
    .bind(project_id)
    .bind(to_i64(state.current_points)?)
    .bind(Utc::now().timestamp_millis())
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_activity(conn: &mut SqliteConnection, record: &ActivityRecord) -> Result<usize> {
    let rows_affected = sqlx::query(
        r#"
        INSERT OR IGNORE INTO activity
            (id, account_id, sequence, kind, amount, timestamp, description, reference, kilograms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&record.id)
    .bind(&record.account_id)
    .bind(to_i64(record.sequence)?)
    .bind(record.kind.as_str())
    .bind(record.amount)
    .bind(record.timestamp.timestamp_millis())
    .bind(&record.description)
    .bind(&record.reference)
    .bind(record.kilograms)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(rows_affected as usize)
}

// ─────────────────────────────────────────────────────────
// Snapshot reads
// ─────────────────────────────────────────────────────────

/// Everything the journal holds, used to rebuild the in-memory store.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub projects: Vec<(String, ProjectState)>,
    pub activity: Vec<ActivityRecord>,
}

#[derive(sqlx::FromRow)]
struct BalanceRow {
    id: String,
    balance: i64,
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    account_id: String,
    sequence: i64,
    kind: String,
    amount: i64,
    timestamp: i64,
    description: String,
    reference: Option<String>,
    kilograms: Option<f64>,
}

impl TryFrom<ActivityRow> for ActivityRecord {
    type Error = ApiError;

    fn try_from(row: ActivityRow) -> Result<Self> {
        let kind = ActivityKind::parse(&row.kind)
            .ok_or_else(|| ApiError::Journal(format!("unknown activity kind {}", row.kind)))?;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(row.timestamp)
            .ok_or_else(|| ApiError::Journal(format!("bad timestamp {}", row.timestamp)))?;
        Ok(ActivityRecord {
            id: row.id,
            account_id: row.account_id,
            sequence: to_u64(row.sequence)?,
            kind,
            amount: row.amount,
            timestamp,
            description: row.description,
            reference: row.reference,
            kilograms: row.kilograms,
        })
    }
}

pub async fn load_snapshot(pool: &SqlitePool) -> Result<Snapshot> {
    let accounts = sqlx::query_as::<_, BalanceRow>("SELECT id, balance FROM accounts ORDER BY id")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| Ok(Account::new(row.id, to_u64(row.balance)?)))
        .collect::<Result<Vec<_>>>()?;

    let projects = sqlx::query_as::<_, BalanceRow>(
        "SELECT id, current_points AS balance FROM project_states ORDER BY id",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| {
        Ok((
            row.id,
            ProjectState {
                current_points: to_u64(row.balance)?,
            },
        ))
    })
    .collect::<Result<Vec<_>>>()?;

    let activity = sqlx::query_as::<_, ActivityRow>(
        r#"
        SELECT id, account_id, sequence, kind, amount, timestamp,
               description, reference, kilograms
        FROM   activity
        ORDER  BY account_id ASC, sequence ASC
        "#,
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(ActivityRecord::try_from)
    .collect::<Result<Vec<_>>>()?;

    Ok(Snapshot {
        accounts,
        projects,
        activity,
    })
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| ApiError::Journal(format!("{value} exceeds SQLite range")))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| ApiError::Journal(format!("negative value {value} in journal")))
}
