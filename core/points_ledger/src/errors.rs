//! Ledger error types.

use std::fmt;

use thiserror::Error;

use crate::types::Points;

/// Catalog table an unknown id was looked up in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityKind {
    Account,
    WasteType,
    Product,
    Project,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Account => "account",
            Self::WasteType => "waste type",
            Self::Product => "product",
            Self::Project => "project",
        })
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance on account {account_id}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        account_id: String,
        balance: Points,
        requested: Points,
    },

    #[error("Unknown {kind}: {id}")]
    UnknownEntity { kind: EntityKind, id: String },

    #[error("Donation exceeds goal of project {project_id}: {remaining} points remaining")]
    GoalExceeded { project_id: String, remaining: Points },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub(crate) fn unknown(kind: EntityKind, id: &str) -> Self {
        Self::UnknownEntity {
            kind,
            id: id.to_string(),
        }
    }

    /// Stable numeric code, suitable for clients that switch on error kinds.
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidAmount(_) => 1,
            Self::InsufficientBalance { .. } => 2,
            Self::UnknownEntity { .. } => 3,
            Self::GoalExceeded { .. } => 4,
            Self::InvalidCatalog(_) => 5,
            Self::Storage(_) => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
