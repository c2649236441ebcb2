//! # Types
//!
//! Shared data structures used across all modules of the points ledger.
//!
//! ## Design decisions
//!
//! ### Config / State split
//!
//! A `Project` is held as two separate pieces:
//!
//! - [`ProjectConfig`]: loaded once from the catalog; never mutated.
//! - [`ProjectState`]: owned by the ledger store, written on every donation.
//!
//! Callers see the reconstructed [`Project`] for convenience.
//!
//! ### Signed activity amounts
//!
//! Balances are unsigned, activity amounts are signed: an [`ActivityRecord`]
//! carries the exact delta its mutation applied to the balance, so summing a
//! history replays the balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger point unit.
pub type Points = u64;

/// One user's reward balance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub balance: Points,
}

impl Account {
    pub fn new(id: impl Into<String>, balance: Points) -> Self {
        Self {
            id: id.into(),
            balance,
        }
    }
}

/// What kind of mutation produced an activity record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Points credited for a waste delivery.
    Earn,
    /// Points debited for a marketplace redemption.
    Spend,
    /// Points transferred to a project pool.
    Donate,
}

impl ActivityKind {
    /// Short identifier used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Spend => "spend",
            Self::Donate => "donate",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "earn" => Some(Self::Earn),
            "spend" => Some(Self::Spend),
            "donate" => Some(Self::Donate),
            _ => None,
        }
    }
}

/// Immutable, append-only entry created by every successful ledger mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Opaque unique identifier (uuid v4).
    pub id: String,
    pub account_id: String,
    /// Per-account position in the log, starting at 1.
    pub sequence: u64,
    pub kind: ActivityKind,
    /// Signed balance delta: positive for earn, negative for spend and donate.
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    /// Catalog id of the waste type, product or project involved.
    pub reference: Option<String>,
    /// Delivered weight, for earn records that came from a delivery.
    pub kilograms: Option<f64>,
}

/// Immutable project configuration, loaded from the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Points that buy one unit of impact (e.g. one tree).
    pub points_needed: Points,
    /// Funding target.
    pub total_points: Points,
    /// Human-readable unit of impact.
    pub impact: String,
}

/// Mutable project state, updated on donations.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    pub current_points: Points,
}

/// Full view of a funding project, reconstructed from config and state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points_needed: Points,
    pub current_points: Points,
    pub total_points: Points,
    pub impact: String,
}

impl Project {
    pub fn from_parts(config: &ProjectConfig, state: ProjectState) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            points_needed: config.points_needed,
            current_points: state.current_points,
            total_points: config.total_points,
            impact: config.impact.clone(),
        }
    }

    /// Points still accepted before the target is reached.
    pub fn remaining(&self) -> Points {
        self.total_points.saturating_sub(self.current_points)
    }

    pub fn is_fully_funded(&self) -> bool {
        self.current_points >= self.total_points
    }

    /// Funded fraction, clamped to `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total_points == 0 {
            return 1.0;
        }
        (self.current_points as f64 / self.total_points as f64).min(1.0)
    }
}

/// A category of organic waste accepted at intake.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WasteType {
    pub id: String,
    pub name: String,
    pub points_per_kg: Points,
}

/// A marketplace item redeemable for points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points: Points,
    pub category: String,
    #[serde(default)]
    pub eco: bool,
}

/// Environmental impact projected from an account's delivery history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalImpact {
    pub co2_avoided_kg: f64,
    pub compost_generated_kg: f64,
    pub biogas_produced_m3: f64,
    pub trees_equivalent: f64,
}
