//! # Points Ledger
//!
//! Core of the green-points rewards program: users earn points for
//! delivering organic waste, spend them at the marketplace, and donate them
//! to environmental projects.
//!
//! | Concern       | Module / Entry Point(s)                               |
//! |---------------|-------------------------------------------------------|
//! | Data model    | [`types`]                                             |
//! | Ledger        | [`PointsLedger::earn`], `spend`, `donate`             |
//! | Storage seam  | [`LedgerStore`], [`MemoryStore`]                      |
//! | Catalog       | [`Catalog`]                                           |
//! | Workflows     | [`Rewards`]                                           |
//! | Impact        | [`impact::estimate`]                                  |
//!
//! ## Architecture
//!
//! Balance rules live only in [`ledger`]. Persistence goes through
//! [`storage`]. The workflows in [`rewards`] resolve catalog ids and build
//! activity descriptions, then delegate every mutation to the ledger.
//!
//! ```
//! use std::sync::Arc;
//! use points_ledger::{Catalog, MemoryStore, PointsLedger, Rewards};
//!
//! let catalog = Arc::new(Catalog::builtin());
//! let store = MemoryStore::with_projects(catalog.project_states());
//! let rewards = Rewards::new(catalog, PointsLedger::new(store));
//!
//! rewards.ledger().open_account("user123", 1250).unwrap();
//! let delivery = rewards.deliver_waste("user123", "food", 5.0).unwrap();
//! assert_eq!(delivery.account.balance, 1350);
//! ```

pub mod catalog;
pub mod errors;
pub mod impact;
pub mod ledger;
pub mod rewards;
pub mod storage;
pub mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_concurrency;
#[cfg(test)]
mod test_ledger;

pub use catalog::{Catalog, ProjectSeed, MAX_POINTS_PER_KG};
pub use errors::{EntityKind, LedgerError, Result};
pub use ledger::{Memo, PointsLedger};
pub use rewards::{Affordability, Delivery, Donation, Redemption, Rewards, MAX_DELIVERY_KG, MIN_DELIVERY_KG};
pub use storage::{Commit, LedgerStore, MemoryStore};
pub use types::{
    Account, ActivityKind, ActivityRecord, EnvironmentalImpact, Points, Product, Project,
    ProjectConfig, ProjectState, WasteType,
};
