//! # Rewards workflows
//!
//! The user-facing operations, each resolving catalog ids before touching
//! the ledger:
//!
//! | Workflow     | Entry point(s)                                   | Ledger op |
//! |--------------|--------------------------------------------------|-----------|
//! | Intake       | [`Rewards::quote_delivery`], [`Rewards::deliver_waste`] | `earn`    |
//! | Marketplace  | [`Rewards::can_afford`], [`Rewards::redeem_product`]    | `spend`   |
//! | Projects     | [`Rewards::donate_to_project`]                   | `donate`  |
//! | Views        | `activity`, `impact`, `project`, `projects`      | reads     |
//!
//! Unknown ids fail with `UnknownEntity` before the ledger is invoked.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{Catalog, MAX_POINTS_PER_KG};
use crate::errors::{LedgerError, Result};
use crate::impact;
use crate::ledger::{Memo, PointsLedger};
use crate::storage::LedgerStore;
use crate::types::{
    Account, ActivityRecord, EnvironmentalImpact, Points, Product, Project, WasteType,
};

/// Accepted weight range for one delivery, in kilograms.
pub const MIN_DELIVERY_KG: f64 = 1.0;
pub const MAX_DELIVERY_KG: f64 = 20.0;

const MAX_DELIVERY_POINTS: Points = MAX_POINTS_PER_KG * MAX_DELIVERY_KG as Points;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Delivery {
    pub account: Account,
    pub waste_type: WasteType,
    pub kilograms: f64,
    pub points_earned: Points,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Redemption {
    pub account: Account,
    pub product: Product,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Donation {
    pub account: Account,
    pub project: Project,
    pub amount: Points,
}

/// Marketplace pre-check. Advisory only; `redeem_product` re-validates.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Affordability {
    pub can_afford: bool,
    /// Points still missing, `0` when affordable.
    pub shortfall: Points,
}

pub struct Rewards<S> {
    catalog: Arc<Catalog>,
    ledger: PointsLedger<S>,
}

impl<S: LedgerStore> Rewards<S> {
    pub fn new(catalog: Arc<Catalog>, ledger: PointsLedger<S>) -> Self {
        Self { catalog, ledger }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &PointsLedger<S> {
        &self.ledger
    }

    /// Points a delivery would earn, without recording anything.
    pub fn quote_delivery(&self, waste_type_id: &str, kilograms: f64) -> Result<Points> {
        let waste_type = self.catalog.waste_type(waste_type_id)?;
        points_for(waste_type, kilograms)
    }

    pub fn deliver_waste(
        &self,
        account_id: &str,
        waste_type_id: &str,
        kilograms: f64,
    ) -> Result<Delivery> {
        let waste_type = self.catalog.waste_type(waste_type_id)?;
        let points = points_for(waste_type, kilograms)?;

        let memo = Memo::new(format!("Delivered {kilograms} kg of {}", waste_type.name))
            .reference(&waste_type.id)
            .kilograms(kilograms);
        let account = self.ledger.earn(account_id, points, memo)?;

        Ok(Delivery {
            account,
            waste_type: waste_type.clone(),
            kilograms,
            points_earned: points,
        })
    }

    pub fn can_afford(&self, account_id: &str, product_id: &str) -> Result<Affordability> {
        let product = self.catalog.product(product_id)?;
        let balance = self.ledger.balance(account_id)?;
        Ok(Affordability {
            can_afford: balance >= product.points,
            shortfall: product.points.saturating_sub(balance),
        })
    }

    pub fn redeem_product(&self, account_id: &str, product_id: &str) -> Result<Redemption> {
        let product = self.catalog.product(product_id)?;
        let memo = Memo::new(format!("Redeemed {}", product.name)).reference(&product.id);
        let account = self.ledger.spend(account_id, product.points, memo)?;
        Ok(Redemption {
            account,
            product: product.clone(),
        })
    }

    pub fn donate_to_project(
        &self,
        account_id: &str,
        project_id: &str,
        amount: Points,
    ) -> Result<Donation> {
        let config = self.catalog.project(project_id)?;
        let memo = Memo::new(format!("Donated to {}", config.name)).reference(&config.id);
        let (account, state) = self.ledger.donate(account_id, config, amount, memo)?;
        Ok(Donation {
            account,
            project: Project::from_parts(config, state),
            amount,
        })
    }

    pub fn account(&self, account_id: &str) -> Result<Account> {
        self.ledger.account(account_id)
    }

    /// Activity of an account, newest first.
    pub fn activity(&self, account_id: &str) -> Result<Vec<ActivityRecord>> {
        self.ledger.activity(account_id)
    }

    pub fn impact(&self, account_id: &str) -> Result<EnvironmentalImpact> {
        let history = self.ledger.activity(account_id)?;
        Ok(impact::estimate(&history))
    }

    pub fn project(&self, project_id: &str) -> Result<Project> {
        let config = self.catalog.project(project_id)?;
        let state = self.ledger.project_state(project_id)?;
        Ok(Project::from_parts(config, state))
    }

    pub fn projects(&self) -> Result<Vec<Project>> {
        self.catalog
            .projects
            .iter()
            .map(|seed| self.project(&seed.config.id))
            .collect()
    }
}

/// `round(points_per_kg * kilograms)` for an accepted weight.
fn points_for(waste_type: &WasteType, kilograms: f64) -> Result<Points> {
    if !kilograms.is_finite() || !(MIN_DELIVERY_KG..=MAX_DELIVERY_KG).contains(&kilograms) {
        return Err(LedgerError::InvalidAmount(format!(
            "delivery weight must be between {MIN_DELIVERY_KG} and {MAX_DELIVERY_KG} kg, got {kilograms}"
        )));
    }
    let points = (waste_type.points_per_kg as f64 * kilograms).round();
    if points > MAX_DELIVERY_POINTS as f64 {
        return Err(LedgerError::InvalidAmount(format!(
            "{kilograms} kg of {} is worth more than {MAX_DELIVERY_POINTS} points",
            waste_type.id
        )));
    }
    Ok(points as Points)
}
