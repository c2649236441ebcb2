//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use points_ledger::{
    Account, ActivityRecord, Affordability, Delivery, Donation, EnvironmentalImpact, Points,
    Product, Project, Redemption, Rewards, WasteType,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::Result;
use crate::journal::JournaledStore;

pub struct ApiState {
    pub rewards: Rewards<JournaledStore>,
    /// Balance granted to accounts opened through the API.
    pub opening_balance: Points,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/catalog/waste-types", get(list_waste_types))
        .route("/catalog/products", get(list_products))
        .route("/catalog/categories", get(list_categories))
        .route("/quote", get(quote_delivery))
        .route("/accounts/:id", get(get_account).put(open_account))
        .route("/accounts/:id/activity", get(get_activity))
        .route("/accounts/:id/impact", get(get_impact))
        .route("/accounts/:id/deliveries", post(deliver_waste))
        .route(
            "/accounts/:id/products/:product_id/affordability",
            get(get_affordability),
        )
        .route("/accounts/:id/redemptions", post(redeem_product))
        .route("/accounts/:id/donations", post(donate_to_project))
        .route("/projects", get(list_projects))
        .route("/projects/:id", get(get_project))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

#[derive(Serialize)]
pub struct ActivityResponse {
    pub account_id: String,
    pub count: usize,
    pub activity: Vec<ActivityRecord>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub waste_type_id: String,
    pub kilograms: f64,
    pub points: Points,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub waste_type_id: String,
    pub kilograms: f64,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryRequest {
    pub waste_type_id: String,
    pub kilograms: f64,
}

#[derive(Debug, Deserialize)]
pub struct RedemptionRequest {
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DonationRequest {
    pub project_id: String,
    pub amount: Points,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /catalog/waste-types`
pub async fn list_waste_types(State(state): State<Arc<ApiState>>) -> Json<ListResponse<WasteType>> {
    Json(state.rewards.catalog().waste_types.clone().into())
}

/// `GET /catalog/products?category=&q=`
pub async fn list_products(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ProductQuery>,
) -> Json<ListResponse<Product>> {
    let products = state
        .rewards
        .catalog()
        .search_products(query.category.as_deref(), query.q.as_deref().unwrap_or(""))
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    Json(products.into())
}

/// `GET /catalog/categories`
pub async fn list_categories(State(state): State<Arc<ApiState>>) -> Json<ListResponse<String>> {
    let categories = state
        .rewards
        .catalog()
        .categories()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    Json(categories.into())
}

/// `GET /quote?waste_type_id=&kilograms=`
pub async fn quote_delivery(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>> {
    let points = state
        .rewards
        .quote_delivery(&query.waste_type_id, query.kilograms)?;
    Ok(Json(QuoteResponse {
        waste_type_id: query.waste_type_id,
        kilograms: query.kilograms,
        points,
    }))
}

/// `PUT /accounts/:id`
///
/// Opens the account with the configured opening balance, or returns it
/// unchanged if it already exists.
pub async fn open_account(
    State(state): State<Arc<ApiState>>,
    Path(account_id): Path<String>,
) -> Result<Json<Account>> {
    let account = state
        .rewards
        .ledger()
        .open_account(&account_id, state.opening_balance)?;
    Ok(Json(account))
}

/// `GET /accounts/:id`
pub async fn get_account(
    State(state): State<Arc<ApiState>>,
    Path(account_id): Path<String>,
) -> Result<Json<Account>> {
    Ok(Json(state.rewards.account(&account_id)?))
}

/// `GET /accounts/:id/activity`
///
/// Newest first.
pub async fn get_activity(
    State(state): State<Arc<ApiState>>,
    Path(account_id): Path<String>,
) -> Result<Json<ActivityResponse>> {
    let activity = state.rewards.activity(&account_id)?;
    Ok(Json(ActivityResponse {
        account_id,
        count: activity.len(),
        activity,
    }))
}

/// `GET /accounts/:id/impact`
pub async fn get_impact(
    State(state): State<Arc<ApiState>>,
    Path(account_id): Path<String>,
) -> Result<Json<EnvironmentalImpact>> {
    Ok(Json(state.rewards.impact(&account_id)?))
}

/// `POST /accounts/:id/deliveries`
pub async fn deliver_waste(
    State(state): State<Arc<ApiState>>,
    Path(account_id): Path<String>,
    Json(req): Json<DeliveryRequest>,
) -> Result<Json<Delivery>> {
    let delivery = state
        .rewards
        .deliver_waste(&account_id, &req.waste_type_id, req.kilograms)?;
    Ok(Json(delivery))
}

/// `GET /accounts/:id/products/:product_id/affordability`
pub async fn get_affordability(
    State(state): State<Arc<ApiState>>,
    Path((account_id, product_id)): Path<(String, String)>,
) -> Result<Json<Affordability>> {
    Ok(Json(state.rewards.can_afford(&account_id, &product_id)?))
}

/// `POST /accounts/:id/redemptions`
pub async fn redeem_product(
    State(state): State<Arc<ApiState>>,
    Path(account_id): Path<String>,
    Json(req): Json<RedemptionRequest>,
) -> Result<Json<Redemption>> {
    Ok(Json(state.rewards.redeem_product(&account_id, &req.product_id)?))
}

/// `POST /accounts/:id/donations`
pub async fn donate_to_project(
    State(state): State<Arc<ApiState>>,
    Path(account_id): Path<String>,
    Json(req): Json<DonationRequest>,
) -> Result<Json<Donation>> {
    let donation = state
        .rewards
        .donate_to_project(&account_id, &req.project_id, req.amount)?;
    Ok(Json(donation))
}

/// `GET /projects`
pub async fn list_projects(State(state): State<Arc<ApiState>>) -> Result<Json<ListResponse<Project>>> {
    Ok(Json(state.rewards.projects()?.into()))
}

/// `GET /projects/:id`
pub async fn get_project(
    State(state): State<Arc<ApiState>>,
    Path(project_id): Path<String>,
) -> Result<Json<Project>> {
    Ok(Json(state.rewards.project(&project_id)?))
}
