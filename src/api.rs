//! HTTP API for the ERP engine.
//!
//! This module exposes the calculators over a small REST API built on
//! [`axum`](https://crates.io/crates/axum). Vacation previews and order
//! totals are computed locally; accruals are persisted through the
//! configured [`EmployeeDirectory`].

use crate::backend::EmployeeDirectory;
use crate::error::EngineError;
use crate::models::{Employee, GlobalDiscount, LineItem, OrderTotals, VacationUpdate};
use crate::orders::{compute_totals, refresh_total};
use crate::rules::VacationRuleSet;
use crate::vacation::{add_vacation_days, run_monthly_accrual, AccrualOutcome, AccrualReport, VacationCalculator};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Application state shared across requests.
pub struct AppState {
    /// Rule book and entitlement arithmetic.
    pub calculator: VacationCalculator,
    /// Where employees are read from and written to.
    pub directory: Arc<dyn EmployeeDirectory>,
}

impl AppState {
    pub fn new(calculator: VacationCalculator, directory: Arc<dyn EmployeeDirectory>) -> Arc<Self> {
        Arc::new(Self {
            calculator,
            directory,
        })
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    /// Employee to preview; nothing is persisted.
    pub employee: Employee,
    /// Calendar month, 1 to 12.
    pub month: u32,
    pub year: i32,
    /// Rules for employees whose country resolves to `Custom`.
    #[serde(default)]
    pub custom_rules: Option<VacationRuleSet>,
    /// Date seniority is measured at; today when absent.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Canonical country the entitlement was computed for.
    pub country: String,
    /// Annual entitlement after seniority rules.
    pub annual_days: f64,
    /// `annual_days / 12` scaled by job percentage, rounded to two decimals.
    pub monthly_days: f64,
    /// The update that accruing would submit.
    pub update: VacationUpdate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccrueRequest {
    /// Employee to accrue for; required.
    #[serde(default)]
    pub employee_id: Option<String>,
    pub month: u32,
    pub year: i32,
    /// Rules for employees whose country resolves to `Custom`.
    #[serde(default)]
    pub custom_rules: Option<VacationRuleSet>,
    /// Date seniority is measured at; today when absent.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRequest {
    /// Defaults to the current month.
    #[serde(default)]
    pub month: Option<u32>,
    /// Defaults to the current year.
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsRequest {
    /// Lines to total; their `total` fields are recomputed.
    pub items: Vec<LineItem>,
    /// Order-wide discount; inactive when its value is zero.
    #[serde(default)]
    pub global_discount: GlobalDiscount,
    /// Tax percentage applied after discounts.
    #[serde(default)]
    pub tax_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsResponse {
    /// The input lines with recomputed totals.
    pub items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

/// Build the API router around `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/vacation/preview", post(preview_handler))
        .route("/api/vacation/accrue", post(accrue_handler))
        .route("/api/vacation/monthly", post(monthly_handler))
        .route("/api/orders/totals", post(totals_handler))
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Handler for POST /api/vacation/preview. Nothing is persisted.
async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, EngineError> {
    let today = req.as_of.unwrap_or_else(today);
    let calculator = &state.calculator;
    let custom = req.custom_rules.as_ref();
    let update = calculator.accrue(&req.employee, req.month, req.year, today, custom)?;
    let monthly_days = update.appended().map_or(0.0, |e| e.days_added);
    Ok(Json(PreviewResponse {
        country: calculator.country_of(&req.employee),
        annual_days: calculator.annual_vacation_days_with(&req.employee, today, custom),
        monthly_days,
        update,
    }))
}

/// Handler for POST /api/vacation/accrue
async fn accrue_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AccrueRequest>,
) -> Result<Json<AccrualOutcome>, EngineError> {
    let outcome = add_vacation_days(
        state.directory.as_ref(),
        &state.calculator,
        req.employee_id.as_deref(),
        req.month,
        req.year,
        req.as_of.unwrap_or_else(today),
        req.custom_rules.as_ref(),
    )
    .await?;
    Ok(Json(outcome))
}

/// Handler for POST /api/vacation/monthly. Defaults to the current month.
async fn monthly_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MonthlyRequest>,
) -> Result<Json<AccrualReport>, EngineError> {
    let today = req.as_of.unwrap_or_else(today);
    let report = run_monthly_accrual(
        state.directory.as_ref(),
        &state.calculator,
        req.month.unwrap_or_else(|| today.month()),
        req.year.unwrap_or_else(|| today.year()),
        today,
    )
    .await?;
    Ok(Json(report))
}

/// Handler for POST /api/orders/totals
async fn totals_handler(Json(req): Json<TotalsRequest>) -> Json<TotalsResponse> {
    let mut items = req.items;
    items.iter_mut().for_each(refresh_total);
    let totals = compute_totals(&items, &req.global_discount, req.tax_rate);
    Json(TotalsResponse { items, totals })
}

/// Launch the API server on `addr`. Runs until the server terminates.
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "server listening");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
