//! Entry point for the ERP engine binary.
//!
//! Running this binary starts an HTTP server exposing the vacation and
//! order calculators. Settings come from the environment (or a `.env`
//! file); see [`erp_engine::config::Config`].

use anyhow::Context;
use erp_engine::api::{self, AppState};
use erp_engine::backend::BackendClient;
use erp_engine::config::Config;
use erp_engine::rules::RuleBook;
use erp_engine::vacation::VacationCalculator;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "erp_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let rules = RuleBook::load(config.vacation_rules.as_deref()).context("failed to load vacation rules")?;
    tracing::info!(
        backend = %config.backend.base_url,
        countries = rules.countries.len(),
        "starting ERP engine"
    );

    let backend = BackendClient::new(config.backend.clone()).context("failed to build backend client")?;
    let state = AppState::new(VacationCalculator::new(rules), Arc::new(backend));
    api::serve(&config.bind_addr, state).await
}
