//! ERP engine library crate.
//!
//! This crate holds the business calculations of the ERP front office
//! as reusable modules: vacation accrual against per-country rule
//! tables, order and invoice totals with price-list pricing, and a
//! typed client for the ERP backend. Applications may call the
//! calculators directly or embed the HTTP API via `api::build_router`.

pub mod api;
pub mod backend;
pub mod config;
pub mod draft;
pub mod error;
pub mod models;
pub mod orders;
pub mod party;
pub mod pricing;
pub mod rounding;
pub mod rules;
pub mod vacation;

pub use error::{EngineError, Result};
