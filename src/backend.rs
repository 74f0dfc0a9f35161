//! REST client for the ERP backend.
//!
//! The calculators never talk HTTP themselves; they go through the
//! [`EmployeeDirectory`], [`PriceLookup`] and [`DocumentSink`] seams.
//! [`BackendClient`] implements all three against the backend's
//! `{ success, data, message }` envelope, authenticating with the
//! `auth_token` cookie.

use crate::draft::{InvoicePayload, OrderPayload};
use crate::error::{EngineError, Result};
use crate::models::{Employee, PriceListSummary, PriceQuote, Product, VacationUpdate};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Employee records and their vacation ledgers.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn list_employees(&self) -> Result<Vec<Employee>>;

    async fn get_employee(&self, id: &str) -> Result<Employee>;

    /// Replace the balance and history of one employee; returns the
    /// stored record.
    async fn update_vacation(&self, id: &str, update: &VacationUpdate) -> Result<Employee>;
}

/// Customer price lists and the catalog behind them.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    /// Price of `quantity` units of a product for a customer. A quote the
    /// backend could not produce is an error, never a zero price.
    async fn get_price(&self, customer_id: &str, product_id: &str, quantity: f64) -> Result<PriceQuote>;

    /// Active customer price lists.
    async fn customer_price_lists(&self) -> Result<Vec<PriceListSummary>>;

    /// Products available for sale, with their catalog prices.
    async fn products(&self) -> Result<Vec<Product>>;
}

/// Where finished invoices and orders are created.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn create_invoice(&self, payload: &InvoicePayload) -> Result<Value>;

    async fn create_order(&self, payload: &OrderPayload) -> Result<Value>;
}

/// Connection settings for [`BackendClient`].
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL including the `/api` prefix.
    pub base_url: String,
    /// Per-request timeout, connect included.
    pub timeout: Duration,
    /// Value of the `auth_token` cookie, if requests should be authenticated.
    pub auth_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout: Duration::from_secs(30),
            auth_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "envelope_success")]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

fn envelope_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ProductsInfo {
    #[serde(default)]
    products: Vec<Product>,
}

/// How a 404 from the backend is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnMissing {
    /// Reads: the record does not exist.
    NotFound,
    /// Writes: the backend refused the mutation like any other non-2xx.
    Reject,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    config: BackendConfig,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(%method, %url, "backend request");
        let builder = self.http.request(method, url);
        match &self.config.auth_token {
            Some(token) => builder.header(header::COOKIE, format!("auth_token={token}")),
            None => builder,
        }
    }

    /// Send a read and unwrap the envelope's `data`.
    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, resource: &str) -> Result<T> {
        self.send(builder, resource, OnMissing::NotFound).await
    }

    /// Send a mutation and unwrap the envelope's `data`. Every non-2xx
    /// answer, 404 included, is a [`EngineError::BackendRejection`].
    async fn write<T: DeserializeOwned>(&self, builder: RequestBuilder, resource: &str) -> Result<T> {
        self.send(builder, resource, OnMissing::Reject).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        resource: &str,
        on_missing: OnMissing,
    ) -> Result<T> {
        let response = builder.send().await?;
        let envelope: Envelope<T> = read_json(response, resource, on_missing).await?;
        if !envelope.success {
            return Err(EngineError::BackendRejection {
                status: StatusCode::OK.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("{resource} request was not successful")),
            });
        }
        envelope
            .data
            .ok_or_else(|| EngineError::BackendRejection {
                status: StatusCode::OK.as_u16(),
                message: format!("{resource} response has no data"),
            })
    }
}

/// Map the status and decode the body of a backend response.
async fn read_json<T: DeserializeOwned>(
    response: Response,
    resource: &str,
    on_missing: OnMissing,
) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if status == StatusCode::NOT_FOUND && on_missing == OnMissing::NotFound {
        return Err(EngineError::not_found(resource));
    }
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        warn!(status = status.as_u16(), %message, resource, "backend rejected request");
        return Err(EngineError::BackendRejection {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl EmployeeDirectory for BackendClient {
    #[instrument(skip(self))]
    async fn list_employees(&self) -> Result<Vec<Employee>> {
        self.fetch(self.request(Method::GET, "/employees"), "employees")
            .await
    }

    #[instrument(skip(self))]
    async fn get_employee(&self, id: &str) -> Result<Employee> {
        let path = format!("/employees/{id}");
        self.fetch(self.request(Method::GET, &path), &format!("employee {id}"))
            .await
    }

    #[instrument(skip(self, update), fields(balance = update.vacation_balance))]
    async fn update_vacation(&self, id: &str, update: &VacationUpdate) -> Result<Employee> {
        let path = format!("/employees/{id}/vacation");
        self.write(
            self.request(Method::PUT, &path).json(update),
            &format!("employee {id}"),
        )
        .await
    }
}

#[async_trait]
impl PriceLookup for BackendClient {
    #[instrument(skip(self))]
    async fn get_price(&self, customer_id: &str, product_id: &str, quantity: f64) -> Result<PriceQuote> {
        let quantity = quantity.to_string();
        let builder = self
            .request(Method::GET, "/procurement-advanced/price-lists/get-price")
            .query(&[
                ("customerId", customer_id),
                ("productId", product_id),
                ("quantity", quantity.as_str()),
            ]);
        let response = builder.send().await?;
        let quote: PriceQuote = match read_json(response, "price", OnMissing::NotFound).await {
            Ok(quote) => quote,
            Err(EngineError::NotFound(_)) => {
                return Err(EngineError::lookup(format!("no price for product {product_id}")));
            }
            Err(err) => return Err(err),
        };
        if !quote.success {
            return Err(EngineError::lookup(
                quote
                    .message
                    .unwrap_or_else(|| format!("no price for product {product_id}")),
            ));
        }
        Ok(quote)
    }

    #[instrument(skip(self))]
    async fn customer_price_lists(&self) -> Result<Vec<PriceListSummary>> {
        let builder = self
            .request(Method::GET, "/procurement-advanced/price-lists")
            .query(&[("priceListType", "Customer"), ("status", "Active")]);
        self.fetch(builder, "price lists").await
    }

    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>> {
        let info: ProductsInfo = self
            .fetch(self.request(Method::GET, "/inventory/productsInfo"), "products")
            .await?;
        Ok(info.products)
    }
}

#[async_trait]
impl DocumentSink for BackendClient {
    #[instrument(skip_all, fields(items = payload.items.len()))]
    async fn create_invoice(&self, payload: &InvoicePayload) -> Result<Value> {
        self.write(self.request(Method::POST, "/invoices").json(payload), "invoice")
            .await
    }

    #[instrument(skip_all, fields(customer = %payload.customer, items = payload.items.len()))]
    async fn create_order(&self, payload: &OrderPayload) -> Result<Value> {
        self.write(
            self.request(Method::POST, "/CustomerOrder").json(payload),
            "customer order",
        )
        .await
    }
}
