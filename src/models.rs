//! Data models for the ERP engine.
//!
//! The `models` module defines the serialisable records exchanged with
//! the ERP backend (employees, accrual entries, line items, price
//! quotes) and the results produced by the calculators. Field names
//! follow the backend's camelCase JSON so the same types can be read
//! from and written back to the REST endpoints unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An employee record as returned by `GET /employees`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Backend identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Hire date. Seniority is derived from it in whole years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Weekly contracted hours; absent means full time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hours: Option<f64>,
    /// Running leave balance in days.
    #[serde(default)]
    pub vacation_balance: f64,
    /// Append-only accrual ledger, in submission order.
    #[serde(default)]
    pub vacation_history: Vec<AccrualEntry>,
}

impl Employee {
    /// The raw (possibly localised) country name, if any.
    pub fn country(&self) -> Option<&str> {
        self.address.as_ref().and_then(|a| a.country.as_deref())
    }

    /// Whether the ledger already holds an entry for `label`.
    pub fn has_accrual_for(&self, label: &str) -> bool {
        self.vacation_history.iter().any(|e| e.month == label)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// One row of an employee's vacation ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccrualEntry {
    /// Free-form `"<month>/<year>"` label.
    pub month: String,
    /// Days credited by this entry.
    pub days_added: f64,
    /// Balance right after the entry was applied.
    pub new_balance: f64,
    /// Canonical country key the accrual was computed with.
    #[serde(default)]
    pub country: String,
    /// Fields the backend stores alongside an entry (`_id`, `timestamp`).
    /// Carried through untouched when the history is resubmitted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full-replacement body for `PUT /employees/:id/vacation`, together
/// with the entry that was appended to produce it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VacationUpdate {
    /// Balance after the appended entry.
    pub vacation_balance: f64,
    /// The existing ledger with the new entry at the end.
    pub vacation_history: Vec<AccrualEntry>,
}

impl VacationUpdate {
    /// The entry appended by this update.
    pub fn appended(&self) -> Option<&AccrualEntry> {
        self.vacation_history.last()
    }
}

/// Builds the `"<month>/<year>"` label used by the ledger.
pub fn month_label(month: u32, year: i32) -> String {
    format!("{month}/{year}")
}

/// A line on an invoice or customer order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Catalog product reference (orders).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Free-text description (invoices).
    #[serde(default)]
    pub description: String,
    /// Number of units; may be fractional.
    pub quantity: f64,
    /// Price per unit before the line discount.
    #[serde(default)]
    pub unit_price: f64,
    /// Per-line discount percentage, 0 to 100.
    #[serde(default)]
    pub discount: f64,
    /// Derived: `quantity * unit_price * (1 - discount / 100)`.
    #[serde(default)]
    pub total: f64,
    /// List price before the customer's price list was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    /// Discount the price list granted, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<f64>,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            product: None,
            description: String::new(),
            quantity: 1.0,
            unit_price: 0.0,
            discount: 0.0,
            total: 0.0,
            base_price: None,
            discount_percent: None,
        }
    }
}

/// How a global discount is expressed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    #[default]
    Percentage,
    Fixed,
}

/// An order-wide discount. A positive value overrides every line discount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct GlobalDiscount {
    /// Serialised as `type`.
    #[serde(rename = "type", default)]
    pub kind: DiscountKind,
    /// Percentage or absolute amount, depending on `kind`.
    #[serde(default)]
    pub value: f64,
}

impl GlobalDiscount {
    pub fn percentage(value: f64) -> Self {
        Self {
            kind: DiscountKind::Percentage,
            value,
        }
    }

    pub fn fixed(value: f64) -> Self {
        Self {
            kind: DiscountKind::Fixed,
            value,
        }
    }

    pub fn is_active(&self) -> bool {
        self.value > 0.0
    }
}

/// Totals for display; the backend recomputes its own on submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Amount after discounts, before tax.
    pub subtotal: f64,
    /// Raw subtotal minus `subtotal`.
    pub discount_amount: f64,
    /// `tax_rate` percent of `subtotal`.
    pub tax_amount: f64,
    /// `subtotal + tax_amount`.
    pub total_amount: f64,
}

/// A catalog product, the fallback source of unit prices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Catalog list price.
    #[serde(default)]
    pub unit_price: f64,
}

/// Answer of `GET /procurement-advanced/price-lists/get-price`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// `false` when no price list entry matched.
    #[serde(default)]
    pub success: bool,
    /// Price the customer pays per unit.
    #[serde(default)]
    pub price: f64,
    /// Discount the price list grants off the base price.
    #[serde(default)]
    pub discount_percent: f64,
    /// Catalog price the list discount was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    /// Backend explanation when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Summary of a price list as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceListSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, alias = "priceListName")]
    pub name: String,
    /// Bound customer; `None` marks a general customer price list.
    #[serde(default, deserialize_with = "customer_ref")]
    pub customer_id: Option<String>,
    /// Backend status, e.g. `active`.
    #[serde(default)]
    pub status: String,
}

/// The backend sends the bound customer either as an id or as the
/// populated customer document.
fn customer_ref<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(id)) => Some(id),
        Some(Value::Object(doc)) => doc.get("_id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_employee_reads_backend_shape() {
        let employee: Employee = serde_json::from_value(json!({
            "_id": "e1",
            "name": "Dana",
            "createdAt": "2020-06-15T00:00:00.000Z",
            "address": {"country": "ישראל", "city": "Haifa"},
            "expectedHours": 20,
            "vacationBalance": 3.5,
            "vacationHistory": [
                {"month": "5/2024", "daysAdded": 1.0, "newBalance": 3.5,
                 "country": "Israel", "_id": "h1"}
            ]
        }))
        .unwrap();
        assert_eq!(employee.country(), Some("ישראל"));
        assert_eq!(employee.expected_hours, Some(20.0));
        assert!(employee.has_accrual_for("5/2024"));
        assert_eq!(employee.vacation_history[0].extra["_id"], json!("h1"));
    }

    #[test]
    fn test_accrual_entry_keeps_unknown_fields_on_write() {
        let raw = json!({"month": "1/2024", "daysAdded": 1.5, "newBalance": 1.5,
                         "country": "USA", "timestamp": "2024-01-01T00:00:00Z"});
        let entry: AccrualEntry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }

    #[test]
    fn test_global_discount_uses_type_key() {
        let d: GlobalDiscount =
            serde_json::from_value(json!({"type": "fixed", "value": 15})).unwrap();
        assert_eq!(d, GlobalDiscount::fixed(15.0));
        assert!(d.is_active());
        assert!(!GlobalDiscount::default().is_active());
    }

    #[test]
    fn test_price_list_accepts_populated_customer() {
        let list: PriceListSummary = serde_json::from_value(json!({
            "_id": "pl1", "name": "VIP", "status": "Active",
            "customerId": {"_id": "c9", "name": "Acme"}
        }))
        .unwrap();
        assert_eq!(list.customer_id.as_deref(), Some("c9"));

        let general: PriceListSummary =
            serde_json::from_value(json!({"_id": "pl2", "customerId": null})).unwrap();
        assert_eq!(general.customer_id, None);
    }
}
