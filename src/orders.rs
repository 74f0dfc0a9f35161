//! Order and invoice totals.
//!
//! Line totals are kept in sync with every edit; document totals are
//! derived on demand and carry full `f64` precision. Rounding to cents is
//! left to whoever displays them, and the backend recomputes its own
//! totals on submission.
//!
//! A positive global discount always wins over line discounts: when one
//! is set the line discounts are ignored for the totals, even if some are
//! still non-zero in the data.

use crate::error::{EngineError, Result};
use crate::models::{DiscountKind, GlobalDiscount, LineItem, OrderTotals};
use serde::{Deserialize, Serialize};

/// `quantity * unit_price * (1 - discount / 100)`.
pub fn line_total(quantity: f64, unit_price: f64, discount: f64) -> f64 {
    quantity * unit_price * (1.0 - discount / 100.0)
}

/// Recompute the stored total of a single item.
pub fn refresh_total(item: &mut LineItem) {
    item.total = line_total(item.quantity, item.unit_price, item.discount);
}

/// An editable field of a line item, with its new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum LineField {
    Product(String),
    Description(String),
    Quantity(f64),
    UnitPrice(f64),
    Discount(f64),
}

impl LineField {
    /// Edits that can change the price-list price of the line.
    pub fn affects_price(&self) -> bool {
        matches!(self, LineField::Product(_) | LineField::Quantity(_))
    }

    fn apply(self, item: &mut LineItem) {
        match self {
            LineField::Product(product) => {
                item.product = if product.is_empty() { None } else { Some(product) };
            }
            LineField::Description(description) => item.description = description,
            LineField::Quantity(quantity) => item.quantity = quantity,
            LineField::UnitPrice(unit_price) => item.unit_price = unit_price,
            LineField::Discount(discount) => item.discount = discount,
        }
    }
}

/// Return a copy of `items` with one field of `items[index]` replaced and
/// that item's total recomputed. The other items are copied unchanged.
pub fn update_line_item(items: &[LineItem], index: usize, field: LineField) -> Result<Vec<LineItem>> {
    if index >= items.len() {
        return Err(EngineError::validation(format!(
            "line item {index} does not exist ({} items)",
            items.len()
        )));
    }
    let mut updated = items.to_vec();
    let item = &mut updated[index];
    field.apply(item);
    refresh_total(item);
    Ok(updated)
}

/// Sum of `quantity * unit_price`, ignoring every discount.
pub fn raw_subtotal(items: &[LineItem]) -> f64 {
    items.iter().map(|i| i.quantity * i.unit_price).sum()
}

/// Subtotal, discount, tax and grand total of a document.
///
/// * Global discount active: line discounts are ignored. A percentage
///   applies to the raw subtotal; a fixed amount is subtracted from it and
///   never takes the subtotal below zero.
/// * Otherwise the line discounts apply and `discount_amount` is their sum.
///
/// Tax is charged on the discounted subtotal.
pub fn compute_totals(items: &[LineItem], global: &GlobalDiscount, tax_rate: f64) -> OrderTotals {
    let raw = raw_subtotal(items);
    let subtotal = if global.is_active() {
        match global.kind {
            DiscountKind::Percentage => raw * (1.0 - global.value / 100.0),
            DiscountKind::Fixed => raw - global.value.min(raw).max(0.0),
        }
    } else {
        items
            .iter()
            .map(|i| line_total(i.quantity, i.unit_price, i.discount))
            .sum()
    };
    let tax_amount = subtotal * (tax_rate / 100.0);
    OrderTotals {
        subtotal,
        discount_amount: raw - subtotal,
        tax_amount,
        total_amount: subtotal + tax_amount,
    }
}

/// Which form a document comes from; decides the mandatory item fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Invoices describe each line in free text.
    Invoice,
    /// Customer orders reference a catalog product per line.
    Order,
}

/// Check the items before a document is submitted.
pub fn validate_items(kind: DocumentKind, items: &[LineItem]) -> Result<()> {
    if items.is_empty() {
        return Err(EngineError::validation("at least one line item is required"));
    }
    for (index, item) in items.iter().enumerate() {
        let line = index + 1;
        match kind {
            DocumentKind::Invoice if item.description.trim().is_empty() => {
                return Err(EngineError::validation(format!("line {line}: description is required")));
            }
            DocumentKind::Order if item.product.as_deref().map_or(true, str::is_empty) => {
                return Err(EngineError::validation(format!("line {line}: product is required")));
            }
            _ => {}
        }
        if !(item.quantity > 0.0) {
            return Err(EngineError::validation(format!(
                "line {line}: quantity must be positive, got {}",
                item.quantity
            )));
        }
        if !(item.unit_price > 0.0) {
            return Err(EngineError::validation(format!(
                "line {line}: unit price must be positive, got {}",
                item.unit_price
            )));
        }
        if !(0.0..=100.0).contains(&item.discount) {
            return Err(EngineError::validation(format!(
                "line {line}: discount must be between 0 and 100, got {}",
                item.discount
            )));
        }
    }
    Ok(())
}
