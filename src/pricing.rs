//! Customer price lists.
//!
//! When an order has a customer and an active price list, the unit price
//! of a line comes from the backend's price-list lookup instead of the
//! catalog. Each edit of a line's product or quantity issues a
//! [`PriceTicket`]; lookups may overlap and finish in any order, so a
//! result is applied only while its ticket is still the newest one for
//! that line.

use crate::backend::PriceLookup;
use crate::models::{PriceListSummary, Product};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Pick the price list for `customer_id`: one bound to that customer if
/// any, otherwise a general one.
pub fn select_price_list<'a>(
    lists: &'a [PriceListSummary],
    customer_id: &str,
) -> Option<&'a PriceListSummary> {
    lists
        .iter()
        .find(|l| l.customer_id.as_deref() == Some(customer_id))
        .or_else(|| lists.iter().find(|l| l.customer_id.is_none()))
}

/// A pending price lookup for one line.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTicket {
    /// Stable id of the line, unaffected by other lines being removed.
    pub line_id: u64,
    /// Sequence number; only the newest ticket per line is applied.
    pub token: u64,
    /// Product whose price is requested.
    pub product_id: String,
    /// Quantity sent with the lookup; tiered prices depend on it.
    pub quantity: f64,
}

/// Where a line's unit price came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceResolution {
    PriceList {
        unit_price: f64,
        discount_percent: f64,
        base_price: f64,
    },
    Catalog {
        unit_price: f64,
    },
}

/// Hands out monotonically increasing tokens and remembers the newest
/// one per line.
#[derive(Debug, Clone, Default)]
pub struct PriceSequencer {
    next_token: u64,
    latest: HashMap<u64, u64>,
}

impl PriceSequencer {
    pub fn issue(&mut self, line_id: u64, product_id: String, quantity: f64) -> PriceTicket {
        self.next_token += 1;
        self.latest.insert(line_id, self.next_token);
        PriceTicket {
            line_id,
            token: self.next_token,
            product_id,
            quantity,
        }
    }

    pub fn is_current(&self, ticket: &PriceTicket) -> bool {
        self.latest.get(&ticket.line_id) == Some(&ticket.token)
    }

    /// Forget a removed line; its outstanding tickets become stale.
    pub fn forget(&mut self, line_id: u64) {
        self.latest.remove(&line_id);
    }
}

/// Inputs deciding whether the price list is consulted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingContext {
    /// Customer selected on the draft.
    pub customer_id: Option<String>,
    /// Price list chosen for that customer, if any.
    pub price_list_id: Option<String>,
    /// Whether the user has price lists enabled.
    pub use_price_list: bool,
}

impl PricingContext {
    fn customer(&self) -> Option<&str> {
        if !self.use_price_list || self.price_list_id.is_none() {
            return None;
        }
        self.customer_id.as_deref().filter(|c| !c.is_empty())
    }
}

/// Catalog prices keyed by product id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    prices: HashMap<String, f64>,
}

impl Catalog {
    pub fn new(products: &[Product]) -> Self {
        Self {
            prices: products
                .iter()
                .map(|p| (p.id.clone(), p.unit_price))
                .collect(),
        }
    }

    pub fn unit_price(&self, product_id: &str) -> Option<f64> {
        self.prices.get(product_id).copied()
    }
}

/// Resolve the unit price for `ticket`.
///
/// Uses the price list when the context allows it; a failed lookup is
/// logged and falls back to the catalog. Returns `None` when the product
/// is not in the catalog either, leaving the line unchanged.
pub async fn resolve_price<L>(
    lookup: &L,
    catalog: &Catalog,
    context: &PricingContext,
    ticket: &PriceTicket,
) -> Option<PriceResolution>
where
    L: PriceLookup + ?Sized,
{
    if let Some(customer_id) = context.customer() {
        let quantity = if ticket.quantity > 0.0 { ticket.quantity } else { 1.0 };
        match lookup
            .get_price(customer_id, &ticket.product_id, quantity)
            .await
        {
            Ok(quote) => {
                debug!(product = %ticket.product_id, price = quote.price, "price list price");
                return Some(PriceResolution::PriceList {
                    unit_price: quote.price,
                    discount_percent: quote.discount_percent,
                    base_price: quote.base_price.unwrap_or(quote.price),
                });
            }
            Err(err) => {
                warn!(
                    product = %ticket.product_id,
                    customer = %customer_id,
                    error = %err,
                    "price list lookup failed, using catalog price"
                );
            }
        }
    }
    catalog
        .unit_price(&ticket.product_id)
        .map(|unit_price| PriceResolution::Catalog { unit_price })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, Result};
    use crate::models::PriceQuote;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn list(id: &str, customer: Option<&str>) -> PriceListSummary {
        PriceListSummary {
            id: id.into(),
            name: id.into(),
            customer_id: customer.map(str::to_string),
            status: "Active".into(),
        }
    }

    struct FixedLookup {
        fail: bool,
        calls: AtomicUsize,
        last_quantity: Mutex<Option<f64>>,
    }

    impl FixedLookup {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
                last_quantity: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl PriceLookup for FixedLookup {
        async fn get_price(&self, _customer: &str, _product: &str, quantity: f64) -> Result<PriceQuote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_quantity.lock().unwrap() = Some(quantity);
            if self.fail {
                return Err(EngineError::lookup("no price list matches"));
            }
            Ok(PriceQuote {
                success: true,
                price: 8.0,
                discount_percent: 20.0,
                base_price: Some(10.0),
                message: None,
            })
        }

        async fn customer_price_lists(&self) -> Result<Vec<PriceListSummary>> {
            Ok(vec![])
        }

        async fn products(&self) -> Result<Vec<Product>> {
            Ok(vec![])
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(&[Product {
            id: "p1".into(),
            name: "Widget".into(),
            unit_price: 10.0,
        }])
    }

    fn context() -> PricingContext {
        PricingContext {
            customer_id: Some("c1".into()),
            price_list_id: Some("pl1".into()),
            use_price_list: true,
        }
    }

    #[test]
    fn test_prefers_customer_specific_list() {
        let lists = vec![list("general", None), list("vip", Some("c1"))];
        assert_eq!(select_price_list(&lists, "c1").unwrap().id, "vip");
        assert_eq!(select_price_list(&lists, "c2").unwrap().id, "general");
        assert!(select_price_list(&[list("other", Some("c3"))], "c1").is_none());
    }

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let mut seq = PriceSequencer::default();
        let first = seq.issue(1, "p1".into(), 1.0);
        let second = seq.issue(1, "p1".into(), 5.0);
        let other = seq.issue(2, "p2".into(), 1.0);
        assert!(!seq.is_current(&first));
        assert!(seq.is_current(&second));
        assert!(seq.is_current(&other));
        seq.forget(2);
        assert!(!seq.is_current(&other));
    }

    #[tokio::test]
    async fn test_uses_price_list_when_available() {
        let lookup = FixedLookup::new(false);
        let mut seq = PriceSequencer::default();
        let ticket = seq.issue(1, "p1".into(), 0.0);
        let resolved = resolve_price(&lookup, &catalog(), &context(), &ticket).await;
        assert_eq!(
            resolved,
            Some(PriceResolution::PriceList {
                unit_price: 8.0,
                discount_percent: 20.0,
                base_price: 10.0
            })
        );
        assert_eq!(*lookup.last_quantity.lock().unwrap(), Some(1.0));
    }

    #[tokio::test]
    async fn test_failed_lookup_falls_back_to_catalog() {
        let lookup = FixedLookup::new(true);
        let mut seq = PriceSequencer::default();
        let ticket = seq.issue(1, "p1".into(), 2.0);
        let resolved = resolve_price(&lookup, &catalog(), &context(), &ticket).await;
        assert_eq!(resolved, Some(PriceResolution::Catalog { unit_price: 10.0 }));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_price_list_means_no_lookup() {
        let lookup = FixedLookup::new(false);
        let mut seq = PriceSequencer::default();
        let ticket = seq.issue(1, "p1".into(), 2.0);
        for ctx in [
            PricingContext { use_price_list: false, ..context() },
            PricingContext { price_list_id: None, ..context() },
            PricingContext { customer_id: None, ..context() },
        ] {
            let resolved = resolve_price(&lookup, &catalog(), &ctx, &ticket).await;
            assert_eq!(resolved, Some(PriceResolution::Catalog { unit_price: 10.0 }));
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);

        let unknown = seq.issue(2, "missing".into(), 1.0);
        let ctx = PricingContext::default();
        assert_eq!(resolve_price(&lookup, &catalog(), &ctx, &unknown).await, None);
    }
}
