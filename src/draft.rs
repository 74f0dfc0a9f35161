//! Invoice and order drafts.
//!
//! A [`DocumentDraft`] is the in-memory document a user edits before it
//! is submitted: its lines, the global discount, tax rate and pricing
//! context. Line totals are refreshed on every edit and the document
//! totals can be read at any time. Nothing reaches the backend until
//! [`submit`] validates the whole draft.

use crate::backend::{DocumentSink, PriceLookup};
use crate::error::{EngineError, Result};
use crate::models::{GlobalDiscount, LineItem, OrderTotals, PriceListSummary};
use crate::orders::{compute_totals, refresh_total, update_line_item, validate_items, DocumentKind, LineField};
use crate::party::{PaymentTerms, RecordParty};
use crate::pricing::{resolve_price, Catalog, PriceResolution, PriceSequencer, PriceTicket, PricingContext};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct DocumentDraft {
    kind: DocumentKind,
    items: Vec<LineItem>,
    line_ids: Vec<u64>,
    next_line_id: u64,
    global_discount: GlobalDiscount,
    tax_rate: f64,
    customer_id: Option<String>,
    price_list: Option<PriceListSummary>,
    use_price_list: bool,
    sequencer: PriceSequencer,
    /// Counterparty the finance record is filed under.
    pub party: RecordParty,
    /// Invoice or order date.
    pub issue_date: NaiveDate,
    /// Explicit due date; derived from the payment terms when `None`.
    pub due_date: Option<NaiveDate>,
    /// Requested delivery date (orders only).
    pub delivery_date: Option<NaiveDate>,
    pub payment_terms: PaymentTerms,
    /// Free text printed on the document.
    pub notes: String,
}

impl DocumentDraft {
    fn new(kind: DocumentKind, issue_date: NaiveDate) -> Self {
        let mut draft = Self {
            kind,
            items: Vec::new(),
            line_ids: Vec::new(),
            next_line_id: 0,
            global_discount: GlobalDiscount::default(),
            tax_rate: 0.0,
            customer_id: None,
            price_list: None,
            use_price_list: true,
            sequencer: PriceSequencer::default(),
            party: RecordParty::default(),
            issue_date,
            due_date: None,
            delivery_date: None,
            payment_terms: PaymentTerms::default(),
            notes: String::new(),
        };
        draft.add_line();
        draft
    }

    /// An invoice issued on `issue_date`, with one empty line.
    pub fn invoice(issue_date: NaiveDate) -> Self {
        Self::new(DocumentKind::Invoice, issue_date)
    }

    /// A customer order placed on `order_date`, with one empty line.
    pub fn order(order_date: NaiveDate) -> Self {
        Self::new(DocumentKind::Order, order_date)
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn global_discount(&self) -> GlobalDiscount {
        self.global_discount
    }

    pub fn tax_rate(&self) -> f64 {
        self.tax_rate
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn price_list(&self) -> Option<&PriceListSummary> {
        self.price_list.as_ref()
    }

    pub fn totals(&self) -> OrderTotals {
        compute_totals(&self.items, &self.global_discount, self.tax_rate)
    }

    /// Due date: explicit if set, otherwise derived from the payment terms.
    pub fn effective_due_date(&self) -> NaiveDate {
        self.due_date
            .unwrap_or_else(|| self.payment_terms.due_date(self.issue_date))
    }

    /// Append an empty line and return its index.
    pub fn add_line(&mut self) -> usize {
        self.next_line_id += 1;
        self.items.push(LineItem::default());
        self.line_ids.push(self.next_line_id);
        self.items.len() - 1
    }

    /// Remove a line. The last remaining line cannot be removed.
    pub fn remove_line(&mut self, index: usize) -> Result<()> {
        if index >= self.items.len() {
            return Err(EngineError::validation(format!("line item {index} does not exist")));
        }
        if self.items.len() == 1 {
            return Err(EngineError::validation("a document needs at least one line"));
        }
        self.items.remove(index);
        let line_id = self.line_ids.remove(index);
        self.sequencer.forget(line_id);
        Ok(())
    }

    /// Edit one field of a line and refresh its total.
    ///
    /// Editing the product or quantity of a line that has a product
    /// returns a ticket for re-pricing it.
    pub fn edit_line(&mut self, index: usize, field: LineField) -> Result<Option<PriceTicket>> {
        let affects_price = field.affects_price();
        self.items = update_line_item(&self.items, index, field)?;
        if affects_price {
            Ok(self.ticket_for(index))
        } else {
            Ok(None)
        }
    }

    fn ticket_for(&mut self, index: usize) -> Option<PriceTicket> {
        let item = self.items.get(index)?;
        let product_id = item.product.clone()?;
        let quantity = item.quantity;
        Some(self.sequencer.issue(self.line_ids[index], product_id, quantity))
    }

    fn tickets_for_all(&mut self) -> Vec<PriceTicket> {
        (0..self.items.len())
            .filter_map(|index| self.ticket_for(index))
            .collect()
    }

    /// Set the global discount. A non-zero value clears every line
    /// discount; line discounts and a global discount are never combined.
    pub fn set_global_discount(&mut self, discount: GlobalDiscount) {
        self.global_discount = discount;
        if discount.value != 0.0 {
            for item in &mut self.items {
                item.discount = 0.0;
                refresh_total(item);
            }
        }
    }

    pub fn set_tax_rate(&mut self, tax_rate: f64) {
        self.tax_rate = tax_rate;
    }

    /// Change the customer. The selected price list belonged to the
    /// previous customer, so it is dropped; every priced line is
    /// re-priced. Clearing the customer also clears a customer party.
    pub fn set_customer(&mut self, customer_id: Option<String>) -> Vec<PriceTicket> {
        self.customer_id = customer_id.filter(|c| !c.is_empty());
        self.price_list = None;
        match &self.customer_id {
            Some(customer) => self.party = RecordParty::customer(customer.clone()),
            None if matches!(self.party, RecordParty::Customer { .. }) => {
                self.party = RecordParty::default();
            }
            None => {}
        }
        self.tickets_for_all()
    }

    pub fn select_price_list(&mut self, price_list: Option<PriceListSummary>) -> Vec<PriceTicket> {
        self.price_list = price_list;
        self.tickets_for_all()
    }

    pub fn set_use_price_list(&mut self, enabled: bool) -> Vec<PriceTicket> {
        self.use_price_list = enabled;
        self.tickets_for_all()
    }

    pub fn pricing_context(&self) -> PricingContext {
        PricingContext {
            customer_id: self.customer_id.clone(),
            price_list_id: self.price_list.as_ref().map(|l| l.id.clone()),
            use_price_list: self.use_price_list,
        }
    }

    /// Apply a resolved price if `ticket` is still the newest for its
    /// line. Returns whether anything changed.
    pub fn apply_price(&mut self, ticket: &PriceTicket, resolution: PriceResolution) -> bool {
        if !self.sequencer.is_current(ticket) {
            debug!(line = ticket.line_id, token = ticket.token, "discarding stale price");
            return false;
        }
        let Some(index) = self.line_ids.iter().position(|id| *id == ticket.line_id) else {
            return false;
        };
        let item = &mut self.items[index];
        match resolution {
            PriceResolution::PriceList {
                unit_price,
                discount_percent,
                base_price,
            } => {
                item.unit_price = unit_price;
                item.discount_percent = Some(discount_percent);
                item.base_price = Some(base_price);
            }
            PriceResolution::Catalog { unit_price } => {
                item.unit_price = unit_price;
                item.discount_percent = None;
                item.base_price = None;
            }
        }
        refresh_total(item);
        true
    }

    /// Resolve and apply `tickets` one after another.
    pub async fn reprice<L>(&mut self, lookup: &L, catalog: &Catalog, tickets: Vec<PriceTicket>)
    where
        L: PriceLookup + ?Sized,
    {
        let context = self.pricing_context();
        for ticket in tickets {
            if let Some(resolution) = resolve_price(lookup, catalog, &context, &ticket).await {
                self.apply_price(&ticket, resolution);
            }
        }
    }

    /// Check the whole draft before submission.
    pub fn validate(&self) -> Result<()> {
        if self.kind == DocumentKind::Order && self.customer_id.is_none() {
            return Err(EngineError::validation("a customer is required"));
        }
        if !(0.0..=100.0).contains(&self.tax_rate) {
            return Err(EngineError::validation(format!(
                "tax rate must be between 0 and 100, got {}",
                self.tax_rate
            )));
        }
        if self.global_discount.value < 0.0 {
            return Err(EngineError::validation("global discount cannot be negative"));
        }
        validate_items(self.kind, &self.items)
    }

    pub fn invoice_payload(&self) -> Result<InvoicePayload> {
        if self.kind != DocumentKind::Invoice {
            return Err(EngineError::validation("draft is not an invoice"));
        }
        self.validate()?;
        Ok(InvoicePayload {
            customer_id: self.party.customer_id().map(str::to_string),
            party: self.party.clone(),
            issue_date: self.issue_date,
            due_date: self.effective_due_date(),
            items: self.items.clone(),
            global_discount: self.global_discount,
            tax_rate: self.tax_rate,
            notes: self.notes.clone(),
            payment_terms: self.payment_terms,
        })
    }

    pub fn order_payload(&self) -> Result<OrderPayload> {
        if self.kind != DocumentKind::Order {
            return Err(EngineError::validation("draft is not an order"));
        }
        self.validate()?;
        let global_active = self.global_discount.is_active();
        let items = self
            .items
            .iter()
            .map(|item| OrderLinePayload {
                product: item.product.clone().unwrap_or_default(),
                quantity: item.quantity,
                discount: if global_active { 0.0 } else { item.discount },
                unit_price: item.unit_price,
            })
            .collect();
        Ok(OrderPayload {
            customer: self.customer_id.clone().unwrap_or_default(),
            order_date: self.issue_date,
            delivery_date: self.delivery_date,
            items,
            global_discount: self.global_discount,
            tax_rate: self.tax_rate,
            notes: self.notes.clone(),
            payment_terms: self.payment_terms,
        })
    }
}

/// Body of `POST /invoices`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    /// Customer the invoice is billed to, if one is chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(flatten)]
    pub party: RecordParty,
    pub issue_date: NaiveDate,
    /// Explicit due date, or the one implied by the payment terms.
    pub due_date: NaiveDate,
    /// Lines with their totals recomputed.
    pub items: Vec<LineItem>,
    pub global_discount: GlobalDiscount,
    /// Tax percentage.
    pub tax_rate: f64,
    pub notes: String,
    pub payment_terms: PaymentTerms,
}

/// Body of `POST /CustomerOrder`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    /// Customer id; orders always have one.
    pub customer: String,
    pub order_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    /// Lines reduced to what the order endpoint accepts.
    pub items: Vec<OrderLinePayload>,
    /// Order-wide discount.
    pub global_discount: GlobalDiscount,
    pub tax_rate: f64,
    /// Free text printed on the order.
    pub notes: String,
    pub payment_terms: PaymentTerms,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLinePayload {
    /// Catalog product id.
    pub product: String,
    pub quantity: f64,
    /// Line discount percentage; 0 while a global discount is active.
    pub discount: f64,
    /// Unit price after any price list was applied.
    pub unit_price: f64,
}

/// Validate and submit a draft. Invalid drafts never reach the sink.
pub async fn submit<S>(sink: &S, draft: &DocumentDraft) -> Result<Value>
where
    S: DocumentSink + ?Sized,
{
    let created = match draft.kind() {
        DocumentKind::Invoice => sink.create_invoice(&draft.invoice_payload()?).await?,
        DocumentKind::Order => sink.create_order(&draft.order_payload()?).await?,
    };
    let totals = draft.totals();
    info!(
        kind = ?draft.kind(),
        lines = draft.items().len(),
        total = totals.total_amount,
        "document submitted"
    );
    Ok(created)
}
