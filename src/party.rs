//! Counterparties and payment terms of financial documents.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Who a financial record or invoice is about, keyed by `recordType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "recordType", rename_all = "lowercase")]
pub enum RecordParty {
    Supplier {
        #[serde(rename = "partyId")]
        party_id: String,
    },
    Employee {
        #[serde(rename = "partyId")]
        party_id: String,
    },
    Customer {
        #[serde(rename = "partyId")]
        party_id: String,
    },
    Other {
        #[serde(
            rename = "otherDetails",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        details: Option<String>,
    },
}

impl Default for RecordParty {
    fn default() -> Self {
        RecordParty::Other { details: None }
    }
}

impl RecordParty {
    pub fn customer(id: impl Into<String>) -> Self {
        RecordParty::Customer { party_id: id.into() }
    }

    pub fn supplier(id: impl Into<String>) -> Self {
        RecordParty::Supplier { party_id: id.into() }
    }

    /// Referenced record id; `Other` parties reference nothing.
    pub fn party_id(&self) -> Option<&str> {
        match self {
            RecordParty::Supplier { party_id }
            | RecordParty::Employee { party_id }
            | RecordParty::Customer { party_id } => Some(party_id),
            RecordParty::Other { .. } => None,
        }
    }

    pub fn customer_id(&self) -> Option<&str> {
        match self {
            RecordParty::Customer { party_id } => Some(party_id),
            RecordParty::Supplier { .. } | RecordParty::Employee { .. } | RecordParty::Other { .. } => {
                None
            }
        }
    }

    pub fn record_type(&self) -> &'static str {
        match self {
            RecordParty::Supplier { .. } => "supplier",
            RecordParty::Employee { .. } => "employee",
            RecordParty::Customer { .. } => "customer",
            RecordParty::Other { .. } => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentTerms {
    Immediate,
    #[default]
    #[serde(rename = "Net 30")]
    Net30,
    #[serde(rename = "Net 45")]
    Net45,
    #[serde(rename = "Net 60")]
    Net60,
    #[serde(rename = "Net 90")]
    Net90,
}

impl PaymentTerms {
    pub fn days(self) -> u64 {
        match self {
            PaymentTerms::Immediate => 0,
            PaymentTerms::Net30 => 30,
            PaymentTerms::Net45 => 45,
            PaymentTerms::Net60 => 60,
            PaymentTerms::Net90 => 90,
        }
    }

    /// Payment due date for a document issued on `issued`.
    pub fn due_date(self, issued: NaiveDate) -> NaiveDate {
        issued.checked_add_days(Days::new(self.days())).unwrap_or(issued)
    }
}
