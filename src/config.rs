//! Pipeline configuration: fallback literals and the reporting-side assignment
use super::trade::CounterpartyRole;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const PLACEHOLDER_LEI: &str = "UNKNOWN-LEI-PLACEHOLDER";

/// Every value substituted when a field is missing from the input is
/// declared here and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationPolicy {
    pub default_currency: String,
    pub placeholder_lei: String,
    /// Date used when no event date can be found. `None` means today (UTC).
    pub processing_date: Option<NaiveDate>,
}

/// Which counterparty role reports and which is reported against. Supplied
/// by the caller, never inferred from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingSides {
    pub reporting_party: CounterpartyRole,
    pub reporting_counterparty: CounterpartyRole,
}

impl Default for DerivationPolicy {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
            placeholder_lei: PLACEHOLDER_LEI.to_string(),
            processing_date: None,
        }
    }
}

impl DerivationPolicy {
    pub fn set_processing_date(mut self, date: NaiveDate) -> Self {
        self.processing_date = Some(date);
        self
    }
    pub fn set_default_currency(mut self, currency: &str) -> Self {
        self.default_currency = currency.to_string();
        self
    }
    pub fn processing_date(&self) -> NaiveDate {
        self.processing_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

impl Default for ReportingSides {
    fn default() -> Self {
        Self {
            reporting_party: CounterpartyRole::Party1,
            reporting_counterparty: CounterpartyRole::Party2,
        }
    }
}

impl ReportingSides {
    /// The given role reports against the other one.
    pub fn reported_by(role: CounterpartyRole) -> Self {
        match role {
            CounterpartyRole::Party2 => Self {
                reporting_party: CounterpartyRole::Party2,
                reporting_counterparty: CounterpartyRole::Party1,
            },
            _ => Self::default(),
        }
    }
}
