//! Secondary field derivation with provenance-tagged fallbacks
//!
//! Each field walks its own ordered chain of lookups. The first lookup that
//! yields a value wins and the result is tagged `Extracted`; when none do,
//! the policy value is used and tagged `Defaulted`. Nothing here fails.
use super::config::DerivationPolicy;
use super::trade::{CanonicalTradeRecord, Trade, date_part, lookup, scalar_text};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provenance {
    Extracted,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedField<T> {
    pub value: T,
    pub provenance: Provenance,
}

/// The derived values handed to the reporting engine with the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedFields {
    pub currency: DerivedField<String>,
    /// A defaulted notional is unknown, never zero.
    pub notional: DerivedField<Option<Decimal>>,
    pub event_date: DerivedField<NaiveDate>,
    pub reporting_lei: DerivedField<String>,
}

type Step<T> = fn(&Trade) -> Option<T>;

const CURRENCY_STEPS: &[Step<String>] = &[notional_unit_currency];
const NOTIONAL_STEPS: &[Step<Decimal>] = &[direct_notional, first_scheduled_notional];
const EVENT_DATE_STEPS: &[Step<NaiveDate>] = &[trade_date, first_execution_date, effective_date];
const REPORTING_LEI_STEPS: &[Step<String>] = &[first_party_lei];

impl<T> DerivedField<T> {
    pub fn extracted(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Extracted,
        }
    }
    pub fn defaulted(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Defaulted,
        }
    }
    pub fn is_defaulted(&self) -> bool {
        self.provenance == Provenance::Defaulted
    }
}

fn first_extracted<T>(trade: &Trade, steps: &[Step<T>]) -> Option<T> {
    steps.iter().find_map(|step| step(trade))
}

pub fn derive_currency(record: &CanonicalTradeRecord, policy: &DerivationPolicy) -> DerivedField<String> {
    match first_extracted(&record.trade, CURRENCY_STEPS) {
        Some(currency) => {
            tracing::info!(%currency, "extracted currency");
            DerivedField::extracted(currency)
        }
        None => {
            tracing::warn!(default = %policy.default_currency, "no payout currency, using default");
            DerivedField::defaulted(policy.default_currency.clone())
        }
    }
}

pub fn derive_notional(record: &CanonicalTradeRecord) -> DerivedField<Option<Decimal>> {
    match first_extracted(&record.trade, NOTIONAL_STEPS) {
        Some(amount) => {
            tracing::info!(%amount, "extracted notional amount");
            DerivedField::extracted(Some(amount))
        }
        None => {
            tracing::warn!("no notional amount, continuing without one");
            DerivedField::defaulted(None)
        }
    }
}

pub fn derive_event_date(
    record: &CanonicalTradeRecord,
    policy: &DerivationPolicy,
) -> DerivedField<NaiveDate> {
    match first_extracted(&record.trade, EVENT_DATE_STEPS) {
        Some(date) => {
            tracing::info!(%date, "extracted event date");
            DerivedField::extracted(date)
        }
        None => {
            let date = policy.processing_date();
            tracing::warn!(%date, "no event date, using processing date");
            DerivedField::defaulted(date)
        }
    }
}

pub fn derive_reporting_lei(
    record: &CanonicalTradeRecord,
    policy: &DerivationPolicy,
) -> DerivedField<String> {
    match first_extracted(&record.trade, REPORTING_LEI_STEPS) {
        Some(lei) => {
            tracing::info!(%lei, "extracted reporting party LEI");
            DerivedField::extracted(lei)
        }
        None => {
            tracing::warn!("no party carries an LEI, using placeholder");
            DerivedField::defaulted(policy.placeholder_lei.clone())
        }
    }
}

pub fn derive_all(record: &CanonicalTradeRecord, policy: &DerivationPolicy) -> DerivedFields {
    DerivedFields {
        currency: derive_currency(record, policy),
        notional: derive_notional(record),
        event_date: derive_event_date(record, policy),
        reporting_lei: derive_reporting_lei(record, policy),
    }
}

fn notional_unit_currency(trade: &Trade) -> Option<String> {
    let notional = trade.first_payout_leg()?.get("notionalAmount")?;
    lookup(notional, &["currency"])
        .or_else(|| lookup(notional, &["unit", "currency"]))
        .and_then(scalar_text)
}

fn direct_notional(trade: &Trade) -> Option<Decimal> {
    let leg = trade.first_payout_leg()?;
    lookup(leg, &["notionalAmount", "amount"])
        .and_then(scalar_text)
        .and_then(|text| parse_decimal(&text))
}

fn first_scheduled_notional(trade: &Trade) -> Option<Decimal> {
    let schedule = lookup(trade.first_payout_leg()?, &["notionalSchedule", "notionalStepSchedule"])?;
    let amount = match schedule.as_array() {
        Some(steps) => steps.first().and_then(|s| lookup(s, &["notionalAmount"])),
        None => lookup(schedule, &["initialValue"])
            .or_else(|| lookup(schedule, &["step"])?.as_array()?.first()?.get("stepValue")),
    }?;
    scalar_text(amount).and_then(|text| parse_decimal(&text))
}

fn trade_date(trade: &Trade) -> Option<NaiveDate> {
    trade.trade_date_value()
}

fn first_execution_date(trade: &Trade) -> Option<NaiveDate> {
    let stamp = trade.execution.first()?.execution_date_time.as_ref()?;
    date_part(stamp.value())
}

fn effective_date(trade: &Trade) -> Option<NaiveDate> {
    let date = lookup(
        trade.economic_terms()?,
        &["effectiveDate", "adjustableDate", "unadjustedDate"],
    )?;
    scalar_text(date).and_then(|text| date_part(&text))
}

fn first_party_lei(trade: &Trade) -> Option<String> {
    trade.party.iter().find_map(|p| p.lei()).map(str::to_string)
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Extracted => f.write_str("extracted"),
            Provenance::Defaulted => f.write_str("defaulted"),
        }
    }
}
