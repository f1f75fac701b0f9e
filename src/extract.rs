//! Ordered extraction strategies reducing envelopes to a canonical trade record
use super::document::DocumentTree;
use super::envelope::{BusinessEvent, ReportableEvent, TradeStateShape, WorkflowStep};
use super::error::{ExtractionFailure, StrategyRejection};
use super::trade::{CanonicalTradeRecord, TRADE_SIGNATURE_FIELDS, Trade};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StrategyKind {
    Direct,
    ViaLifecycleStep,
    ViaLifecycleEnvelope,
    ViaBusinessEvent,
    ViaBareTrade,
}

/// Precedence is fixed and never depends on the input.
pub const STRATEGY_CHAIN: [StrategyKind; 5] = [
    StrategyKind::Direct,
    StrategyKind::ViaLifecycleStep,
    StrategyKind::ViaLifecycleEnvelope,
    StrategyKind::ViaBusinessEvent,
    StrategyKind::ViaBareTrade,
];

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("document root is not an object")]
    NotAnObject,
    #[error("does not decode: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("{0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: CanonicalTradeRecord,
    pub strategy: StrategyKind,
}

pub type ExtractionResult = Result<Extraction, ExtractionFailure>;

/// Runs the strategy chain and returns the first record produced. When
/// every strategy rejects the document, all rejections are returned in
/// attempt order.
pub fn extract(doc: &DocumentTree) -> ExtractionResult {
    let mut rejections = Vec::with_capacity(STRATEGY_CHAIN.len());

    for strategy in STRATEGY_CHAIN {
        match strategy.attempt(doc) {
            Ok(record) => {
                tracing::info!(%strategy, "extracted trade record");
                return Ok(Extraction { record, strategy });
            }
            Err(err) => {
                tracing::debug!(%strategy, reason = %err, "strategy rejected document");
                rejections.push(StrategyRejection {
                    strategy,
                    reason: err.to_string(),
                });
            }
        }
    }

    tracing::warn!(attempted = rejections.len(), "no strategy produced a trade record");
    Err(ExtractionFailure { rejections })
}

impl StrategyKind {
    pub fn attempt(&self, doc: &DocumentTree) -> Result<CanonicalTradeRecord, DecodeError> {
        match self {
            StrategyKind::Direct => direct(doc),
            StrategyKind::ViaLifecycleStep => via_lifecycle_step(doc),
            StrategyKind::ViaLifecycleEnvelope => via_lifecycle_envelope(doc),
            StrategyKind::ViaBusinessEvent => via_business_event(doc),
            StrategyKind::ViaBareTrade => via_bare_trade(doc),
        }
    }
}

fn decode<T: DeserializeOwned>(doc: &DocumentTree) -> Result<T, DecodeError> {
    if !doc.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    Ok(serde_json::from_value(doc.as_value().clone())?)
}

fn into_record(shape: &TradeStateShape) -> Option<CanonicalTradeRecord> {
    shape.trade.clone().map(|trade| CanonicalTradeRecord {
        trade,
        state: shape.state.clone(),
    })
}

fn from_first_after(event: &BusinessEvent) -> Result<CanonicalTradeRecord, DecodeError> {
    let first = event
        .first_after()
        .ok_or(DecodeError::Missing("business event has no after-states"))?;
    into_record(first).ok_or(DecodeError::Missing("after[0] carries no trade"))
}

fn direct(doc: &DocumentTree) -> Result<CanonicalTradeRecord, DecodeError> {
    let shape: TradeStateShape = decode(doc)?;
    into_record(&shape).ok_or(DecodeError::Missing("trade payload is null"))
}

fn via_lifecycle_step(doc: &DocumentTree) -> Result<CanonicalTradeRecord, DecodeError> {
    let step: WorkflowStep = decode(doc)?;
    let event = step
        .business_event
        .as_ref()
        .ok_or(DecodeError::Missing("workflow step has no business event"))?;
    from_first_after(event)
}

fn via_lifecycle_envelope(doc: &DocumentTree) -> Result<CanonicalTradeRecord, DecodeError> {
    let envelope: ReportableEvent = decode(doc)?;
    if envelope.originating_workflow_step.is_none() {
        return Err(DecodeError::Missing("envelope has no originating workflow step"));
    }

    if let Some(record) = envelope
        .business_event()
        .and_then(BusinessEvent::first_after)
        .and_then(into_record)
    {
        return Ok(record);
    }

    envelope
        .reportable_trade
        .as_ref()
        .and_then(into_record)
        .ok_or(DecodeError::Missing(
            "neither the embedded step's after[0] nor the reportable trade carries a trade",
        ))
}

fn via_business_event(doc: &DocumentTree) -> Result<CanonicalTradeRecord, DecodeError> {
    let event: BusinessEvent = decode(doc)?;
    from_first_after(&event)
}

fn via_bare_trade(doc: &DocumentTree) -> Result<CanonicalTradeRecord, DecodeError> {
    if !TRADE_SIGNATURE_FIELDS.iter().any(|f| doc.has_field(f)) {
        return Err(DecodeError::Missing("document carries no trade fields"));
    }
    let trade: Trade = decode(doc)?;
    Ok(CanonicalTradeRecord::new(trade))
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Direct => "direct",
            StrategyKind::ViaLifecycleStep => "via lifecycle step",
            StrategyKind::ViaLifecycleEnvelope => "via lifecycle envelope",
            StrategyKind::ViaBusinessEvent => "via business event",
            StrategyKind::ViaBareTrade => "via bare trade",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trade_json() -> serde_json::Value {
        json!({
            "tradeIdentifier": [{"assignedIdentifier": [{"identifier": "T-1"}]}],
            "party": [{"name": "A"}, {"name": "B"}]
        })
    }

    fn run(value: serde_json::Value) -> ExtractionResult {
        extract(&DocumentTree::from(value))
    }

    #[test]
    fn direct_keeps_state() {
        let extraction = run(json!({"trade": trade_json(), "state": {"positionState": "Executed"}}))
            .unwrap();

        assert_eq!(extraction.strategy, StrategyKind::Direct);
        assert_eq!(
            extraction.record.state,
            Some(json!({"positionState": "Executed"}))
        );
        assert_eq!(extraction.record.trade.party.len(), 2);
    }

    #[test]
    fn step_uses_first_after_state() {
        let extraction = run(json!({
            "businessEvent": {"after": [{"trade": trade_json()}, {"trade": {}}]}
        }))
        .unwrap();

        assert_eq!(extraction.strategy, StrategyKind::ViaLifecycleStep);
        assert_eq!(extraction.record.trade.trade_identifier.len(), 1);
    }

    #[test]
    fn envelope_falls_back_to_reportable_trade() {
        let extraction = run(json!({
            "originatingWorkflowStep": {"businessEvent": {"after": []}},
            "reportableTrade": {"trade": trade_json()}
        }))
        .unwrap();

        assert_eq!(extraction.strategy, StrategyKind::ViaLifecycleEnvelope);
    }

    #[test]
    fn bare_business_event() {
        let extraction = run(json!({
            "intent": "ContractFormation",
            "after": [{"trade": trade_json()}]
        }))
        .unwrap();

        assert_eq!(extraction.strategy, StrategyKind::ViaBusinessEvent);
    }

    #[test]
    fn raw_trade_is_wrapped_without_state() {
        let extraction = run(trade_json()).unwrap();

        assert_eq!(extraction.strategy, StrategyKind::ViaBareTrade);
        assert!(extraction.record.state.is_none());
    }

    #[test]
    fn null_trade_falls_through_every_strategy() {
        let failure = run(json!({"trade": null, "state": {}})).unwrap_err();

        assert_eq!(failure.attempted(), STRATEGY_CHAIN.to_vec());
        assert_eq!(failure.rejections[0].reason, "trade payload is null");
    }

    #[test]
    fn array_root_is_rejected_by_all() {
        let failure = run(json!([{"trade": {}}])).unwrap_err();

        assert_eq!(failure.rejections.len(), 5);
        assert!(
            failure
                .rejections
                .iter()
                .take(4)
                .all(|r| r.reason == "document root is not an object")
        );
    }
}
