//! Typed lifecycle envelopes that wrap trade records
use super::trade::Trade;
use serde::Deserialize;
use serde_json::Value;

/// A trade record as it appears inside envelopes; the trade itself may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeStateShape {
    #[serde(default)]
    pub trade: Option<Trade>,
    #[serde(default)]
    pub state: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Instruction {
    #[serde(default)]
    pub before: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessEvent {
    #[serde(default)]
    pub after: Option<Vec<TradeStateShape>>,
    #[serde(default)]
    pub instruction: Option<Vec<Instruction>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    #[serde(default)]
    pub business_event: Option<BusinessEvent>,
    #[serde(default)]
    pub proposed_event: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportableEvent {
    #[serde(default)]
    pub originating_workflow_step: Option<WorkflowStep>,
    #[serde(default)]
    pub reportable_trade: Option<TradeStateShape>,
}

impl BusinessEvent {
    pub fn first_after(&self) -> Option<&TradeStateShape> {
        self.after.as_ref().and_then(|states| states.first())
    }
    pub fn after_count(&self) -> usize {
        self.after.as_ref().map_or(0, Vec::len)
    }
    /// Instructions that carry a before-state.
    pub fn before_count(&self) -> usize {
        self.instruction.as_ref().map_or(0, |instructions| {
            instructions
                .iter()
                .filter(|i| i.before.as_ref().is_some_and(|b| !b.is_null()))
                .count()
        })
    }
}

impl ReportableEvent {
    pub fn business_event(&self) -> Option<&BusinessEvent> {
        self.originating_workflow_step
            .as_ref()
            .and_then(|step| step.business_event.as_ref())
    }
}
