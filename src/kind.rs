//! Envelope-shape classification of input documents
use super::document::DocumentTree;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentKind {
    /// `{"trade": ..., "state": ...}`
    TradeRecordWithState,
    /// `{"trade": ...}` without a state
    BareTradeRecord,
    /// A reportable event wrapping an originating workflow step
    LifecycleEventEnvelope,
    /// A workflow step carrying a business event or a proposed instruction
    LifecycleEventStep,
    /// A business event with before/after states at the root
    BusinessEventRecord,
    Unknown,
}

struct Signature {
    all_of: &'static [&'static str],
    none_of: &'static [&'static str],
    kind: DocumentKind,
}

// Evaluated top to bottom, first match wins.
const SIGNATURES: &[Signature] = &[
    Signature {
        all_of: &["originatingWorkflowStep"],
        none_of: &[],
        kind: DocumentKind::LifecycleEventEnvelope,
    },
    Signature {
        all_of: &["businessEvent"],
        none_of: &[],
        kind: DocumentKind::LifecycleEventStep,
    },
    Signature {
        all_of: &["trade"],
        none_of: &["state"],
        kind: DocumentKind::BareTradeRecord,
    },
    Signature {
        all_of: &["trade", "state"],
        none_of: &[],
        kind: DocumentKind::TradeRecordWithState,
    },
    Signature {
        all_of: &["instruction"],
        none_of: &[],
        kind: DocumentKind::LifecycleEventStep,
    },
    Signature {
        all_of: &["proposedEvent"],
        none_of: &[],
        kind: DocumentKind::LifecycleEventStep,
    },
];

impl Signature {
    fn matches(&self, doc: &DocumentTree) -> bool {
        self.all_of.iter().all(|name| doc.has_field(name))
            && !self.none_of.iter().any(|name| doc.has_field(name))
    }
}

/// Classifies a document by its top-level field names. Total: anything
/// that matches no signature is [`DocumentKind::Unknown`].
pub fn classify(doc: &DocumentTree) -> DocumentKind {
    tracing::debug!(fields = ?doc.field_names(), "classifying document");

    SIGNATURES
        .iter()
        .find(|sig| sig.matches(doc))
        .map(|sig| sig.kind)
        .unwrap_or(DocumentKind::Unknown)
}

impl DocumentKind {
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            DocumentKind::LifecycleEventEnvelope | DocumentKind::LifecycleEventStep
        )
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::TradeRecordWithState => "trade record with state",
            DocumentKind::BareTradeRecord => "bare trade record",
            DocumentKind::LifecycleEventEnvelope => "lifecycle event envelope",
            DocumentKind::LifecycleEventStep => "lifecycle event step",
            DocumentKind::BusinessEventRecord => "business event record",
            DocumentKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
