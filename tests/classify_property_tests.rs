//! Property-based tests for document classification
//!
//! Classification looks only at top-level field names, so these tests
//! generate documents from sets of names and check that the fixed
//! precedence holds regardless of what else the document carries.

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use trade_extract::{
    document::DocumentTree,
    extract::{StrategyKind, extract},
    kind::{DocumentKind, classify},
};

// Names that take part in a classification signature
const SIGNATURE_NAMES: &[&str] = &[
    "trade",
    "state",
    "originatingWorkflowStep",
    "businessEvent",
    "instruction",
    "proposedEvent",
];

// PROPERTY TEST STRATEGIES

/// Strategy to generate field names that never collide with a signature
fn noise_name_strategy() -> impl Strategy<Value = String> {
    "[a-z]{3,12}".prop_filter("signature name", |name| {
        !SIGNATURE_NAMES.contains(&name.as_str())
    })
}

/// Strategy to generate an arbitrary JSON leaf value
fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
        Just(json!({})),
        Just(json!([])),
    ]
}

/// Strategy to generate a map of noise fields
fn noise_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(noise_name_strategy(), leaf_strategy(), 0..6)
        .prop_map(|fields| fields.into_iter().collect())
}

fn document(mut fields: Map<String, Value>, present: &[&str]) -> DocumentTree {
    for name in present {
        fields.insert(name.to_string(), json!({}));
    }
    DocumentTree::from(Value::Object(fields))
}

proptest! {
    /// Any document with a trade and no state is a bare trade record,
    /// unless a lifecycle envelope field is also present
    #[test]
    fn trade_without_state_is_bare(noise in noise_strategy()) {
        let doc = document(noise, &["trade"]);
        prop_assert_eq!(classify(&doc), DocumentKind::BareTradeRecord);
    }

    /// Trade and state together always classify as a trade record with state
    #[test]
    fn trade_with_state(noise in noise_strategy()) {
        let doc = document(noise, &["trade", "state"]);
        prop_assert_eq!(classify(&doc), DocumentKind::TradeRecordWithState);
    }

    /// The envelope signature takes precedence over every other signature
    #[test]
    fn envelope_wins(
        noise in noise_strategy(),
        others in proptest::sample::subsequence(SIGNATURE_NAMES.to_vec(), 0..=SIGNATURE_NAMES.len())
    ) {
        let mut present = others;
        present.push("originatingWorkflowStep");
        let doc = document(noise, &present);
        prop_assert_eq!(classify(&doc), DocumentKind::LifecycleEventEnvelope);
    }

    /// A business event beats trade fields when no envelope is present
    #[test]
    fn business_event_beats_trade(
        noise in noise_strategy(),
        with_state in any::<bool>()
    ) {
        let present: &[&str] = if with_state {
            &["businessEvent", "trade", "state"]
        } else {
            &["businessEvent", "trade"]
        };
        let doc = document(noise, present);
        prop_assert_eq!(classify(&doc), DocumentKind::LifecycleEventStep);
    }

    /// Documents carrying no signature field are unknown, and classification
    /// of the same document is always the same
    #[test]
    fn noise_only_is_unknown(noise in noise_strategy()) {
        let doc = document(noise, &[]);
        prop_assert_eq!(classify(&doc), DocumentKind::Unknown);
        prop_assert_eq!(classify(&doc), classify(&doc.clone()));
    }

    /// Extraction never panics on noise and, when it fails, reports all
    /// five strategies in chain order
    #[test]
    fn extraction_on_noise_is_total(noise in noise_strategy()) {
        let doc = document(noise, &[]);
        if let Err(failure) = extract(&doc) {
            prop_assert_eq!(
                failure.attempted(),
                vec![
                    StrategyKind::Direct,
                    StrategyKind::ViaLifecycleStep,
                    StrategyKind::ViaLifecycleEnvelope,
                    StrategyKind::ViaBusinessEvent,
                    StrategyKind::ViaBareTrade,
                ]
            );
        }
    }
}
