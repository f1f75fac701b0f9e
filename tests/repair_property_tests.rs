//! Property-based tests for counterparty linkage repair
//!
//! Repair must synthesize links from the party list whenever none are
//! usable, leave linked or party-less records alone, and be idempotent
//! down to the canonical bytes of the record.

use proptest::prelude::*;
use serde_json::json;
use trade_extract::{
    diagnostics::{Severity, build_report},
    document::DocumentTree,
    extract::extract,
    kind::classify,
    repair::{RepairOutcome, repair_counterparty_linkage, repair_linkage},
    trade::{CanonicalTradeRecord, CounterpartyRole, Party, Trade},
};

// PROPERTY TEST STRATEGIES

/// Strategy to generate a party with a name and optionally an LEI and keys
fn party_strategy() -> impl Strategy<Value = Party> {
    (
        "[A-Z][a-z]{2,10}",
        proptest::option::of("[0-9A-Z]{20}"),
        proptest::option::of("[a-z]{3,8}"),
    )
        .prop_map(|(name, lei, key)| {
            let party = Party::new(&name);
            let party = match lei {
                Some(lei) => party.add_identifier(&lei, "LEI"),
                None => party,
            };
            match key {
                Some(key) => party.set_external_key(&key),
                None => party,
            }
        })
}

/// Strategy to generate an unlinked trade with the given range of parties
fn unlinked_record_strategy(
    parties: std::ops::Range<usize>,
) -> impl Strategy<Value = CanonicalTradeRecord> {
    prop::collection::vec(party_strategy(), parties).prop_map(|parties| {
        // global keys keep generated parties distinct
        let trade = parties
            .into_iter()
            .enumerate()
            .map(|(i, party)| party.set_global_key(&format!("party-{i}")))
            .fold(Trade::new(), Trade::add_party);
        CanonicalTradeRecord::new(trade)
    })
}

proptest! {
    /// Two or more unlinked parties always end up as exactly two links,
    /// Party1 to party[0] and Party2 to party[1]
    #[test]
    fn links_first_two_parties(record in unlinked_record_strategy(2..6)) {
        let repaired = repair_counterparty_linkage(record.clone());
        let links = repaired.trade.counterparties();

        prop_assert_eq!(links.len(), 2);
        prop_assert_eq!(links[0].role, Some(CounterpartyRole::Party1));
        prop_assert_eq!(links[1].role, Some(CounterpartyRole::Party2));

        let first = repaired.trade.resolve_party(links[0].party_reference.as_ref().unwrap());
        let second = repaired.trade.resolve_party(links[1].party_reference.as_ref().unwrap());
        prop_assert_eq!(first.map(|(i, _)| i), Some(0));
        prop_assert_eq!(second.map(|(i, _)| i), Some(1));

        // the party list itself is untouched
        prop_assert_eq!(&repaired.trade.party, &record.trade.party);
    }

    /// Repairing twice gives byte-identical canonical output
    #[test]
    fn repair_is_idempotent(record in unlinked_record_strategy(0..5)) {
        let once = repair_counterparty_linkage(record);
        let twice = repair_counterparty_linkage(once.clone());

        let (hash_once, bytes_once) = once.fingerprint().unwrap();
        let (hash_twice, bytes_twice) = twice.fingerprint().unwrap();
        prop_assert_eq!(hash_once, hash_twice);
        prop_assert_eq!(bytes_once, bytes_twice);
    }

    /// A second repair always reports the record as already linked
    #[test]
    fn second_repair_is_a_no_op(record in unlinked_record_strategy(1..5)) {
        let mut record = record;
        let first = repair_linkage(&mut record);
        prop_assert!(matches!(first, RepairOutcome::Linked(_)));
        prop_assert_eq!(repair_linkage(&mut record), RepairOutcome::AlreadyLinked);
    }

    /// Without parties the record is returned unchanged and the report
    /// carries exactly one critical finding
    #[test]
    fn no_parties_is_impossible(
        uti in "[A-Z0-9]{8,16}",
        product_name in proptest::option::of("[A-Za-z]{4,10}")
    ) {
        let mut trade = json!({
            "tradeIdentifier": [{
                "assignedIdentifier": [{"identifier": uti}],
                "identifierType": "UniqueTransactionIdentifier"
            }]
        });
        if let Some(name) = &product_name {
            trade["tradeDate"] = json!("2024-06-01");
            trade["execution"] = json!([{"executionDateTime": "2024-06-01T09:00:00Z"}]);
            trade["tradableProduct"] = json!({"product": {"name": name}});
        }
        let doc = DocumentTree::from(json!({"trade": trade, "state": {}}));

        let extraction = extract(&doc).unwrap();
        let mut record = extraction.record.clone();
        let before = record.clone();
        prop_assert_eq!(repair_linkage(&mut record), RepairOutcome::Impossible);
        prop_assert_eq!(&record, &before);

        let report = build_report(&doc, classify(&doc), &Ok(extraction));
        prop_assert_eq!(report.count(Severity::Critical), 1);
    }
}
