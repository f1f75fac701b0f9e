//! Counterparty-role linkage repair
//!
//! Reporting engines need role-qualified counterparty references and produce
//! incomplete reports when a trade only has a flat party list. Repair
//! synthesizes the missing links from that list.
//!
//! Party order is taken to be role order: `party[0]` becomes `Party1` and
//! `party[1]` becomes `Party2`. Nothing in the input states this; it is the
//! convention producers follow.
//!
//! Synthesized links carry the party's keys as well as the party itself.
//! Two parties with identical contents and no keys cannot be told apart,
//! so a link to the second one resolves to the first.
use super::trade::{CanonicalTradeRecord, Counterparty, CounterpartyRole, TradableProduct};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RepairOutcome {
    /// At least one link already had a role and a party reference.
    AlreadyLinked,
    /// Links were synthesized for these roles.
    Linked(Vec<CounterpartyRole>),
    /// No parties to link. The record is left as it was.
    Impossible,
}

const ROLE_ORDER: [CounterpartyRole; 2] = [CounterpartyRole::Party1, CounterpartyRole::Party2];

/// Adds counterparty links when none are usable. Idempotent.
pub fn repair_counterparty_linkage(mut record: CanonicalTradeRecord) -> CanonicalTradeRecord {
    repair_linkage(&mut record);
    record
}

/// In-place repair reporting what was done.
pub fn repair_linkage(record: &mut CanonicalTradeRecord) -> RepairOutcome {
    let trade = &mut record.trade;

    if trade.has_role_links() {
        tracing::info!("counterparties are already linked");
        return RepairOutcome::AlreadyLinked;
    }

    if trade.party.is_empty() {
        tracing::warn!("cannot link counterparties, trade has no parties");
        return RepairOutcome::Impossible;
    }

    let links: Vec<Counterparty> = ROLE_ORDER
        .iter()
        .zip(trade.party.iter())
        .map(|(role, party)| Counterparty::new(*role, party))
        .collect();
    let roles: Vec<CounterpartyRole> = links.iter().filter_map(|cp| cp.role).collect();

    if trade.party.len() > ROLE_ORDER.len() {
        tracing::warn!(
            parties = trade.party.len(),
            "only the first two parties were linked"
        );
    }
    tracing::info!(?roles, "added counterparty links");

    trade
        .tradable_product
        .get_or_insert_with(TradableProduct::default)
        .counterparty = Some(links);

    RepairOutcome::Linked(roles)
}
