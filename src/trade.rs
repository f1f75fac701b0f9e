//! Canonical trade record and the types it is built from
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A scalar that producers emit either bare (`"2018-09-24"`) or wrapped
/// with metadata (`{"value": "2018-09-24", "meta": {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldWithMeta<T> {
    Wrapped {
        value: T,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Value>,
    },
    Bare(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterpartyRole {
    Party1,
    Party2,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyIdentifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<FieldWithMeta<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub party_id: Vec<PartyIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<FieldWithMeta<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaKeys>,
}

/// Points at a party either by key or by embedding it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<Party>>,
}

/// Links an abstract counterparty role to a concrete party.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<CounterpartyRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_reference: Option<PartyReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedIdentifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<FieldWithMeta<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeIdentifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<FieldWithMeta<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_reference: Option<PartyReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_identifier: Vec<AssignedIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradableProduct {
    // opaque, handed through to the reporting engine untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<Vec<Counterparty>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_date_time: Option<FieldWithMeta<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trade_identifier: Vec<TradeIdentifier>,
    /// Kept as text; read through [`Trade::trade_date_value`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_date: Option<FieldWithMeta<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub party: Vec<Party>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tradable_product: Option<TradableProduct>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution: Vec<Execution>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The normalized shape every supported envelope is reduced to.
///
/// Invariant: when counterparty links are present, every link resolves to
/// a party in `trade.party`. Only repair adds links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTradeRecord {
    pub trade: Trade,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

pub const UTI_IDENTIFIER_TYPE: &str = "UniqueTransactionIdentifier";
pub const LEI_IDENTIFIER_TYPE: &str = "LEI";

// Field names a document must carry at least one of to pass as a bare trade.
pub(crate) const TRADE_SIGNATURE_FIELDS: &[&str] = &[
    "tradeIdentifier",
    "tradeDate",
    "party",
    "tradableProduct",
    "execution",
];

impl<T> FieldWithMeta<T> {
    pub fn value(&self) -> &T {
        match self {
            FieldWithMeta::Wrapped { value, .. } => value,
            FieldWithMeta::Bare(value) => value,
        }
    }
}

impl<T> From<T> for FieldWithMeta<T> {
    fn from(value: T) -> Self {
        FieldWithMeta::Bare(value)
    }
}

impl std::fmt::Display for CounterpartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CounterpartyRole::Party1 => f.write_str("Party1"),
            CounterpartyRole::Party2 => f.write_str("Party2"),
            CounterpartyRole::Unrecognized => f.write_str("Unrecognized"),
        }
    }
}

impl Party {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string().into()),
            ..Self::default()
        }
    }
    pub fn add_identifier(mut self, value: &str, identifier_type: &str) -> Self {
        self.party_id.push(PartyIdentifier {
            identifier: Some(value.to_string().into()),
            identifier_type: Some(identifier_type.to_string()),
        });
        self
    }
    pub fn set_global_key(mut self, key: &str) -> Self {
        self.meta.get_or_insert_with(MetaKeys::default).global_key = Some(key.to_string());
        self
    }
    pub fn set_external_key(mut self, key: &str) -> Self {
        self.meta.get_or_insert_with(MetaKeys::default).external_key = Some(key.to_string());
        self
    }
    pub fn name_value(&self) -> Option<&str> {
        self.name.as_ref().map(|n| n.value().as_str())
    }
    pub fn lei(&self) -> Option<&str> {
        self.party_id
            .iter()
            .filter(|id| id.identifier_type.as_deref() == Some(LEI_IDENTIFIER_TYPE))
            .find_map(|id| id.identifier.as_ref())
            .map(|id| id.value().as_str())
    }
    fn global_key(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.global_key.as_deref())
    }
    fn external_key(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.external_key.as_deref())
    }
    /// A reference that resolves back to this party by every available route.
    pub fn reference(&self) -> PartyReference {
        PartyReference {
            global_reference: self.global_key().map(str::to_string),
            external_reference: self.external_key().map(str::to_string),
            value: Some(Box::new(self.clone())),
        }
    }
}

impl TradeIdentifier {
    pub fn new(identifier_type: &str, value: &str) -> Self {
        Self {
            identifier_type: Some(identifier_type.to_string()),
            assigned_identifier: vec![AssignedIdentifier {
                identifier: Some(value.to_string().into()),
                version: None,
            }],
            ..Self::default()
        }
    }
    pub fn is_uti(&self) -> bool {
        self.identifier_type.as_deref() == Some(UTI_IDENTIFIER_TYPE)
    }
    pub fn first_value(&self) -> Option<&str> {
        self.assigned_identifier
            .iter()
            .find_map(|a| a.identifier.as_ref())
            .map(|id| id.value().as_str())
    }
}

impl Counterparty {
    pub fn new(role: CounterpartyRole, party: &Party) -> Self {
        Self {
            role: Some(role),
            party_reference: Some(party.reference()),
        }
    }
    pub fn is_linked(&self) -> bool {
        self.role.is_some() && self.party_reference.is_some()
    }
}

impl Trade {
    /// Construct an empty trade, used as the basis for fixtures and wrapping
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add_trade_identifier(mut self, identifier: TradeIdentifier) -> Self {
        self.trade_identifier.push(identifier);
        self
    }
    pub fn set_trade_date(mut self, date: NaiveDate) -> Self {
        self.trade_date = Some(date.to_string().into());
        self
    }
    pub fn add_party(mut self, party: Party) -> Self {
        self.party.push(party);
        self
    }
    pub fn set_product(mut self, product: Value) -> Self {
        self.tradable_product
            .get_or_insert_with(TradableProduct::default)
            .product = Some(product);
        self
    }
    pub fn add_counterparty(mut self, counterparty: Counterparty) -> Self {
        self.tradable_product
            .get_or_insert_with(TradableProduct::default)
            .counterparty
            .get_or_insert_with(Vec::new)
            .push(counterparty);
        self
    }
    pub fn add_execution_time(mut self, timestamp: &str) -> Self {
        self.execution.push(Execution {
            execution_date_time: Some(timestamp.to_string().into()),
            ..Execution::default()
        });
        self
    }

    /// The trade date, or `None` when it is missing or does not read as a date.
    pub fn trade_date_value(&self) -> Option<NaiveDate> {
        self.trade_date.as_ref().and_then(|d| date_part(d.value()))
    }

    pub fn product(&self) -> Option<&Value> {
        self.tradable_product.as_ref().and_then(|tp| tp.product.as_ref())
    }

    pub fn counterparties(&self) -> &[Counterparty] {
        self.tradable_product
            .as_ref()
            .and_then(|tp| tp.counterparty.as_deref())
            .unwrap_or(&[])
    }

    /// At least one link carries both a role and a party reference.
    pub fn has_role_links(&self) -> bool {
        self.counterparties().iter().any(Counterparty::is_linked)
    }

    /// Resolves a reference to its index in the party list: global key
    /// first, then external key, then embedded value. Keys come first so
    /// that parties with equal contents still resolve to their own slot.
    pub fn resolve_party(&self, reference: &PartyReference) -> Option<(usize, &Party)> {
        let by_global = reference
            .global_reference
            .as_deref()
            .and_then(|key| self.party.iter().position(|p| p.global_key() == Some(key)));
        let by_external = || {
            reference
                .external_reference
                .as_deref()
                .and_then(|key| self.party.iter().position(|p| p.external_key() == Some(key)))
        };
        let by_value = || {
            reference
                .value
                .as_deref()
                .and_then(|value| self.party.iter().position(|p| p == value))
        };

        by_global
            .or_else(by_external)
            .or_else(by_value)
            .map(|found| (found, &self.party[found]))
    }

    /// Links whose party reference does not resolve to a listed party.
    pub fn dangling_links(&self) -> Vec<&Counterparty> {
        self.counterparties()
            .iter()
            .filter(|cp| match &cp.party_reference {
                Some(reference) => self.resolve_party(reference).is_none(),
                None => false,
            })
            .collect()
    }

    pub fn party_for_role(&self, role: CounterpartyRole) -> Option<&Party> {
        self.counterparties()
            .iter()
            .filter(|cp| cp.role == Some(role))
            .find_map(|cp| cp.party_reference.as_ref())
            .and_then(|reference| self.resolve_party(reference))
            .map(|(_, party)| party)
    }

    /// Economic terms, whether nested under a contractual product or
    /// directly on the product.
    pub fn economic_terms(&self) -> Option<&Value> {
        let product = self.product()?;
        lookup(product, &["contractualProduct", "economicTerms"])
            .or_else(|| lookup(product, &["economicTerms"]))
    }

    /// The first payout leg of the economic terms.
    pub fn first_payout_leg(&self) -> Option<&Value> {
        let payout = self.economic_terms()?.get("payout")?;
        match payout {
            Value::Array(legs) => legs.first().map(unwrap_choice),
            Value::Object(kinds) => kinds
                .get("interestRatePayout")
                .into_iter()
                .chain(kinds.values())
                .find_map(|legs| legs.as_array().and_then(|l| l.first())),
            _ => None,
        }
    }
}

impl CanonicalTradeRecord {
    pub fn new(trade: Trade) -> Self {
        Self { trade, state: None }
    }
    /// Canonical JSON bytes of the record and their SHA-256 hex digest.
    pub fn fingerprint(&self) -> anyhow::Result<(String, Vec<u8>)> {
        super::utils::digest_json(self)
    }
}

/// Follows a chain of object keys.
pub(crate) fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

/// Reads a scalar that may be wrapped as `{"value": ...}`, as text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("value").and_then(scalar_text),
        _ => None,
    }
}

// Choice wrappers such as `{"InterestRatePayout": {...}}` hold the leg itself.
// Any other single-key object is already a leg.
fn unwrap_choice(leg: &Value) -> &Value {
    match leg.as_object() {
        Some(map) if map.len() == 1 => match map.iter().next() {
            Some((key, inner)) if is_payout_choice(key) && inner.is_object() => inner,
            _ => leg,
        },
        _ => leg,
    }
}

fn is_payout_choice(key: &str) -> bool {
    key.to_ascii_lowercase().ends_with("payout")
}

/// Accepts full RFC 3339 timestamps or anything starting with `YYYY-MM-DD`.
pub(crate) fn date_part(text: &str) -> Option<NaiveDate> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.date_naive());
    }
    NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok()
}
