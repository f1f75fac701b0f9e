//! Diagnostic reports for troubleshooting documents that fail, or nearly fail, extraction
use super::derivation::{DerivedField, DerivedFields, Provenance};
use super::document::DocumentTree;
use super::envelope::{BusinessEvent, ReportableEvent, WorkflowStep};
use super::error::ExtractionFailure;
use super::extract::ExtractionResult;
use super::kind::DocumentKind;
use super::repair::RepairOutcome;
use super::trade::{Trade, TradeIdentifier};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub path: Vec<String>,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    pub kind: DocumentKind,
    pub findings: Vec<Finding>,
    pub remediation: Vec<String>,
}

impl Severity {
    pub fn glyph(&self) -> &'static str {
        match self {
            Severity::Ok => "✓",
            Severity::Warning => "⚠",
            Severity::Critical => "✗",
        }
    }
}

impl Finding {
    fn new(path: &[&str], severity: Severity, message: impl Into<String>) -> Self {
        Self {
            path: path.iter().map(|p| p.to_string()).collect(),
            severity,
            message: message.into(),
        }
    }
}

/// Fixed remediation text per document kind.
pub fn remediation_for(kind: DocumentKind) -> Vec<String> {
    let lines: &[&str] = match kind {
        DocumentKind::TradeRecordWithState => &[
            "ensure field 'trade' is populated and structured correctly",
            r#"expected shape: { "trade": { "tradeIdentifier": [...], "party": [...], ... }, "state": {...} }"#,
        ],
        DocumentKind::LifecycleEventEnvelope => &[
            "navigate via the embedded step's business event to reach trade state",
            "path: originatingWorkflowStep.businessEvent.after[0], or reportableTrade",
        ],
        DocumentKind::LifecycleEventStep => &[
            "extract trade state from business event's after-states or instructions",
            "path: businessEvent.after[0], or businessEvent.instruction[*].before",
        ],
        DocumentKind::Unknown => &[
            "verify the document matches a supported envelope shape",
            "supported shapes: trade record with state, bare trade, workflow step, reportable event, business event",
        ],
        DocumentKind::BareTradeRecord | DocumentKind::BusinessEventRecord => {
            &["consider loading the document as a different envelope type"]
        }
    };
    lines.iter().map(|l| l.to_string()).collect()
}

/// Walks the document and the extraction outcome in a fixed order:
/// well-formedness, kind, then either the extracted trade (identifiers,
/// trade date, product, parties, linkage) or the per-strategy rejections.
pub fn build_report(
    doc: &DocumentTree,
    kind: DocumentKind,
    extraction: &ExtractionResult,
) -> DiagnosticReport {
    let mut findings = vec![check_well_formed(doc), check_kind(doc, kind)];

    if kind.is_lifecycle() {
        findings.push(check_envelope(doc, kind));
    }

    match extraction {
        Ok(extraction) => walk_trade(&extraction.record.trade, &mut findings),
        Err(failure) => walk_failure(failure, &mut findings),
    }

    DiagnosticReport {
        kind,
        findings,
        remediation: remediation_for(kind),
    }
}

fn check_well_formed(doc: &DocumentTree) -> Finding {
    if doc.is_object() {
        Finding::new(
            &["document"],
            Severity::Ok,
            format!(
                "well-formed, {} bytes, {} root fields: {}",
                doc.source_len(),
                doc.size(),
                doc.field_names().join(", ")
            ),
        )
    } else {
        Finding::new(&["document"], Severity::Critical, "root is not a JSON object")
    }
}

fn check_kind(doc: &DocumentTree, kind: DocumentKind) -> Finding {
    match kind {
        DocumentKind::Unknown => Finding::new(
            &["document", "kind"],
            Severity::Warning,
            format!(
                "unrecognised envelope, root fields: {}",
                doc.field_names().join(", ")
            ),
        ),
        kind => Finding::new(&["document", "kind"], Severity::Ok, format!("detected {kind}")),
    }
}

fn check_envelope(doc: &DocumentTree, kind: DocumentKind) -> Finding {
    let value = doc.as_value().clone();
    let event: Result<Option<BusinessEvent>, serde_json::Error> = match kind {
        DocumentKind::LifecycleEventEnvelope => serde_json::from_value::<ReportableEvent>(value)
            .map(|e| e.business_event().cloned()),
        _ => serde_json::from_value::<WorkflowStep>(value).map(|s| s.business_event),
    };
    let path = ["document", "businessEvent"];

    match event {
        Err(err) => Finding::new(&path, Severity::Warning, format!("envelope does not decode: {err}")),
        Ok(None) => Finding::new(
            &path,
            Severity::Warning,
            "no business event (trade may only be in a proposed event)",
        ),
        Ok(Some(event)) if event.after_count() == 0 => Finding::new(
            &path,
            Severity::Warning,
            format!(
                "no after-states, {} before-states in instructions",
                event.before_count()
            ),
        ),
        Ok(Some(event)) => Finding::new(
            &path,
            Severity::Ok,
            format!(
                "{} after-states, {} before-states in instructions",
                event.after_count(),
                event.before_count()
            ),
        ),
    }
}

fn walk_trade(trade: &Trade, findings: &mut Vec<Finding>) {
    // identifiers
    let ids = &["trade", "tradeIdentifier"];
    if trade.trade_identifier.is_empty() {
        findings.push(Finding::new(ids, Severity::Critical, "no trade identifiers"));
    } else {
        findings.push(Finding::new(
            ids,
            Severity::Ok,
            format!("{} trade identifiers", trade.trade_identifier.len()),
        ));
        let uti = trade.trade_identifier.iter().find(|id| id.is_uti());
        findings.push(match uti.map(TradeIdentifier::first_value) {
            Some(Some(value)) => Finding::new(
                ids,
                Severity::Ok,
                format!("unique transaction identifier {value}"),
            ),
            Some(None) => Finding::new(
                ids,
                Severity::Warning,
                "unique transaction identifier carries no value",
            ),
            None => Finding::new(ids, Severity::Warning, "no unique transaction identifier"),
        });
    }

    let date = &["trade", "tradeDate"];
    findings.push(match trade.trade_date_value() {
        Some(d) => Finding::new(date, Severity::Ok, format!("trade date {d}")),
        None => Finding::new(date, Severity::Warning, "no trade date, event date will fall back"),
    });

    let product = &["trade", "tradableProduct", "product"];
    findings.push(match trade.product() {
        Some(_) if trade.economic_terms().is_some() => {
            Finding::new(product, Severity::Ok, "product with economic terms")
        }
        Some(_) => Finding::new(product, Severity::Ok, "product present, no economic terms found"),
        None => Finding::new(product, Severity::Warning, "no product reference"),
    });

    let parties = &["trade", "party"];
    findings.push(match trade.party.len() {
        0 => Finding::new(parties, Severity::Critical, "no parties"),
        1 => Finding::new(
            parties,
            Severity::Warning,
            "1 party, fewer than two may affect reporting party identification",
        ),
        n => Finding::new(parties, Severity::Ok, format!("{n} parties")),
    });
    for (i, party) in trade.party.iter().enumerate() {
        let index = i.to_string();
        let path = &["trade", "party", index.as_str()];
        let name = party.name_value().unwrap_or("<unnamed>");
        let severity = if party.party_id.is_empty() || party.name.is_none() {
            Severity::Warning
        } else {
            Severity::Ok
        };
        findings.push(Finding::new(
            path,
            severity,
            format!("{name}: {} party identifiers", party.party_id.len()),
        ));
    }

    findings.push(check_linkage(trade));
}

fn check_linkage(trade: &Trade) -> Finding {
    linkage_finding(&["trade", "tradableProduct", "counterparty"], trade)
}

fn linkage_finding(path: &[&str], trade: &Trade) -> Finding {
    let dangling = trade.dangling_links();
    if !dangling.is_empty() {
        return Finding::new(
            path,
            Severity::Critical,
            format!("{} counterparty links reference unknown parties", dangling.len()),
        );
    }
    if !trade.has_role_links() {
        return Finding::new(
            path,
            Severity::Warning,
            "no counterparty role links, repair required",
        );
    }

    let linked: BTreeSet<usize> = trade
        .counterparties()
        .iter()
        .filter_map(|cp| cp.party_reference.as_ref())
        .filter_map(|reference| trade.resolve_party(reference))
        .map(|(index, _)| index)
        .collect();
    let unlinked = trade.party.len().saturating_sub(linked.len());
    if unlinked > 0 {
        Finding::new(
            path,
            Severity::Warning,
            format!("{unlinked} parties are not linked to a counterparty role"),
        )
    } else {
        Finding::new(
            path,
            Severity::Ok,
            format!("{} counterparty links", trade.counterparties().len()),
        )
    }
}

fn walk_failure(failure: &ExtractionFailure, findings: &mut Vec<Finding>) {
    findings.push(Finding::new(
        &["trade"],
        Severity::Critical,
        format!(
            "no trade payload could be extracted, {} strategies rejected the document",
            failure.rejections.len()
        ),
    ));
    for rejection in &failure.rejections {
        let strategy = rejection.strategy.to_string();
        findings.push(Finding::new(
            &["extraction", strategy.as_str()],
            Severity::Warning,
            rejection.reason.clone(),
        ));
    }
}

fn derived_finding<T: fmt::Display>(name: &str, field: &DerivedField<T>) -> Finding {
    let severity = match field.provenance {
        Provenance::Extracted => Severity::Ok,
        Provenance::Defaulted => Severity::Warning,
    };
    Finding::new(
        &["derived", name],
        severity,
        format!("{} ({})", field.value, field.provenance),
    )
}

impl DiagnosticReport {
    /// Appends one finding per derived field: Ok when extracted, Warning when defaulted.
    pub fn record_derivations(&mut self, derived: &DerivedFields) {
        let notional = DerivedField {
            value: derived
                .notional
                .value
                .map_or_else(|| "unknown".to_string(), |amount| amount.to_string()),
            provenance: derived.notional.provenance,
        };
        self.findings.extend([
            derived_finding("currency", &derived.currency),
            derived_finding("notional", &notional),
            derived_finding("eventDate", &derived.event_date),
            derived_finding("reportingLei", &derived.reporting_lei),
        ]);
    }

    /// Appends one finding on the record after repair. Remaining unlinked
    /// parties only show up here, since `build_report` sees the record as
    /// received.
    pub fn record_repair(&mut self, outcome: &RepairOutcome, repaired: &Trade) {
        let path = &["repair"];
        self.findings.push(match outcome {
            RepairOutcome::AlreadyLinked => {
                Finding::new(path, Severity::Ok, "counterparty links present, nothing repaired")
            }
            RepairOutcome::Linked(_) => linkage_finding(path, repaired),
            RepairOutcome::Impossible => Finding::new(
                path,
                Severity::Warning,
                "no parties to link, record left unchanged",
            ),
        });
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    pub fn has_critical(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    pub fn findings_at(&self, path: &[&str]) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.path.iter().map(String::as_str).eq(path.iter().copied()))
            .collect()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.severity.glyph(),
            self.path.join("."),
            self.message
        )
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Trade document diagnostics ({}) ===", self.kind)?;
        for finding in &self.findings {
            writeln!(f, "{finding}")?;
        }
        writeln!(
            f,
            "--- {} critical, {} warnings ---",
            self.count(Severity::Critical),
            self.count(Severity::Warning)
        )?;
        writeln!(f, "Remediation:")?;
        for line in &self.remediation {
            writeln!(f, "  • {line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Extraction, StrategyKind, extract};
    use crate::kind::classify;
    use crate::repair::{repair_counterparty_linkage, repair_linkage};
    use serde_json::json;

    fn report_for(value: serde_json::Value) -> DiagnosticReport {
        let doc = DocumentTree::from(value);
        let kind = classify(&doc);
        build_report(&doc, kind, &extract(&doc))
    }

    #[test]
    fn walk_order_for_extracted_trade() {
        let report = report_for(json!({
            "trade": {
                "tradeIdentifier": [{"assignedIdentifier": [{"identifier": "X"}]}],
                "party": [{"name": "A"}, {"name": "B"}]
            },
            "state": {}
        }));

        let paths: Vec<String> = report.findings.iter().map(|f| f.path.join(".")).collect();
        assert_eq!(
            paths,
            vec![
                "document",
                "document.kind",
                "trade.tradeIdentifier",
                "trade.tradeIdentifier",
                "trade.tradeDate",
                "trade.tradableProduct.product",
                "trade.party",
                "trade.party.0",
                "trade.party.1",
                "trade.tradableProduct.counterparty",
            ]
        );
        assert!(!report.has_critical());
    }

    #[test]
    fn missing_identifiers_are_critical() {
        let report = report_for(json!({"trade": {"party": [{"name": "A"}, {"name": "B"}]}}));

        let ids = report.findings_at(&["trade", "tradeIdentifier"]);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].severity, Severity::Critical);
    }

    #[test]
    fn dangling_link_is_critical() {
        let report = report_for(json!({"trade": {
            "tradeIdentifier": [{"assignedIdentifier": [{"identifier": "X"}]}],
            "party": [{"name": "A", "meta": {"globalKey": "a"}}],
            "tradableProduct": {"counterparty": [
                {"role": "Party1", "partyReference": {"globalReference": "zzz"}}
            ]}
        }}));

        let linkage = report.findings_at(&["trade", "tradableProduct", "counterparty"]);
        assert_eq!(linkage[0].severity, Severity::Critical);
    }

    #[test]
    fn failed_extraction_lists_rejections() {
        let report = report_for(json!({"foo": 1}));

        assert_eq!(report.kind, DocumentKind::Unknown);
        assert_eq!(report.count(Severity::Critical), 1);
        assert_eq!(report.findings_at(&["trade"])[0].severity, Severity::Critical);
        let rejected: Vec<&Finding> = report
            .findings
            .iter()
            .filter(|f| f.path.first().map(String::as_str) == Some("extraction"))
            .collect();
        assert_eq!(rejected.len(), 5);
        assert_eq!(rejected[0].path[1], "direct");
        assert_eq!(rejected[4].path[1], "via bare trade");
        assert_eq!(
            report.remediation[0],
            "verify the document matches a supported envelope shape"
        );
    }

    #[test]
    fn envelope_structure_is_reported() {
        let report = report_for(json!({
            "originatingWorkflowStep": {"businessEvent": {
                "after": [],
                "instruction": [{"before": {"trade": {}}}, {"primitiveInstruction": {}}]
            }}
        }));

        let envelope = report.findings_at(&["document", "businessEvent"]);
        assert_eq!(envelope[0].severity, Severity::Warning);
        assert_eq!(
            envelope[0].message,
            "no after-states, 1 before-states in instructions"
        );
    }

    #[test]
    fn renders_glyphs_and_remediation() {
        let report = report_for(json!({"trade": null, "state": {}}));
        let text = report.to_string();

        assert!(text.contains("✓ document: well-formed"));
        assert!(text.contains("✗ trade: no trade payload could be extracted"));
        assert!(text.contains("  • ensure field 'trade' is populated and structured correctly"));
    }

    fn three_party_doc() -> DocumentTree {
        DocumentTree::from(json!({
            "trade": {
                "tradeIdentifier": [{"assignedIdentifier": [{"identifier": "X"}]}],
                "party": [{"name": "A"}, {"name": "B"}, {"name": "C"}]
            },
            "state": {}
        }))
    }

    #[test]
    fn third_party_is_unlinked_after_repair() {
        let doc = three_party_doc();
        let extraction = extract(&doc).unwrap();
        let repaired = Extraction {
            record: repair_counterparty_linkage(extraction.record),
            strategy: StrategyKind::Direct,
        };

        let report = build_report(&doc, classify(&doc), &Ok(repaired));
        let linkage = report.findings_at(&["trade", "tradableProduct", "counterparty"]);

        assert_eq!(linkage.len(), 1);
        assert_eq!(linkage[0].severity, Severity::Warning);
        assert_eq!(linkage[0].message, "1 parties are not linked to a counterparty role");
    }

    #[test]
    fn repair_finding_reports_remaining_unlinked_parties() {
        let doc = three_party_doc();
        let mut record = extract(&doc).unwrap().record;
        let mut report = build_report(&doc, classify(&doc), &extract(&doc));

        let outcome = repair_linkage(&mut record);
        report.record_repair(&outcome, &record.trade);

        let repair = report.findings_at(&["repair"]);
        assert_eq!(repair[0].severity, Severity::Warning);
        assert_eq!(repair[0].message, "1 parties are not linked to a counterparty role");
    }

    #[test]
    fn impossible_repair_is_a_warning() {
        let mut report = report_for(json!({"trade": {}, "state": {}}));
        report.record_repair(&RepairOutcome::Impossible, &Trade::new());

        assert_eq!(report.findings_at(&["repair"])[0].severity, Severity::Warning);
    }
}
