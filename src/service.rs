//! Service layer API running the full extraction pipeline
use super::config::{DerivationPolicy, ReportingSides};
use super::derivation::{DerivedFields, derive_all};
use super::diagnostics::{DiagnosticReport, build_report};
use super::document::DocumentTree;
use super::error::{ExtractionFailure, PipelineError};
use super::extract::{StrategyKind, extract};
use super::kind::{DocumentKind, classify};
use super::repair::{RepairOutcome, repair_linkage};
use super::trade::{CanonicalTradeRecord, Party};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

/// Everything the reporting engine needs from one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedTrade {
    pub kind: DocumentKind,
    pub strategy: StrategyKind,
    pub record: CanonicalTradeRecord,
    pub repair: RepairOutcome,
    pub derived: DerivedFields,
}

/// The two parties a report is produced for, resolved from their roles.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSides<'a> {
    pub reporting_party: &'a Party,
    pub reporting_counterparty: &'a Party,
}

/// The external rule-evaluation engine that turns a prepared trade into a
/// jurisdiction-specific report.
pub trait ReportingEngine {
    type Report;

    fn evaluate(
        &self,
        trade: &PreparedTrade,
        sides: ResolvedSides<'_>,
    ) -> anyhow::Result<Self::Report>;
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionService {
    policy: DerivationPolicy,
}

impl ExtractionService {
    pub fn new(policy: DerivationPolicy) -> Self {
        Self { policy }
    }

    /// Classify, extract, repair and derive. Fails only when no strategy
    /// produced a trade record.
    pub fn prepare(&self, doc: &DocumentTree) -> Result<PreparedTrade, ExtractionFailure> {
        let kind = classify(doc);
        tracing::info!(%kind, "detected document kind");

        let extraction = extract(doc)?;
        let mut record = extraction.record;

        // Repair never fails; an impossible repair is reported and the record is still returned
        let repair = repair_linkage(&mut record);
        let derived = derive_all(&record, &self.policy);

        Ok(PreparedTrade {
            kind,
            strategy: extraction.strategy,
            record,
            repair,
            derived,
        })
    }

    /// Loads a document from disk and prepares it.
    pub fn prepare_path(&self, path: impl AsRef<Path>) -> Result<PreparedTrade, PipelineError> {
        let doc = DocumentTree::from_path(path)?;
        Ok(self.prepare(&doc)?)
    }

    /// Parses raw bytes and prepares the document.
    pub fn prepare_slice(&self, bytes: &[u8]) -> Result<PreparedTrade, PipelineError> {
        let doc = DocumentTree::from_slice(bytes)?;
        Ok(self.prepare(&doc)?)
    }

    /// Builds the diagnostic report for a document as it was received,
    /// before any repair. When extraction succeeds, the repair outcome on
    /// the repaired record and the derived fields are appended.
    pub fn diagnose(&self, doc: &DocumentTree) -> DiagnosticReport {
        let kind = classify(doc);
        let extraction = extract(doc);
        let mut report = build_report(doc, kind, &extraction);

        if let Ok(extraction) = &extraction {
            let mut record = extraction.record.clone();
            let outcome = repair_linkage(&mut record);
            report.record_repair(&outcome, &record.trade);
            report.record_derivations(&derive_all(&record, &self.policy));
        }

        report
    }

    /// Hands a prepared trade to the reporting engine once both sides
    /// resolve to parties.
    pub fn submit<E: ReportingEngine>(
        &self,
        engine: &E,
        trade: &PreparedTrade,
        sides: ReportingSides,
    ) -> anyhow::Result<E::Report> {
        let resolved = resolve_sides(&trade.record, sides)?;
        tracing::info!(
            reporting_party = resolved.reporting_party.name_value().unwrap_or("<unnamed>"),
            reporting_counterparty = resolved
                .reporting_counterparty
                .name_value()
                .unwrap_or("<unnamed>"),
            "submitting trade for report evaluation"
        );

        engine
            .evaluate(trade, resolved)
            .context("Reporting engine failed to evaluate trade")
    }
}

pub fn resolve_sides(
    record: &CanonicalTradeRecord,
    sides: ReportingSides,
) -> anyhow::Result<ResolvedSides<'_>> {
    let reporting_party = record
        .trade
        .party_for_role(sides.reporting_party)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No party linked to reporting party role {}",
                sides.reporting_party
            )
        })?;
    let reporting_counterparty = record
        .trade
        .party_for_role(sides.reporting_counterparty)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No party linked to reporting counterparty role {}",
                sides.reporting_counterparty
            )
        })?;

    Ok(ResolvedSides {
        reporting_party,
        reporting_counterparty,
    })
}
