//! Error taxonomy for loading and extracting trade documents
use super::extract::StrategyKind;

/// Hard failures that stop processing of a single document.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("document could not be decoded: {0}")]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),
}

#[derive(thiserror::Error, Debug)]
pub enum StructuralError {
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// No strategy in the chain produced a trade record. Carries every
/// rejection in the order the strategies were attempted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("no extraction strategy produced a trade record ({} attempted)", .rejections.len())]
pub struct ExtractionFailure {
    pub rejections: Vec<StrategyRejection>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StrategyRejection {
    pub strategy: StrategyKind,
    pub reason: String,
}

impl ExtractionFailure {
    pub fn attempted(&self) -> Vec<StrategyKind> {
        self.rejections.iter().map(|r| r.strategy).collect()
    }
}

impl std::fmt::Display for StrategyRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}
