//! Error types for footfall-core.

use thiserror::Error;

use footfall_models::ReportOutcome;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for footfall-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Two providers were registered under the same name.
    #[error("duplicate report provider name: {0}")]
    DuplicateProvider(String),

    /// A storage operation on a synchronous path failed.
    #[error("store error: {0}")]
    Store(#[from] footfall_store::Error),

    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Errors a provider may return from `generate` or `get`.
///
/// The engine contains these at the fan-out boundary and converts them into
/// a [`footfall_models::GenerationResult`]; they never abort sibling
/// providers or the run.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The window lacked the data this provider needs.
    #[error("not enough information: {0}")]
    NotEnoughInformation(String),

    /// The provider declined to run, e.g. disabled.
    #[error("skipped: {0}")]
    Skipped(String),

    /// A storage operation inside the provider failed.
    #[error("store error: {0}")]
    Store(#[from] footfall_store::Error),

    /// A report value could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

impl ProviderError {
    /// The outcome this error maps to in a generation summary.
    pub fn outcome(&self) -> ReportOutcome {
        match self {
            Self::NotEnoughInformation(_) => ReportOutcome::NotEnoughInformation,
            Self::Skipped(_) => ReportOutcome::NotRun,
            Self::Store(_) | Self::Serialize(_) | Self::Failed(_) => ReportOutcome::UnknownFailure,
        }
    }
}
