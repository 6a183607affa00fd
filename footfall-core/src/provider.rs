//! The report provider capability contract.

use async_trait::async_trait;

use footfall_models::Hit;

use crate::error::ProviderError;

/// A pluggable unit computing one named report from a hit window plus its
/// own persisted prior state.
///
/// Providers are registered once at composition time; names must be unique
/// across the registration list. `generate` is invoked by the engine with
/// the window's full hit set and is isolated at that boundary: returning an
/// error (or panicking) affects only this provider's entry in the run
/// summary, never its siblings.
#[async_trait]
pub trait ReportProvider: Send + Sync {
    /// Unique stable name, used for report lookup.
    fn name(&self) -> &str;

    /// Generate this provider's report from the window's hits.
    async fn generate(&self, hits: &[Hit]) -> Result<(), ProviderError>;

    /// On-demand read of the most recently generated data for `host`,
    /// independent of the generation cycle.
    ///
    /// `params` is an ordered sequence of query key/value pairs. Returns
    /// `Ok(None)` when the provider has nothing for the host.
    async fn get(
        &self,
        host: &str,
        params: &[(String, String)],
    ) -> Result<Option<serde_json::Value>, ProviderError>;
}
