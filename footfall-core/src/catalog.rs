//! The report catalog - ad-hoc query facade over registered providers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, ProviderError, Result};
use crate::provider::ReportProvider;

/// Maps a report name to the provider that serves it.
///
/// Built once at composition time from the same registration list as the
/// engine. An unknown report name is a `None` result, not an error.
pub struct ReportCatalog {
    providers: HashMap<String, Arc<dyn ReportProvider>>,
}

impl ReportCatalog {
    /// Build a catalog from a provider registration list.
    ///
    /// Fails with [`Error::DuplicateProvider`] when two providers share a
    /// name.
    pub fn new(providers: &[Arc<dyn ReportProvider>]) -> Result<Self> {
        let mut map = HashMap::new();
        for provider in providers {
            let name = provider.name().to_string();
            if map.insert(name.clone(), Arc::clone(provider)).is_some() {
                return Err(Error::DuplicateProvider(name));
            }
        }
        Ok(Self { providers: map })
    }

    /// Read the named report for `host` with the given query parameters.
    pub async fn get(
        &self,
        name: &str,
        host: &str,
        params: &[(String, String)],
    ) -> std::result::Result<Option<serde_json::Value>, ProviderError> {
        match self.providers.get(name) {
            Some(provider) => provider.get(host, params).await,
            None => {
                debug!(report = name, "unknown report requested");
                Ok(None)
            }
        }
    }

    /// Registered report names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use footfall_models::Hit;

    struct FixedProvider {
        name: &'static str,
        value: serde_json::Value,
    }

    #[async_trait]
    impl ReportProvider for FixedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(&self, _hits: &[Hit]) -> std::result::Result<(), ProviderError> {
            Ok(())
        }

        async fn get(
            &self,
            host: &str,
            _params: &[(String, String)],
        ) -> std::result::Result<Option<serde_json::Value>, ProviderError> {
            if host == "known.example.com" {
                Ok(Some(self.value.clone()))
            } else {
                Ok(None)
            }
        }
    }

    fn catalog() -> ReportCatalog {
        ReportCatalog::new(&[
            Arc::new(FixedProvider {
                name: "logged_in",
                value: serde_json::json!({"total": 2}),
            }) as Arc<dyn ReportProvider>,
            Arc::new(FixedProvider {
                name: "top_paths",
                value: serde_json::json!([]),
            }) as _,
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn get_delegates_to_named_provider() {
        let catalog = catalog();
        let value = catalog
            .get("logged_in", "known.example.com", &[])
            .await
            .unwrap();
        assert_eq!(value, Some(serde_json::json!({"total": 2})));
    }

    #[tokio::test]
    async fn unknown_report_name_is_none_not_an_error() {
        let catalog = catalog();
        let value = catalog.get("missing", "known.example.com", &[]).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn unknown_host_is_none() {
        let catalog = catalog();
        let value = catalog.get("logged_in", "other.example.com", &[]).await.unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = ReportCatalog::new(&[
            Arc::new(FixedProvider {
                name: "dup",
                value: serde_json::Value::Null,
            }) as Arc<dyn ReportProvider>,
            Arc::new(FixedProvider {
                name: "dup",
                value: serde_json::Value::Null,
            }) as _,
        ]);
        assert!(matches!(result, Err(Error::DuplicateProvider(name)) if name == "dup"));
    }

    #[test]
    fn names_are_sorted() {
        assert_eq!(catalog().names(), vec!["logged_in", "top_paths"]);
    }
}
