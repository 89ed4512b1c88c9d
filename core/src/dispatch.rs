//! The dispatch table.
//!
//! A `DispatchTable` is an immutable snapshot mapping each enabled domain
//! to its provider. The classifier's candidate labels are derived from the
//! same snapshot, so a label that is not dispatchable is never offered.
//! Toggling a provider builds a new table; cycles already running keep
//! the snapshot they started with.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{OrchestratorError, Result};
use crate::label::{Domain, LabelSet};
use crate::provider::CapabilityProvider;

/// Enabled providers keyed by domain.
#[derive(Clone)]
pub struct DispatchTable {
    providers: BTreeMap<Domain, Arc<dyn CapabilityProvider>>,
    fallback: Arc<dyn CapabilityProvider>,
    labels: LabelSet,
}

impl DispatchTable {
    /// Build a table from every available provider and the enabled set.
    ///
    /// Enabled domains with no provider are skipped. The fallback domain
    /// must have a provider.
    pub fn build(
        available: &BTreeMap<Domain, Arc<dyn CapabilityProvider>>,
        enabled: &BTreeSet<Domain>,
    ) -> Result<Self> {
        let providers: BTreeMap<Domain, Arc<dyn CapabilityProvider>> = available
            .iter()
            .filter(|(domain, _)| enabled.contains(*domain) || domain.is_fallback())
            .map(|(domain, provider)| (*domain, Arc::clone(provider)))
            .collect();

        if providers.is_empty() {
            return Err(OrchestratorError::NoProviders);
        }
        let Some(fallback) = providers.get(&Domain::FALLBACK).map(Arc::clone) else {
            return Err(OrchestratorError::Config(format!(
                "no provider for the fallback label {}",
                Domain::FALLBACK
            )));
        };

        let labels = LabelSet::from_domains(providers.keys().copied());
        Ok(Self {
            providers,
            fallback,
            labels,
        })
    }

    /// Candidate labels for the classifier.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Enabled domains in priority order.
    pub fn domains(&self) -> Vec<Domain> {
        self.providers.keys().copied().collect()
    }

    /// Whether `domain` is dispatchable.
    pub fn contains(&self, domain: Domain) -> bool {
        self.providers.contains_key(&domain)
    }

    /// Resolve a classifier label to a provider, falling back when the
    /// label is unknown or disabled.
    pub fn resolve(&self, label: &str) -> (Domain, Arc<dyn CapabilityProvider>) {
        label
            .parse::<Domain>()
            .ok()
            .and_then(|d| self.providers.get(&d).map(|p| (d, Arc::clone(p))))
            .unwrap_or_else(|| (Domain::FALLBACK, Arc::clone(&self.fallback)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InvocationContext, ProviderDescriptor, Request};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Fixed(ProviderDescriptor);

    #[async_trait]
    impl CapabilityProvider for Fixed {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.0
        }

        async fn invoke(&self, _request: &Request, _ctx: &InvocationContext) -> Result<String> {
            Ok(self.0.domain.to_string())
        }
    }

    fn available() -> BTreeMap<Domain, Arc<dyn CapabilityProvider>> {
        Domain::ALL
            .into_iter()
            .map(|d| {
                let provider: Arc<dyn CapabilityProvider> =
                    Arc::new(Fixed(ProviderDescriptor::new(d, "")));
                (d, provider)
            })
            .collect()
    }

    #[test]
    fn test_labels_follow_enabled_set() {
        let table =
            DispatchTable::build(&available(), &BTreeSet::from([Domain::Code, Domain::Math]))
                .unwrap();

        let labels: Vec<&str> = table.labels().names().collect();
        assert_eq!(labels, vec!["math", "code", "general"]);
        assert!(!table.contains(Domain::Memory));
    }

    #[test]
    fn test_disabled_label_resolves_to_fallback() {
        let table = DispatchTable::build(&available(), &BTreeSet::from([Domain::Math])).unwrap();

        assert_eq!(table.resolve("math").0, Domain::Math);
        assert_eq!(table.resolve("memory").0, Domain::General);
        assert_eq!(table.resolve("nonsense").0, Domain::General);
    }

    #[test]
    fn test_missing_fallback_provider_is_rejected() {
        let mut providers = available();
        providers.remove(&Domain::General);

        let result = DispatchTable::build(&providers, &BTreeSet::from([Domain::Math]));
        assert!(matches!(result, Err(OrchestratorError::Config(_))));
    }
}
