//! Category labels.
//!
//! `Domain` is the closed set of labels the orchestrator dispatches on.
//! `LabelSet` is the generic candidate list handed to the classifier, used
//! both for domain routing and for smaller decisions such as store versus
//! retrieve.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// A request domain, each bound to one capability provider.
///
/// Declaration order is classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Math,
    Language,
    Code,
    Memory,
    Tools,
    General,
}

impl Domain {
    /// Every domain in priority order.
    pub const ALL: [Domain; 6] = [
        Domain::Math,
        Domain::Language,
        Domain::Code,
        Domain::Memory,
        Domain::Tools,
        Domain::General,
    ];

    /// The catch-all domain.
    pub const FALLBACK: Domain = Domain::General;

    /// Label string used in prompts and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Language => "language",
            Self::Code => "code",
            Self::Memory => "memory",
            Self::Tools => "tools",
            Self::General => "general",
        }
    }

    /// One-line description shown to the classifier.
    pub fn description(self) -> &'static str {
        match self {
            Self::Math => "arithmetic, algebra, equations, or other calculations",
            Self::Language => "translation, grammar, rewriting, or summarizing text",
            Self::Code => "writing, explaining, reviewing, or debugging source code",
            Self::Memory => {
                "personal facts the user shares to be remembered, or questions about them"
            }
            Self::Tools => "creating a new tool or running a custom tool",
            Self::General => "anything else",
        }
    }

    /// Whether this is the fallback domain.
    pub fn is_fallback(self) -> bool {
        self == Self::FALLBACK
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or(OrchestratorError::UnknownLabel(s))
    }
}

/// One classification candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    /// Label text.
    pub name: String,

    /// What the label covers.
    pub description: String,
}

/// Candidate labels in priority order, always ending with the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    entries: Vec<LabelEntry>,
    fallback: LabelEntry,
}

impl LabelSet {
    /// Create a set holding only the fallback label.
    pub fn new(fallback: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            fallback: LabelEntry {
                name: normalize_label(&fallback.into()),
                description: description.into(),
            },
        }
    }

    /// Append a label with lower priority than those already added.
    ///
    /// Duplicates and the fallback itself are ignored.
    pub fn with_label(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = normalize_label(&name.into());
        if !name.is_empty() && !self.contains(&name) {
            self.entries.push(LabelEntry {
                name,
                description: description.into(),
            });
        }
        self
    }

    /// Build from enabled domains in priority order, whatever order they
    /// arrive in; the fallback domain is always present.
    pub fn from_domains(domains: impl IntoIterator<Item = Domain>) -> Self {
        let fallback = Domain::FALLBACK;
        let ordered: BTreeSet<Domain> = domains.into_iter().collect();
        ordered
            .into_iter()
            .filter(|d| !d.is_fallback())
            .fold(
                Self::new(fallback.as_str(), fallback.description()),
                |set, d| set.with_label(d.as_str(), d.description()),
            )
    }

    /// The fallback label.
    pub fn fallback(&self) -> &str {
        &self.fallback.name
    }

    /// All entries in priority order, fallback last.
    pub fn entries(&self) -> impl Iterator<Item = &LabelEntry> {
        self.entries.iter().chain(std::iter::once(&self.fallback))
    }

    /// All label names in priority order, fallback last.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries().map(|e| e.name.as_str())
    }

    /// Whether `name` is a candidate.
    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    /// Number of candidates, fallback included.
    pub fn len(&self) -> usize {
        self.entries.len() + 1
    }

    /// Always false; the fallback is always present.
    pub fn is_empty(&self) -> bool {
        false
    }
}

fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_domain_round_trip_through_str() {
        for domain in Domain::ALL {
            assert_eq!(domain.as_str().parse::<Domain>().unwrap(), domain);
        }
        assert_eq!(" Math ".parse::<Domain>().unwrap(), Domain::Math);
        assert!("weather".parse::<Domain>().is_err());
    }

    #[test]
    fn test_from_domains_sorts_by_priority_with_fallback_last() {
        let set = LabelSet::from_domains([Domain::General, Domain::Code, Domain::Math]);
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, vec!["math", "code", "general"]);
        assert_eq!(set.fallback(), "general");
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let set = LabelSet::new("retrieve", "")
            .with_label("store", "")
            .with_label("STORE", "")
            .with_label("retrieve", "");
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["store", "retrieve"]);
        assert_eq!(set.len(), 2);
    }
}
