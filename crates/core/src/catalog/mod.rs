//! # Application Catalog
//!
//! Static, read-only inventory of application records. Loaded once at
//! startup, never mutated during a run, safe to share across concurrent
//! pipeline runs. Only the lookup stage consults it.

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Built-in catalog snapshot used when no file is supplied
const BUILTIN_SNAPSHOT: &str = include_str!("snapshot.json");

/// Deployment environment of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnv {
    Prod,
    Uat,
    Sandbox,
    Qa,
}

impl DeploymentEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentEnv::Prod => "prod",
            DeploymentEnv::Uat => "uat",
            DeploymentEnv::Sandbox => "sandbox",
            DeploymentEnv::Qa => "qa",
        }
    }
}

impl std::fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compliance obligation attached to an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Obligation {
    #[serde(rename = "PCI")]
    Pci,
    #[serde(rename = "GDPR")]
    Gdpr,
    #[serde(rename = "SOC2")]
    Soc2,
}

impl Obligation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Obligation::Pci => "PCI",
            Obligation::Gdpr => "GDPR",
            Obligation::Soc2 => "SOC2",
        }
    }
}

impl std::fmt::Display for Obligation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One application record from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApplicationRecord {
    /// Unique identifier
    pub id: u32,
    /// Unique name
    pub name: String,
    pub owner: String,
    pub technology: String,
    pub deployment: DeploymentEnv,
    /// Compliance obligations the application is subject to
    pub compliance: Vec<Obligation>,
    /// User count
    pub users: u64,
}

impl ApplicationRecord {
    /// Whether the record carries a given obligation
    pub fn has_obligation(&self, obligation: Obligation) -> bool {
        self.compliance.contains(&obligation)
    }
}

/// Outcome of a catalog lookup
///
/// `NotFound` is a normal result, not an error: it carries the list of
/// known names so a calling stage can report the miss as data.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// Exact (case-insensitive) name match
    Match(ApplicationRecord),
    /// All records, in insertion order
    All(Vec<ApplicationRecord>),
    /// No match; diagnostic listing of available names
    NotFound {
        requested: String,
        available: Vec<String>,
    },
}

/// The application catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<ApplicationRecord>,
}

impl Catalog {
    /// Create a catalog from records, preserving order
    pub fn new(records: Vec<ApplicationRecord>) -> Self {
        Self { records }
    }

    /// The built-in five-application snapshot
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_SNAPSHOT)
            .map(Self::new)
            .expect("embedded catalog snapshot is valid JSON")
    }

    /// Parse a catalog from a JSON array of records
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let records: Vec<ApplicationRecord> =
            serde_json::from_str(json).context("catalog is not a valid JSON record array")?;
        Ok(Self::new(records))
    }

    /// Load a catalog snapshot from a file
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Look up an application by name.
    ///
    /// Matching is case-insensitive and whitespace-trimmed. The sentinels
    /// "all", "list", "everything" and the empty string return the full
    /// record sequence in insertion order.
    pub fn lookup(&self, name: &str) -> LookupOutcome {
        let needle = name.trim().to_lowercase();

        if matches!(needle.as_str(), "" | "all" | "list" | "everything") {
            return LookupOutcome::All(self.records.clone());
        }

        if let Some(record) = self
            .records
            .iter()
            .find(|r| r.name.to_lowercase() == needle)
        {
            return LookupOutcome::Match(record.clone());
        }

        LookupOutcome::NotFound {
            requested: name.trim().to_string(),
            available: self.names(),
        }
    }

    /// All records in insertion order
    pub fn records(&self) -> &[ApplicationRecord] {
        &self.records
    }

    /// All application names in insertion order
    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }

    /// Whether an application id exists in this snapshot
    pub fn contains_id(&self, id: u32) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_snapshot() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.records()[0].name, "Customer Payments Gateway");
        assert_eq!(catalog.records()[4].deployment, DeploymentEnv::Sandbox);
        assert!(catalog.records()[0].has_obligation(Obligation::Pci));
    }

    #[test]
    fn test_lookup_sentinels_return_all_in_order() {
        let catalog = Catalog::builtin();
        for sentinel in ["all", "list", "everything", "", "  ALL  "] {
            match catalog.lookup(sentinel) {
                LookupOutcome::All(records) => {
                    let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
                    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
                }
                other => panic!("expected All for '{}', got {:?}", sentinel, other),
            }
        }
    }

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let catalog = Catalog::builtin();
        match catalog.lookup("  internal hr portal ") {
            LookupOutcome::Match(record) => assert_eq!(record.id, 4),
            other => panic!("expected Match, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_miss_lists_available_names() {
        let catalog = Catalog::builtin();
        match catalog.lookup("Billing Engine") {
            LookupOutcome::NotFound {
                requested,
                available,
            } => {
                assert_eq!(requested, "Billing Engine");
                assert_eq!(available.len(), 5);
                assert!(available.contains(&"User Data Analytics".to_string()));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_record_format_round_trip() {
        let catalog = Catalog::builtin();
        let json = serde_json::to_string(catalog.records()).unwrap();
        let reparsed = Catalog::from_json_str(&json).unwrap();
        assert_eq!(reparsed.records(), catalog.records());
        assert!(json.contains("\"deployment\":\"uat\""));
        assert!(json.contains("\"GDPR\""));
    }

    #[test]
    fn test_from_json_str_rejects_non_array() {
        assert!(Catalog::from_json_str("{\"id\": 1}").is_err());
    }
}
