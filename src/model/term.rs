//! Namespace-qualified terms and the registry that resolves them

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::ArchiveError;

/// Namespace-qualified field identifier used as a schema's column key
///
/// Terms are immutable and compared by qualified name only; the simple name
/// is a convenience for display and generated file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    /// Full qualified name, e.g. `http://rs.tdwg.org/dwc/terms/scientificName`
    pub qualified_name: String,
    /// Short local name, e.g. `scientificName`
    pub simple_name: String,
}

impl Term {
    /// Create a term from a qualified name, deriving the simple name from
    /// the segment after the last `/`, `#` or `:`.
    pub fn new(qualified_name: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        let simple_name = qualified_name
            .rsplit(['/', '#', ':'])
            .next()
            .unwrap_or(qualified_name.as_str())
            .to_string();
        Self {
            qualified_name,
            simple_name,
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.qualified_name == other.qualified_name
    }
}

impl Eq for Term {}

impl std::hash::Hash for Term {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.qualified_name.hash(state);
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.qualified_name.cmp(&other.qualified_name)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name)
    }
}

/// Implicit term for the id / foreign-key column of a data file
pub static ID_TERM: Lazy<Term> = Lazy::new(|| Term::new("id"));

const DWC_NS: &str = "http://rs.tdwg.org/dwc/terms/";
const DC_NS: &str = "http://purl.org/dc/terms/";

/// Well-known terms, resolvable by bare simple name
static KNOWN_TERMS: Lazy<Vec<Term>> = Lazy::new(|| {
    let dwc = [
        "Occurrence",
        "Taxon",
        "Event",
        "Identification",
        "MeasurementOrFact",
        "occurrenceID",
        "taxonID",
        "eventID",
        "identificationID",
        "measurementID",
        "scientificName",
        "scientificNameAuthorship",
        "kingdom",
        "phylum",
        "class",
        "order",
        "family",
        "genus",
        "taxonRank",
        "nameAccordingTo",
        "basisOfRecord",
        "recordedBy",
        "individualCount",
        "eventDate",
        "country",
        "countryCode",
        "locality",
        "decimalLatitude",
        "decimalLongitude",
        "measurementType",
        "measurementValue",
        "measurementUnit",
    ];
    let dc = ["title", "description", "language", "license", "modified", "source"];

    let mut terms = Vec::with_capacity(dwc.len() + dc.len());
    terms.extend(dwc.iter().map(|n| Term::new(format!("{DWC_NS}{n}"))));
    terms.extend(dc.iter().map(|n| Term::new(format!("{DC_NS}{n}"))));
    terms
});

/// Resolves name strings to canonical terms
///
/// Built once, then passed explicitly to the parser and readers. There is
/// no process-global registry; test suites substitute their own instance.
#[derive(Debug, Clone, Default)]
pub struct TermRegistry {
    by_name: HashMap<String, Term>,
}

impl TermRegistry {
    /// Registry with no entries; every lookup mints a fresh term.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry seeded with the well-known term table.
    pub fn new() -> Self {
        let mut registry = Self::default();
        for term in KNOWN_TERMS.iter() {
            registry.register(term.clone());
        }
        registry
    }

    /// Register a term under both its qualified and simple names.
    /// Later registrations win for the same simple name.
    pub fn register(&mut self, term: Term) {
        self.by_name
            .insert(term.qualified_name.to_lowercase(), term.clone());
        self.by_name.insert(term.simple_name.to_lowercase(), term);
    }

    /// Resolve a name to a canonical term.
    ///
    /// Known qualified or simple names return the registered term; anything
    /// else mints a new term from the given string. A blank name cannot
    /// identify a column and is an error.
    pub fn resolve(&self, name: &str) -> Result<Term, ArchiveError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ArchiveError::UnsupportedArchive(
                "empty term name".to_string(),
            ));
        }
        if let Some(term) = self.by_name.get(&name.to_lowercase()) {
            return Ok(term.clone());
        }
        Ok(Term::new(name))
    }
}
