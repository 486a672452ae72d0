//! Shared types: run configuration, search candidates, per-key outcomes.

use serde::{Deserialize, Serialize};

/// Subject-database scope for author/year searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Database {
    /// Search the astronomy collection only.
    #[default]
    Astronomy,
    /// Search astronomy and physics collections.
    AstronomyOrPhysics,
}

impl Database {
    /// The `database:` filter value used in ADS query syntax.
    pub fn as_query_str(&self) -> &'static str {
        match self {
            Self::Astronomy => "astronomy",
            Self::AstronomyOrPhysics => "(\"astronomy\" OR \"physics\")",
        }
    }
}

/// Run-wide configuration, built once from the CLI and passed by reference.
///
/// Replaces what would otherwise be process-global mutable state; nothing
/// here is mutated after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Subject database scope for author/year lookups.
    pub database: Database,
    /// Re-check existing entries against ADS for updated bibcodes.
    pub update: bool,
    /// Re-fetch every existing entry even when its bibcode is unchanged.
    pub force_regenerate: bool,
    /// Copy entries found in secondary files into the output file.
    pub merge_other: bool,
    /// Write a `.bak` copy of the output file before overwriting it.
    pub backup: bool,
    /// Fan the non-interactive resolution phase out across tasks.
    pub parallel: bool,
    /// Worker bound for the parallel phase.
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Database::Astronomy,
            update: true,
            force_regenerate: false,
            merge_other: false,
            backup: true,
            parallel: false,
            threads: 8,
        }
    }
}

/// One candidate record from an author/year search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// ADS bibcode (primary identifier).
    pub bibcode: String,
    /// Author names as returned by ADS ("Last, First M.").
    pub authors: Vec<String>,
    /// Paper title, when present.
    pub title: Option<String>,
    /// Number of citations.
    pub citation_count: u32,
}

/// Terminal state of one citation key after a run.
///
/// Every key ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Key already resolved in the output file, unchanged.
    Existing,
    /// Key already resolved, but ADS now reports a different bibcode
    /// (or a re-fetch was forced).
    Update(String),
    /// Key newly resolved to a bibcode.
    New(String),
    /// Key found in a secondary file and copied into the output.
    Merged,
    /// Key found in a secondary file and left there.
    Ignored,
    /// No resolution possible; reported for manual follow-up.
    NotFound,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Existing => write!(f, "EXISTING"),
            Self::Update(bibcode) => write!(f, "UPDATE => {}", bibcode),
            Self::New(bibcode) => write!(f, "NEW ENTRY => {}", bibcode),
            Self::Merged => write!(f, "FOUND IN OTHER REFS, MERGED"),
            Self::Ignored => write!(f, "FOUND IN OTHER REFS, IGNORED"),
            Self::NotFound => write!(f, "NOT FOUND"),
        }
    }
}
