//! Types for the multi-source search.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{BackendError, LibraryScope, ProviderQueryType};

/// Errors returned by a search call.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No search source selected")]
    NoScopeSelected,

    #[error("A search for this query is already running")]
    Busy,

    /// A newer search was issued while this one was in flight.
    #[error("Search superseded by a newer query")]
    Superseded,

    #[error("Search request failed: {0}")]
    RequestFailed(#[from] BackendError),
}

impl SearchError {
    /// Short machine-readable name, used for metrics and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::InvalidInput(_) => "invalid_input",
            SearchError::NoScopeSelected => "no_scope_selected",
            SearchError::Busy => "busy",
            SearchError::Superseded => "superseded",
            SearchError::RequestFailed(_) => "request_failed",
        }
    }
}

/// Which sources a search fans out to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFlags {
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub rankings: bool,
    #[serde(default)]
    pub provider: bool,
}

impl SourceFlags {
    pub fn all() -> Self {
        Self {
            local: true,
            rankings: true,
            provider: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.local || self.rankings || self.provider)
    }

    /// Scope of the combined library request, if either half is selected.
    pub fn library_scope(&self) -> Option<LibraryScope> {
        match (self.local, self.rankings) {
            (true, true) => Some(LibraryScope::All),
            (true, false) => Some(LibraryScope::Local),
            (false, true) => Some(LibraryScope::Ranking),
            (false, false) => None,
        }
    }
}

/// Search-type hint for the metadata provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderHint {
    /// Let the provider decide.
    #[default]
    Auto,
    Title,
    Actor,
}

static PRODUCT_CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^[A-Z]{2,10}-\d{3,5}$",
        r"^[A-Z]{2,10}\d{3,5}$",
        r"^\d{6}_\d{3}$",
        r"^[A-Z]+\s*\d+$",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

impl ProviderHint {
    /// Classify a query the way the provider's auto mode does: product codes
    /// (`ABC-123`, `ABC123`, `123456_789`) are titles, anything else an actor.
    pub fn detect(query: &str) -> ProviderHint {
        let upper = query.trim().to_uppercase();
        if PRODUCT_CODE_PATTERNS.iter().any(|re| re.is_match(&upper)) {
            ProviderHint::Title
        } else {
            ProviderHint::Actor
        }
    }

    /// The `type` parameter sent to the provider endpoint.
    pub fn query_type(&self) -> Option<ProviderQueryType> {
        match self {
            ProviderHint::Auto => None,
            ProviderHint::Title => Some(ProviderQueryType::Movie),
            ProviderHint::Actor => Some(ProviderQueryType::Actress),
        }
    }
}

/// One user search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub flags: SourceFlags,
    /// Only consulted when `flags.provider` is set.
    #[serde(default)]
    pub hint: ProviderHint,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, flags: SourceFlags) -> Self {
        Self {
            text: text.into(),
            flags,
            hint: ProviderHint::Auto,
        }
    }

    pub fn with_hint(mut self, hint: ProviderHint) -> Self {
        self.hint = hint;
        self
    }

    /// Trimmed query text.
    pub fn normalized(&self) -> &str {
        self.text.trim()
    }
}

/// Origin of a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Local,
    Rankings,
    Provider,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Local => "local",
            SourceTag::Rankings => "rankings",
            SourceTag::Provider => "provider",
        }
    }
}

/// A file in the local library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMovieRecord {
    pub identifier: String,
    pub title: String,
    pub path: String,
    pub size_bytes: u64,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fanart_url: Option<String>,
}

/// A ranking list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub identifier: String,
    pub title: String,
    pub position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub local_exists: bool,
    pub rank_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    Movie,
    Actor,
}

/// A metadata-provider hit. Actors count as a single result and carry their
/// filmography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub identifier: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub kind: MetadataKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filmography: Vec<FilmographyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmographyEntry {
    pub identifier: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

/// A normalized result, tagged with its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceResult {
    Local(LocalMovieRecord),
    Rankings(RankingEntry),
    Provider(MetadataRecord),
}

impl SourceResult {
    pub fn source(&self) -> SourceTag {
        match self {
            SourceResult::Local(_) => SourceTag::Local,
            SourceResult::Rankings(_) => SourceTag::Rankings,
            SourceResult::Provider(_) => SourceTag::Provider,
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            SourceResult::Local(r) => &r.identifier,
            SourceResult::Rankings(r) => &r.identifier,
            SourceResult::Provider(r) => &r.identifier,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            SourceResult::Local(r) => &r.title,
            SourceResult::Rankings(r) => &r.title,
            SourceResult::Provider(r) => &r.title,
        }
    }
}

/// A source that failed while the search as a whole succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWarning {
    pub source: SourceTag,
    pub message: String,
}

/// Merged outcome of one search.
///
/// `results` is grouped by source (local, rankings, provider) with each
/// source's order preserved, and its length always equals the sum of
/// `per_source_counts`. Failed sources have no count entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResultSet {
    pub query: String,
    pub per_source_counts: BTreeMap<SourceTag, usize>,
    pub results: Vec<SourceResult>,
    #[serde(default)]
    pub warnings: Vec<SourceWarning>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl AggregatedResultSet {
    pub fn total(&self) -> usize {
        self.per_source_counts.values().sum()
    }

    /// The "no results" outcome, distinct from a failed search.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn count(&self, source: SourceTag) -> usize {
        self.per_source_counts.get(&source).copied().unwrap_or(0)
    }

    pub fn from_source(&self, source: SourceTag) -> impl Iterator<Item = &SourceResult> {
        self.results.iter().filter(move |r| r.source() == source)
    }
}
