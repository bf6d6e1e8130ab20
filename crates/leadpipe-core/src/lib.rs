use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("no results: {0}")]
    NoResults(String),
    #[error("search fetch failed: {0}")]
    Fetch(String),
    #[error("search blocked: {0}")]
    Blocked(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One lead-generation search request, before it becomes a search-engine query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadQuery {
    pub keyword: String,
    pub location: String,
    pub email_domain: String,
    /// Cap on engine-side results. Backends clamp this to their own maximum.
    pub max_results: Option<usize>,
}

impl LeadQuery {
    /// The literal query string sent to the search engine: keyword, location
    /// and email-domain hint joined with the word "contact".
    pub fn search_terms(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4);
        for p in [
            self.keyword.trim(),
            self.location.trim(),
            self.email_domain.trim(),
        ] {
            if !p.is_empty() {
                parts.push(p);
            }
        }
        parts.push("contact");
        parts.join(" ")
    }
}

/// One parsed search-result entry, prior to AI extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSnippet {
    pub title: String,
    pub description: String,
    pub link: Option<String>,
}

/// A contact-ish field as the model actually emits it: a bare string, a small
/// labeled map ("office" -> "..."), or a list of strings. Untagged so the wire
/// shape stays what the model wrote, while consumers must match all variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContactField {
    Scalar(String),
    Labeled(BTreeMap<String, String>),
    List(Vec<String>),
}

impl Default for ContactField {
    fn default() -> Self {
        Self::Scalar(String::new())
    }
}

impl ContactField {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(s) => s.trim().is_empty(),
            Self::Labeled(m) => m.values().all(|v| v.trim().is_empty()),
            Self::List(v) => v.iter().all(|s| s.trim().is_empty()),
        }
    }
}

/// A structured business contact extracted from search-result text.
///
/// Every field defaults to empty so a partially-filled model response still
/// deserializes; validity is decided separately by [`LeadRecord::is_valid`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: ContactField,
    #[serde(default)]
    pub phone: ContactField,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub contact: ContactField,
}

impl LeadRecord {
    /// A record is worth keeping iff it carries at least one way to reach the
    /// business: a name, an email, a phone number, or a website.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            || !self.email.is_empty()
            || !self.phone.is_empty()
            || !self.website.trim().is_empty()
    }
}

/// Per-request extraction statistics, computed once after the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub records_kept: usize,
    pub snippets_found: usize,
    pub success_rate_percent: u32,
}

impl ExtractionSummary {
    /// Only meaningful when `found > 0`; the pipeline short-circuits with
    /// [`Error::NoResults`] before extraction otherwise.
    pub fn from_counts(kept: usize, found: usize) -> Self {
        let rate = if found == 0 {
            0
        } else {
            ((100 * kept) as f64 / found as f64).round() as u32
        };
        Self {
            records_kept: kept,
            snippets_found: found,
            success_rate_percent: rate,
        }
    }
}

/// The pipeline's terminal output: the kept leads plus their summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadReport {
    pub leads: Vec<LeadRecord>,
    pub summary: ExtractionSummary,
}

/// Fetches one page of raw search-result HTML for a query.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    async fn fetch_results(&self, query: &LeadQuery) -> Result<String>;
}

/// Black-box text-completion service used for the extraction pass.
///
/// `prompt` is the fixed instruction block; `input` is the serialized batch.
/// Implementations return the raw response text without interpreting it.
#[async_trait::async_trait]
pub trait ExtractionModel: Send + Sync {
    async fn complete(&self, prompt: &str, input: &str) -> Result<String>;
}

/// Builds an [`ExtractionModel`] from a caller-supplied credential.
///
/// The AI credential arrives with each request and is never persisted, so
/// model construction is deferred until after input validation.
pub trait ModelFactory: Send + Sync {
    fn for_api_key(&self, api_key: &str) -> Arc<dyn ExtractionModel>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_terms_skips_empty_parts() {
        let q = LeadQuery {
            keyword: "dentist".to_string(),
            location: String::new(),
            email_domain: "@gmail.com".to_string(),
            max_results: None,
        };
        assert_eq!(q.search_terms(), "dentist @gmail.com contact");

        let q = LeadQuery {
            keyword: "dentist".to_string(),
            location: "Austin".to_string(),
            email_domain: "@gmail.com".to_string(),
            max_results: None,
        };
        assert_eq!(q.search_terms(), "dentist Austin @gmail.com contact");
    }

    #[test]
    fn contact_field_deserializes_all_shapes() {
        let scalar: ContactField = serde_json::from_str(r#""a@x.com""#).unwrap();
        assert_eq!(scalar, ContactField::Scalar("a@x.com".to_string()));

        let labeled: ContactField =
            serde_json::from_str(r#"{"office":"a@x.com","sales":"b@x.com"}"#).unwrap();
        match &labeled {
            ContactField::Labeled(m) => assert_eq!(m.len(), 2),
            other => panic!("expected labeled, got {other:?}"),
        }

        let list: ContactField = serde_json::from_str(r#"["123","456"]"#).unwrap();
        match &list {
            ContactField::List(v) => assert_eq!(v.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn contact_field_serializes_untagged() {
        let js = serde_json::to_string(&ContactField::Scalar("123".to_string())).unwrap();
        assert_eq!(js, r#""123""#);
        let js = serde_json::to_string(&ContactField::List(vec!["1".to_string()])).unwrap();
        assert_eq!(js, r#"["1"]"#);
    }

    #[test]
    fn contact_field_emptiness() {
        assert!(ContactField::Scalar("  ".to_string()).is_empty());
        assert!(ContactField::List(vec![String::new()]).is_empty());
        assert!(ContactField::Labeled(BTreeMap::new()).is_empty());
        assert!(!ContactField::Scalar("x".to_string()).is_empty());
        let mut m = BTreeMap::new();
        m.insert("office".to_string(), "a@x.com".to_string());
        assert!(!ContactField::Labeled(m).is_empty());
    }

    #[test]
    fn record_validity_requires_some_contact_surface() {
        let empty = LeadRecord::default();
        assert!(!empty.is_valid());

        let named = LeadRecord {
            name: "Dr. Smith".to_string(),
            ..Default::default()
        };
        assert!(named.is_valid());

        let phone_only = LeadRecord {
            phone: ContactField::List(vec!["512-555-0100".to_string()]),
            ..Default::default()
        };
        assert!(phone_only.is_valid());

        // location/description alone do not make a lead reachable
        let vague = LeadRecord {
            location: "Austin".to_string(),
            description: "A dental practice".to_string(),
            ..Default::default()
        };
        assert!(!vague.is_valid());
    }

    #[test]
    fn record_deserializes_with_missing_fields() {
        let r: LeadRecord = serde_json::from_str(r#"{"name":"Acme"}"#).unwrap();
        assert_eq!(r.name, "Acme");
        assert!(r.email.is_empty());
        assert!(r.is_valid());
    }

    #[test]
    fn summary_rate_rounds() {
        let s = ExtractionSummary::from_counts(37, 50);
        assert_eq!(s.success_rate_percent, 74);
        let s = ExtractionSummary::from_counts(1, 2);
        assert_eq!(s.success_rate_percent, 50);
        let s = ExtractionSummary::from_counts(1, 3);
        assert_eq!(s.success_rate_percent, 33);
        let s = ExtractionSummary::from_counts(2, 3);
        assert_eq!(s.success_rate_percent, 67);
        // The model may synthesize more records than snippets.
        let s = ExtractionSummary::from_counts(5, 2);
        assert_eq!(s.success_rate_percent, 250);
    }
}
