//! Identifier classification: bibcodes, DOIs, and arXiv ids.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::search::Literature;

/// Identifier schemes the classifier knows, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// ADS bibcode: 4-digit year prefix, 19 characters total.
    Bibcode,
    /// arXiv id, modern (`YYMM.NNNNN`) or legacy (`archive/YYNNNNN`).
    Arxiv,
    /// DOI (`10.xxxx/...`).
    Doi,
}

static BIBCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}\D\S{13}[A-Z.:]$").unwrap());
static ARXIV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{4}\.\d{4,5}|[a-z-]+(?:\.[A-Za-z-]+)?/\d{7})").unwrap());
static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^10\.\d{4,}(?:\.\d+)*/[^\s'"&<>]+"#).unwrap());

impl IdScheme {
    /// All schemes, in classification order. Bibcode first: a bibcode must
    /// never fall through to a looser pattern.
    pub const ALL: [IdScheme; 3] = [IdScheme::Bibcode, IdScheme::Arxiv, IdScheme::Doi];

    /// The pattern a value must match at the start of the string.
    pub fn pattern(&self) -> &'static Regex {
        match self {
            Self::Bibcode => &BIBCODE_RE,
            Self::Arxiv => &ARXIV_RE,
            Self::Doi => &DOI_RE,
        }
    }

    /// The ADS query field restricting a lookup to this scheme.
    pub fn query_field(&self) -> &'static str {
        match self {
            Self::Bibcode => "bibcode",
            Self::Arxiv => "arxiv",
            Self::Doi => "doi",
        }
    }
}

/// Outcome of a single identifier lookup against the database.
///
/// A dropped connection is not the same thing as "no such record"; callers
/// treat both as no-match for control flow, but the distinction stays
/// visible here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdLookup {
    /// The database resolved the identifier to this bibcode.
    Found(String),
    /// The database answered and reported no matching record.
    NotFound,
    /// The call kept failing; the identifier may or may not exist.
    Transient,
}

/// Attempts per lookup before giving up as transient.
const LOOKUP_ATTEMPTS: usize = 3;

/// Classify a string against the known identifier shapes, first match wins.
/// Returns the scheme and the matched substring.
pub fn classify(s: &str) -> Option<(IdScheme, &str)> {
    let s = s.trim();
    for scheme in IdScheme::ALL {
        if let Some(m) = scheme.pattern().find(s) {
            return Some((scheme, m.as_str()));
        }
    }
    None
}

/// Look one identifier up under its scheme, with bounded retry on errors.
pub async fn lookup_with_retry<D: Literature>(db: &D, scheme: IdScheme, value: &str) -> IdLookup {
    for _ in 0..LOOKUP_ATTEMPTS {
        match db.lookup_identifier(scheme, value).await {
            Ok(Some(bibcode)) => return IdLookup::Found(bibcode),
            Ok(None) => return IdLookup::NotFound,
            Err(_) => continue,
        }
    }
    IdLookup::Transient
}

/// Resolve an arbitrary string to a bibcode if it looks like an identifier.
///
/// Classification is exclusive: the first matching scheme is the only one
/// looked up, so a bibcode-shaped string is never retried as a DOI.
pub async fn id_to_bibcode<D: Literature>(db: &D, s: &str) -> IdLookup {
    match classify(s) {
        Some((scheme, value)) => lookup_with_retry(db, scheme, value).await,
        None => IdLookup::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ScitexError};
    use crate::types::{Candidate, Database};
    use std::sync::Mutex;

    #[test]
    fn test_classify_bibcode() {
        let (scheme, m) = classify("1998AJ....116.1009R").unwrap();
        assert_eq!(scheme, IdScheme::Bibcode);
        assert_eq!(m, "1998AJ....116.1009R");
    }

    #[test]
    fn test_classify_doi() {
        let (scheme, m) = classify("10.1086/305772").unwrap();
        assert_eq!(scheme, IdScheme::Doi);
        assert_eq!(m, "10.1086/305772");
    }

    #[test]
    fn test_classify_arxiv_modern() {
        let (scheme, m) = classify("1705.03888").unwrap();
        assert_eq!(scheme, IdScheme::Arxiv);
        assert_eq!(m, "1705.03888");
    }

    #[test]
    fn test_classify_arxiv_legacy() {
        let (scheme, m) = classify("astro-ph/9805201").unwrap();
        assert_eq!(scheme, IdScheme::Arxiv);
        assert_eq!(m, "astro-ph/9805201");
    }

    #[test]
    fn test_bibcode_not_misread_as_doi() {
        // Bibcodes start with a year, never "10.", and are tried first.
        let (scheme, _) = classify("2017MNRAS.464.3108G").unwrap();
        assert_eq!(scheme, IdScheme::Bibcode);
        assert!(!DOI_RE.is_match("2017MNRAS.464.3108G"));
    }

    #[test]
    fn test_classify_rejects_plain_keys() {
        assert!(classify("Smith17").is_none());
        assert!(classify("").is_none());
        assert!(classify("some_key_2017").is_none());
    }

    /// Records lookup calls and serves canned answers.
    struct ScriptedDb {
        calls: Mutex<Vec<(IdScheme, String)>>,
        answer: Option<String>,
        failures_before_answer: Mutex<usize>,
    }

    impl ScriptedDb {
        fn new(answer: Option<&str>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                answer: answer.map(String::from),
                failures_before_answer: Mutex::new(0),
            }
        }
    }

    impl Literature for ScriptedDb {
        async fn lookup_identifier(&self, scheme: IdScheme, value: &str) -> Result<Option<String>> {
            self.calls.lock().unwrap().push((scheme, value.to_string()));
            let mut failures = self.failures_before_answer.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ScitexError::Parse("connection dropped".to_string()));
            }
            Ok(self.answer.clone())
        }

        async fn search_author_year(
            &self,
            _first_author: &str,
            _year: &str,
            _database: Database,
        ) -> Result<Vec<Candidate>> {
            Ok(Vec::new())
        }

        async fn export_bibtex(&self, _bibcodes: &[String]) -> Result<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_doi_lookup_restricted_to_doi_scheme() {
        let db = ScriptedDb::new(Some("1998ApJ...500..525S"));
        let result = id_to_bibcode(&db, "10.1086/305772").await;
        assert_eq!(result, IdLookup::Found("1998ApJ...500..525S".to_string()));

        let calls = db.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (IdScheme::Doi, "10.1086/305772".to_string()));
    }

    #[tokio::test]
    async fn test_non_identifier_makes_no_calls() {
        let db = ScriptedDb::new(Some("1998ApJ...500..525S"));
        assert_eq!(id_to_bibcode(&db, "Smith17").await, IdLookup::NotFound);
        assert!(db.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_then_surfaced() {
        let db = ScriptedDb::new(Some("1998ApJ...500..525S"));
        *db.failures_before_answer.lock().unwrap() = 2;
        // Two failures, third attempt succeeds.
        let result = id_to_bibcode(&db, "10.1086/305772").await;
        assert_eq!(result, IdLookup::Found("1998ApJ...500..525S".to_string()));

        let db = ScriptedDb::new(Some("1998ApJ...500..525S"));
        *db.failures_before_answer.lock().unwrap() = 99;
        assert_eq!(id_to_bibcode(&db, "10.1086/305772").await, IdLookup::Transient);
    }
}
