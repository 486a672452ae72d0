//! Re-checking already-resolved entries against the database.
//!
//! An entry that is already in the output file may have gained a better
//! canonical record since it was written (preprint now published, say).
//! This module re-derives a bibcode from the entry's identifying fields so
//! the driver can decide between keeping and updating it.

use biblatex::Entry;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::bib::field_verbatim;
use crate::ident::{lookup_with_retry, IdLookup, IdScheme};
use crate::search::Literature;

/// Bibcode shape as it appears at the end of an ADS abstract URL.
static URL_BIBCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}\D\S{13}[A-Z.:]$").unwrap());

/// Identifier shapes searched (unanchored) inside free-form field values.
static SCAN_DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"10\.\d{4,}(?:\.\d+)*/[^\s'"&<>]+"#).unwrap());
static SCAN_ARXIV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\d{4}\.\d{4,5}|[a-z-]+(?:\.[A-Za-z-]+)?/\d{7})").unwrap());

/// The bibcode embedded in the entry's `adsurl` field, if any.
pub fn embedded_bibcode(entry: &Entry) -> Option<String> {
    let url = field_verbatim(entry, "adsurl")?;
    let decoded = percent_decode(&url);
    URL_BIBCODE_RE
        .find(&decoded)
        .map(|m| m.as_str().to_string())
}

fn percent_decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// Re-derive a bibcode from the entry's identifying fields.
///
/// Priority: `adsurl` (as a bibcode), `doi`, `eprint` (as an arXiv id),
/// then the generic `url` and `note` fields scanned against all three
/// shapes. The first hit wins.
pub async fn entry_to_bibcode<D: Literature>(db: &D, entry: &Entry) -> IdLookup {
    let mut saw_transient = false;

    if let Some(bibcode) = embedded_bibcode(entry) {
        match lookup_with_retry(db, IdScheme::Bibcode, &bibcode).await {
            IdLookup::Found(b) => return IdLookup::Found(b),
            IdLookup::NotFound => {}
            IdLookup::Transient => saw_transient = true,
        }
    }

    for (field, scheme) in [("doi", IdScheme::Doi), ("eprint", IdScheme::Arxiv)] {
        let Some(value) = field_verbatim(entry, field) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match lookup_with_retry(db, scheme, value).await {
            IdLookup::Found(b) => return IdLookup::Found(b),
            IdLookup::NotFound => {}
            IdLookup::Transient => saw_transient = true,
        }
    }

    for field in ["url", "note"] {
        let Some(value) = field_verbatim(entry, field) else {
            continue;
        };
        let decoded = percent_decode(&value);
        for (scheme, pattern) in [
            (IdScheme::Bibcode, &*URL_BIBCODE_RE),
            (IdScheme::Arxiv, &*SCAN_ARXIV_RE),
            (IdScheme::Doi, &*SCAN_DOI_RE),
        ] {
            let Some(m) = pattern.find(&decoded) else {
                continue;
            };
            match lookup_with_retry(db, scheme, m.as_str()).await {
                IdLookup::Found(b) => return IdLookup::Found(b),
                IdLookup::NotFound => {}
                IdLookup::Transient => saw_transient = true,
            }
        }
    }

    if saw_transient {
        IdLookup::Transient
    } else {
        IdLookup::NotFound
    }
}
