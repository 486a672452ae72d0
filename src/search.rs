//! The literature-database calls scitex makes, as a trait plus the ADS
//! implementation.
//!
//! The [`Literature`] trait is the seam the resolver and driver talk to;
//! tests substitute a canned implementation so no network is involved.

use std::future::Future;

use crate::client::AdsClient;
use crate::error::Result;
use crate::ident::IdScheme;
use crate::parse::{parse_candidates, parse_export, parse_first_bibcode, CANDIDATE_FIELDS};
use crate::types::{Candidate, Database};

/// The three calls the literature database offers.
pub trait Literature: Send + Sync {
    /// Look a known identifier up, restricted to its scheme.
    /// Returns the single matching bibcode, or `None`.
    fn lookup_identifier(
        &self,
        scheme: IdScheme,
        value: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Search by anchored first-author surname and exact year, scoped to
    /// `database`, up to 20 candidates sorted by descending citation count.
    fn search_author_year(
        &self,
        first_author: &str,
        year: &str,
        database: Database,
    ) -> impl Future<Output = Result<Vec<Candidate>>> + Send;

    /// Export a set of bibcodes as one BibTeX text blob.
    fn export_bibtex(&self, bibcodes: &[String]) -> impl Future<Output = Result<String>> + Send;
}

impl Literature for AdsClient {
    async fn lookup_identifier(&self, scheme: IdScheme, value: &str) -> Result<Option<String>> {
        let query = format!("{}:\"{}\"", scheme.query_field(), value);
        let params = [("q", query.as_str()), ("fl", "bibcode"), ("rows", "1")];
        let body = self.get("/search/query", &params).await?;
        parse_first_bibcode(&body)
    }

    async fn search_author_year(
        &self,
        first_author: &str,
        year: &str,
        database: Database,
    ) -> Result<Vec<Candidate>> {
        let query = format!(
            "author:\"^{}\" year:{} database:{}",
            first_author,
            year,
            database.as_query_str()
        );
        let params = [
            ("q", query.as_str()),
            ("fl", CANDIDATE_FIELDS),
            ("rows", "20"),
            ("sort", "citation_count desc"),
        ];
        let body = self.get("/search/query", &params).await?;
        parse_candidates(&body)
    }

    async fn export_bibtex(&self, bibcodes: &[String]) -> Result<String> {
        let body = serde_json::json!({ "bibcode": bibcodes });
        let response_body = self.post_json("/export/bibtex", &body).await?;
        parse_export(&response_body)
    }
}
