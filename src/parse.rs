//! ADS API response parsing.

use crate::error::{Result, ScitexError};
use crate::types::Candidate;
use serde::Deserialize;

/// Fields requested in author/year candidate searches.
pub(crate) const CANDIDATE_FIELDS: &str = "bibcode,author,title,citation_count";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    response: ApiResponseBody,
}

#[derive(Debug, Deserialize)]
struct ApiResponseBody {
    docs: Vec<ApiDocument>,
}

#[derive(Debug, Deserialize)]
struct ApiDocument {
    bibcode: String,
    title: Option<Vec<String>>,
    author: Option<Vec<String>>,
    citation_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ApiExportResponse {
    export: String,
}

/// Parse a search response into candidate summaries, in server order.
pub(crate) fn parse_candidates(json: &str) -> Result<Vec<Candidate>> {
    let response: ApiResponse = serde_json::from_str(json)
        .map_err(|e| ScitexError::Parse(format!("Invalid ADS JSON: {}", e)))?;

    Ok(response
        .response
        .docs
        .into_iter()
        .map(|doc| Candidate {
            bibcode: doc.bibcode,
            authors: doc.author.unwrap_or_default(),
            title: doc.title.and_then(|t| t.into_iter().next()),
            citation_count: doc.citation_count.map(|c| c.max(0) as u32).unwrap_or(0),
        })
        .collect())
}

/// Parse a search response down to the first bibcode, if any.
pub(crate) fn parse_first_bibcode(json: &str) -> Result<Option<String>> {
    let response: ApiResponse = serde_json::from_str(json)
        .map_err(|e| ScitexError::Parse(format!("Invalid ADS JSON: {}", e)))?;
    Ok(response.response.docs.into_iter().next().map(|d| d.bibcode))
}

/// Parse an export response into the BibTeX text blob.
pub(crate) fn parse_export(json: &str) -> Result<String> {
    let response: ApiExportResponse = serde_json::from_str(json)
        .map_err(|e| ScitexError::Parse(format!("Invalid export response: {}", e)))?;
    Ok(response.export)
}
