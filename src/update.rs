//! Best-effort check for a newer scitex release.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CratesIoResponse {
    #[serde(rename = "crate")]
    krate: CrateInfo,
}

#[derive(Debug, Deserialize)]
struct CrateInfo {
    max_stable_version: String,
}

/// The newer published version, if one exists.
///
/// Time-bounded and non-critical: any network or parse problem reads as
/// "no update".
pub async fn newer_version() -> Option<String> {
    let latest = tokio::time::timeout(Duration::from_secs(3), fetch_latest())
        .await
        .ok()??;
    if is_newer(&latest, env!("CARGO_PKG_VERSION")) {
        Some(latest)
    } else {
        None
    }
}

async fn fetch_latest() -> Option<String> {
    let client = reqwest::Client::new();
    let body = client
        .get("https://crates.io/api/v1/crates/scitex")
        .header("User-Agent", concat!("scitex/", env!("CARGO_PKG_VERSION")))
        .send()
        .await
        .ok()?
        .text()
        .await
        .ok()?;
    let info: CratesIoResponse = serde_json::from_str(&body).ok()?;
    Some(info.krate.max_stable_version)
}

fn is_newer(candidate: &str, current: &str) -> bool {
    fn numbers(v: &str) -> Vec<u64> {
        v.split('.').filter_map(|p| p.parse().ok()).collect()
    }
    numbers(candidate) > numbers(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_newer() {
        assert!(is_newer("0.2.0", "0.1.0"));
        assert!(is_newer("0.1.10", "0.1.9"));
        assert!(is_newer("1.0.0", "0.9.9"));
        assert!(!is_newer("0.1.0", "0.1.0"));
        assert!(!is_newer("0.0.9", "0.1.0"));
        assert!(!is_newer("not a version", "0.1.0"));
    }
}
