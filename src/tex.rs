//! Citation-key extraction from TeX sources.
//!
//! A shallow pattern match over comment-stripped text, not a TeX parser.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::Result;

static CITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\[cC]ite[a-zA-Z]{0,7}\*?(?:\s*(?:\[[^\]]*\]|<[^>]*>))*\s*\{([\w\s/&.:,-]+)\}")
        .unwrap()
});

static BIBLIOGRAPHY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\bibliography\s*\{([^}]+)\}").unwrap());

/// Drop everything from an unescaped `%` to the end of each line.
///
/// `\%` is a literal percent; `\\%` starts a comment (the backslashes
/// escape each other).
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let mut backslashes = 0usize;
        let mut cut = None;
        for (i, c) in line.char_indices() {
            match c {
                '\\' => backslashes += 1,
                '%' if backslashes % 2 == 0 => {
                    cut = Some(i);
                    break;
                }
                _ => backslashes = 0,
            }
        }
        match cut {
            Some(i) => {
                out.push_str(&line[..i]);
                if line.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => out.push_str(line),
        }
    }
    out
}

/// Extract the keys cited in one chunk of TeX source.
pub fn extract_keys(text: &str, keys: &mut BTreeSet<String>) {
    let text = strip_comments(text);
    for caps in CITE_RE.captures_iter(&text) {
        for key in caps[1].split(',') {
            let key = key.trim();
            if !key.is_empty() {
                keys.insert(key.to_string());
            }
        }
    }
}

/// Union the citation keys found across all given files.
pub fn search_keys(files: &[PathBuf]) -> Result<BTreeSet<String>> {
    let mut keys = BTreeSet::new();
    for file in files {
        let text = std::fs::read_to_string(file)?;
        extract_keys(&text, &mut keys);
    }
    Ok(keys)
}

/// Find the first `\bibliography{...}` declaration across the given files.
///
/// Each declared name resolves relative to the declaring file's directory,
/// with a `.bib` suffix appended when absent. Returns `None` when no file
/// declares a bibliography.
pub fn find_bib_files(files: &[PathBuf]) -> Result<Option<Vec<PathBuf>>> {
    for file in files {
        let text = strip_comments(&std::fs::read_to_string(file)?);
        if let Some(caps) = BIBLIOGRAPHY_RE.captures(&text) {
            let base = file.parent().unwrap_or(Path::new(""));
            let paths = caps[1]
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    let name = if name.ends_with(".bib") {
                        name.to_string()
                    } else {
                        format!("{}.bib", name)
                    };
                    base.join(name)
                })
                .collect();
            return Ok(Some(paths));
        }
    }
    Ok(None)
}
