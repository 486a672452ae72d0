//! Loading, merging, and writing BibTeX files.
//!
//! Parsing and serialization are delegated to `biblatex`; this module owns
//! the file-level contract: missing files read as empty, a `june` month
//! macro is predefined, merges overlay by key with the newer entry winning,
//! and writes go through an optional `.bak` backup.

use biblatex::{Bibliography, ChunksExt, Entry};
use std::path::{Path, PathBuf};

use crate::error::{Result, ScitexError};

/// String macros predefined for every parse.
const PREAMBLE: &str = "@string{june = {June}}\n";

/// Parse BibTeX text into a keyed record collection.
pub fn parse(text: &str) -> Result<Bibliography> {
    Bibliography::parse(&format!("{}{}", PREAMBLE, text))
        .map_err(|e| ScitexError::Bib(e.to_string()))
}

/// Load a BibTeX file; a missing file is an empty bibliography.
pub fn load(path: &Path) -> Result<Bibliography> {
    if !path.is_file() {
        return Ok(Bibliography::new());
    }
    let text = std::fs::read_to_string(path)?;
    parse(&text).map_err(|e| match e {
        ScitexError::Bib(msg) => ScitexError::Bib(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Overlay `new` onto `base` by key; entries in `new` win.
pub fn merge(base: &mut Bibliography, new: Bibliography) {
    for entry in new.into_vec() {
        base.insert(entry);
    }
}

/// A field's value with macros and LaTeX commands flattened to plain text.
pub fn field_verbatim(entry: &Entry, field: &str) -> Option<String> {
    entry.get(field).map(|chunks| chunks.format_verbatim())
}

/// Write the bibliography as UTF-8 BibTeX, copying any pre-existing file to
/// `<path>.bak` first when backup is enabled.
pub fn write(path: &Path, bib: &Bibliography, backup: bool) -> Result<()> {
    if backup && path.is_file() {
        std::fs::copy(path, bak_path(path))?;
    }
    let mut text = String::new();
    bib.write_bibtex(&mut text)
        .map_err(|_| ScitexError::Bib("entry not representable as BibTeX".to_string()))?;
    std::fs::write(path, text)?;
    Ok(())
}

fn bak_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".bak");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ENTRIES: &str = r#"
@ARTICLE{Smith17,
  author = {Smith, A.},
  title = {First},
  year = 2017,
}
@ARTICLE{Jones20,
  author = {Jones, B.},
  title = {Second},
  year = 2020,
}
"#;

    #[test]
    fn test_merge_overlays_by_key() {
        let mut base = parse(TWO_ENTRIES).unwrap();
        let new = parse(
            r#"
@ARTICLE{Smith17,
  author = {Smith, A.},
  title = {Revised},
  year = 2017,
}
@ARTICLE{Brown19,
  author = {Brown, C.},
  title = {Third},
  year = 2019,
}
"#,
        )
        .unwrap();

        merge(&mut base, new);

        // Union of key sets; the overlapping key carries the new version.
        assert_eq!(base.len(), 3);
        let smith = base.get("Smith17").unwrap();
        assert_eq!(field_verbatim(smith, "title").as_deref(), Some("Revised"));
        assert!(base.get("Jones20").is_some());
        assert!(base.get("Brown19").is_some());
    }

    #[test]
    fn test_june_macro_is_predefined() {
        let bib = parse("@ARTICLE{K1,\n  month = june,\n  year = 1999,\n}").unwrap();
        let entry = bib.get("K1").unwrap();
        assert_eq!(field_verbatim(entry, "month").as_deref(), Some("June"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let bib = load(&dir.path().join("absent.bib")).unwrap();
        assert!(bib.is_empty());
    }

    #[test]
    fn test_write_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.bib");
        let bib = parse(TWO_ENTRIES).unwrap();

        write(&path, &bib, true).unwrap();
        assert!(!path.with_extension("bib.bak").exists());

        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.get("Smith17").is_some());
    }

    #[test]
    fn test_write_backs_up_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.bib");
        std::fs::write(&path, "@ARTICLE{Old00,\n  year = 2000,\n}\n").unwrap();

        let bib = parse(TWO_ENTRIES).unwrap();
        write(&path, &bib, true).unwrap();

        let bak = dir.path().join("refs.bib.bak");
        assert!(bak.exists());
        assert!(std::fs::read_to_string(&bak).unwrap().contains("Old00"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("Smith17"));
    }

    #[test]
    fn test_write_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.bib");
        std::fs::write(&path, "@ARTICLE{Old00,\n  year = 2000,\n}\n").unwrap();

        let bib = parse(TWO_ENTRIES).unwrap();
        write(&path, &bib, false).unwrap();
        assert!(!dir.path().join("refs.bib.bak").exists());
    }
}
