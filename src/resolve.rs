//! Citation-key resolution.
//!
//! A key resolves in one of three ways, tried in order: it is itself an
//! identifier; it matches an author+year shape and an ADS search (with
//! interactive disambiguation) pins it down; or the operator types an
//! identifier by hand. An empty line skips the key; an interrupted read
//! aborts the whole run.

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;

use crate::error::{Result, ScitexError};
use crate::ident::{id_to_bibcode, IdLookup};
use crate::search::Literature;
use crate::types::{Candidate, Config};

/// Leading surname, optional separator run, 2-or-4-digit year. The
/// separator's first character must itself be a non-word character or `_`
/// but never whitespace or a comma, so `Smith 17` is not an author+year key.
static AUTHOR_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z-]+)(?:[\W_&&[^\s\d,]][^\s\d,]*)?((?:\d{2})?\d{2})").unwrap()
});

/// Multi-word surname prefixes, longest first so "van der" beats "van".
const NAME_PREFIXES: [&str; 9] = [
    "van den", "van der", "von der", "van de", "den", "der", "van", "de", "di",
];

/// Character budget for one candidate line in the picker.
const DISPLAY_WIDTH: usize = 78;

/// Section banner for operator-facing messages.
pub(crate) fn headerize(msg: &str) -> String {
    let rule = "-".repeat(60);
    format!("\n{}\n{}\n{}", rule, msg, rule)
}

/// Expand a two-digit year: values above the current year's last two
/// digits belong to the previous century.
fn y2_to_y4(y2: &str, this_year: i32) -> String {
    let y2: i32 = y2.parse().unwrap_or(0);
    let cent = this_year / 100;
    let k = i32::from(y2 > this_year % 100);
    ((cent - k) * 100 + y2).to_string()
}

/// Split a key like `Smith17` or `Planck_2016` into surname and 4-digit year.
fn parse_author_year(key: &str, this_year: i32) -> Option<(String, String)> {
    let caps = AUTHOR_YEAR_RE.captures(key)?;
    let author = caps[1].to_string();
    let year = if caps[2].len() == 2 {
        y2_to_y4(&caps[2], this_year)
    } else {
        caps[2].to_string()
    };
    Some((author, year))
}

/// Spaced forms of a squashed multi-word surname ("vanDerWeel" ->
/// "van der Weel"), longest prefix first. Empty when no prefix applies.
fn prefix_expansions(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    NAME_PREFIXES
        .iter()
        .filter_map(|prefix| {
            let squashed = prefix.replace(' ', "");
            if !lower.starts_with(&squashed) {
                return None;
            }
            let rest = name.get(squashed.len()..)?;
            if rest.is_empty() {
                return None;
            }
            Some(format!("{} {}", prefix, rest))
        })
        .collect()
}

/// First author plus as many co-authors as fit the budget, else `et al.`.
fn format_author(authors: &[String], max_char: usize) -> String {
    let Some(first) = authors.first() else {
        return "<no author>".to_string();
    };
    let mut s = first.clone();
    for author in &authors[1..] {
        if s.len() + author.len() + 2 < max_char.saturating_sub(7) {
            s = format!("{}; {}", s, author);
        } else {
            return format!("{} et al.", s);
        }
    }
    s
}

/// One candidate row for the picker.
fn format_candidate(rank: usize, candidate: &Candidate, max_char: usize) -> String {
    let title: String = candidate
        .title
        .as_deref()
        .unwrap_or("<no title>")
        .chars()
        .take(max_char - 4)
        .collect();
    format!(
        "[{}] {} (cited {} times)\n    {}\n    {}",
        rank,
        candidate.bibcode,
        candidate.citation_count,
        format_author(&candidate.authors, max_char - 4),
        title
    )
}

/// Source of operator input during interactive resolution.
///
/// An empty line is a deliberate skip; an interrupted or unavailable read
/// is an error and aborts the run before anything is written.
pub trait Prompter: Send + Sync {
    /// Read one line of input.
    fn read_line(&self, text: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Prompts on the controlling terminal via `dialoguer`.
///
/// The blocking read runs on the blocking pool, keeping the runtime (and
/// the top-level Ctrl-C race) responsive while a prompt is open. Ctrl-C
/// pressed inside a prompt surfaces as an error from the raw-mode read and
/// becomes [`ScitexError::Interrupted`].
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    async fn read_line(&self, text: &str) -> Result<String> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            dialoguer::Input::<String>::new()
                .with_prompt(text)
                .allow_empty(true)
                .interact_text()
        })
        .await
        .map_err(|_| ScitexError::Interrupted)?
        .map_err(|_| ScitexError::Interrupted)
    }
}

/// Resolves citation keys, interactively when needed.
pub struct Resolver<'a, D, P = TerminalPrompter> {
    db: &'a D,
    config: &'a Config,
    prompter: P,
    this_year: i32,
}

impl<'a, D: Literature> Resolver<'a, D> {
    pub fn new(db: &'a D, config: &'a Config) -> Self {
        Self::with_prompter(db, config, TerminalPrompter)
    }
}

impl<'a, D: Literature, P: Prompter> Resolver<'a, D, P> {
    pub fn with_prompter(db: &'a D, config: &'a Config, prompter: P) -> Self {
        Self {
            db,
            config,
            prompter,
            this_year: chrono::Local::now().year(),
        }
    }

    #[cfg(test)]
    fn at_year(db: &'a D, config: &'a Config, prompter: P, this_year: i32) -> Self {
        Self {
            db,
            config,
            prompter,
            this_year,
        }
    }

    /// Resolve one key to a bibcode; `Ok(None)` means the operator skipped
    /// it, `Err` aborts the run.
    pub async fn find_bibcode(&self, key: &str) -> Result<Option<String>> {
        if let IdLookup::Found(bibcode) = id_to_bibcode(self.db, key).await {
            return Ok(Some(bibcode));
        }

        if let Some((author, year)) = parse_author_year(key, self.this_year) {
            if let Some(bibcode) = self.author_year_to_bibcode(&author, &year, key).await? {
                return Ok(Some(bibcode));
            }
        }

        println!(
            "{}",
            headerize(&format!(
                "ENTER an identifier (bibcode, arxiv, doi) for \"{}\"",
                key
            ))
        );
        loop {
            let input = self
                .prompter
                .read_line("Identifier (or press ENTER to skip)")
                .await?;
            if input.trim().is_empty() {
                return Ok(None);
            }
            if let IdLookup::Found(bibcode) = id_to_bibcode(self.db, &input).await {
                return Ok(Some(bibcode));
            }
        }
    }

    /// Author+year search with the multi-word-surname retry.
    async fn author_year_to_bibcode(
        &self,
        author: &str,
        year: &str,
        key: &str,
    ) -> Result<Option<String>> {
        let mut candidates = self.search(author, year).await;

        if candidates.is_empty() && !author.contains(' ') {
            // A squashed prefix ("vanDerWeel") hides the record under the
            // spaced form; retry each applicable expansion, longest first.
            for expanded in prefix_expansions(author) {
                candidates = self.search(&expanded, year).await;
                if !candidates.is_empty() {
                    break;
                }
            }
        }

        if candidates.is_empty() {
            return Ok(None);
        }
        self.choose_candidate(key, &candidates).await
    }

    async fn search(&self, author: &str, year: &str) -> Vec<Candidate> {
        self.db
            .search_author_year(author, year, self.config.database)
            .await
            .unwrap_or_default()
    }

    /// Present ranked candidates, most cited last, and read the choice:
    /// `0` skips, `1..=N` picks, anything else is tried as a raw identifier,
    /// and invalid input re-prompts.
    async fn choose_candidate(
        &self,
        key: &str,
        candidates: &[Candidate],
    ) -> Result<Option<String>> {
        let total = candidates.len();
        println!(
            "{}",
            headerize(&format!(
                "Choose one entry from below for \"{}\" (most cited at the end)",
                key
            ))
        );
        let rows: Vec<String> = candidates
            .iter()
            .enumerate()
            .rev()
            .map(|(i, c)| format_candidate(i + 1, c, DISPLAY_WIDTH))
            .collect();
        println!("{}", rows.join("\n\n"));
        println!(
            "{}",
            headerize(&format!("Choose one entry from above for \"{}\"", key))
        );

        loop {
            let input = self
                .prompter
                .read_line("ENTER choice (0 to skip, or ENTER an identifier)")
                .await?;
            if let IdLookup::Found(bibcode) = id_to_bibcode(self.db, &input).await {
                return Ok(Some(bibcode));
            }
            match input.trim().parse::<usize>() {
                Ok(0) => return Ok(None),
                Ok(c) if c <= total => return Ok(Some(candidates[c - 1].bibcode.clone())),
                _ => continue,
            }
        }
    }
}
