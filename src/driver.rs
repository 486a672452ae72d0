//! The run pipeline: extract keys, triage each one, resolve interactively
//! what is left, fetch, merge, write.

use biblatex::{Bibliography, Entry};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::bib;
use crate::error::{Result, ScitexError};
use crate::ident::{id_to_bibcode, IdLookup};
use crate::reconcile::{embedded_bibcode, entry_to_bibcode};
use crate::resolve::{headerize, Prompter, Resolver, TerminalPrompter};
use crate::search::Literature;
use crate::tex;
use crate::types::{Config, Outcome};

/// Everything one run needs, assembled by the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Positional inputs: TeX sources, or a single `.bib` file.
    pub files: Vec<PathBuf>,
    /// Explicit output file, when given.
    pub output: Option<PathBuf>,
    /// Secondary read-only bibliographies.
    pub other: Vec<PathBuf>,
    pub config: Config,
}

/// How the output file and key set were determined.
enum Mode {
    /// Refresh every entry already in the given `.bib` file.
    BibUpdate(PathBuf),
    /// Keys from TeX, output as given on the command line.
    ExplicitOutput(PathBuf),
    /// Keys from TeX, output from the `\bibliography` declaration.
    AutoDetect(PathBuf),
}

fn is_bib(path: &PathBuf) -> bool {
    path.extension().is_some_and(|ext| ext == "bib")
}

/// Validate the argument combination and pick the operating mode.
fn select_mode(opts: &RunOptions) -> Result<(Mode, Vec<PathBuf>)> {
    if opts.files.is_empty() {
        return Err(ScitexError::Usage(
            "at least one TEX (or one .bib) file is required".to_string(),
        ));
    }

    let bib_count = opts.files.iter().filter(|f| is_bib(f)).count();
    if bib_count > 0 {
        if opts.files.len() > 1 {
            return Err(ScitexError::Usage(
                "a .bib input must be the only positional argument".to_string(),
            ));
        }
        if opts.output.is_some() {
            return Err(ScitexError::Usage(
                "--output cannot be combined with a .bib input; the file updates itself"
                    .to_string(),
            ));
        }
        return Ok((Mode::BibUpdate(opts.files[0].clone()), opts.other.clone()));
    }

    if let Some(output) = &opts.output {
        return Ok((Mode::ExplicitOutput(output.clone()), opts.other.clone()));
    }

    match tex::find_bib_files(&opts.files)? {
        Some(declared) => {
            let output = declared[0].clone();
            let mut other = opts.other.clone();
            other.extend(declared.into_iter().skip(1));
            Ok((Mode::AutoDetect(output), other))
        }
        None => Err(ScitexError::Usage(
            "no \\bibliography declaration found; specify --output".to_string(),
        )),
    }
}

/// Non-interactive triage result for one key.
struct Triaged {
    /// `None` defers the key to the interactive phase.
    outcome: Option<Outcome>,
    /// Bibcode this key maps to, for the retrieval multimap.
    mapped: Option<String>,
    /// Whether the mapped bibcode must be fetched this run.
    retrieve: bool,
}

impl Triaged {
    fn done(outcome: Outcome) -> Self {
        Self {
            outcome: Some(outcome),
            mapped: None,
            retrieve: false,
        }
    }

    fn deferred() -> Self {
        Self {
            outcome: None,
            mapped: None,
            retrieve: false,
        }
    }
}

/// Everything decidable for one key without a terminal prompt.
async fn triage_key<D: Literature>(
    db: &D,
    config: &Config,
    key: &str,
    existing: Option<Entry>,
    in_other: bool,
) -> Triaged {
    if let Some(entry) = existing {
        if !config.update {
            return Triaged::done(Outcome::Existing);
        }
        let old = embedded_bibcode(&entry);
        return match entry_to_bibcode(db, &entry).await {
            IdLookup::Found(new) => {
                let changed = old.as_deref() != Some(new.as_str());
                if changed || config.force_regenerate {
                    Triaged {
                        outcome: Some(Outcome::Update(new.clone())),
                        mapped: Some(new),
                        retrieve: true,
                    }
                } else {
                    Triaged {
                        outcome: Some(Outcome::Existing),
                        mapped: Some(new),
                        retrieve: false,
                    }
                }
            }
            IdLookup::NotFound | IdLookup::Transient => Triaged::done(Outcome::Existing),
        };
    }

    if in_other {
        return if config.merge_other {
            Triaged::done(Outcome::Merged)
        } else {
            Triaged::done(Outcome::Ignored)
        };
    }

    match id_to_bibcode(db, key).await {
        IdLookup::Found(bibcode) => Triaged {
            outcome: Some(Outcome::New(bibcode.clone())),
            mapped: Some(bibcode),
            retrieve: true,
        },
        IdLookup::NotFound | IdLookup::Transient => Triaged::deferred(),
    }
}

/// Run the triage phase, fanned out across tasks when configured.
async fn triage_all<D: Literature + 'static>(
    db: &Arc<D>,
    config: &Config,
    keys: &[String],
    base: &Bibliography,
    other: &Bibliography,
) -> Result<HashMap<String, Triaged>> {
    let mut results = HashMap::with_capacity(keys.len());

    if !config.parallel {
        for key in keys {
            let triaged = triage_key(
                db.as_ref(),
                config,
                key,
                base.get(key).cloned(),
                other.get(key).is_some(),
            )
            .await;
            results.insert(key.clone(), triaged);
        }
        return Ok(results);
    }

    let semaphore = Arc::new(Semaphore::new(config.threads.max(1)));
    let mut tasks = JoinSet::new();
    for key in keys {
        let db = Arc::clone(db);
        let config = config.clone();
        let key = key.clone();
        let existing = base.get(&key).cloned();
        let in_other = other.get(&key).is_some();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            let triaged = triage_key(db.as_ref(), &config, &key, existing, in_other).await;
            (key, triaged)
        });
    }
    while let Some(joined) = tasks.join_next().await {
        // A lost task would lose its key's outcome with it, so a panic
        // fails the run instead of being swallowed.
        let (key, triaged) = joined.map_err(|e| ScitexError::Task(e.to_string()))?;
        results.insert(key, triaged);
    }
    Ok(results)
}

/// Execute one full run against the given literature database, prompting
/// on the controlling terminal when a key needs the operator.
pub async fn run<D: Literature + 'static>(db: D, opts: RunOptions) -> Result<()> {
    run_with_prompter(db, opts, TerminalPrompter).await
}

/// [`run`] with an explicit input source for the interactive phase.
pub async fn run_with_prompter<D: Literature + 'static, P: Prompter>(
    db: D,
    opts: RunOptions,
    prompter: P,
) -> Result<()> {
    let db = Arc::new(db);
    let (mode, other_files) = select_mode(&opts)?;

    let output = match &mode {
        Mode::BibUpdate(path) | Mode::ExplicitOutput(path) | Mode::AutoDetect(path) => path.clone(),
    };

    let base = bib::load(&output)?;

    let keys: Vec<String> = match &mode {
        Mode::BibUpdate(_) => base.keys().map(String::from).collect(),
        _ => tex::search_keys(&opts.files)?.into_iter().collect(),
    };

    let mut other = Bibliography::new();
    for file in &other_files {
        bib::merge(&mut other, bib::load(file)?);
    }

    // Phase 1: everything that needs no terminal prompt.
    let mut triaged = triage_all(&db, &opts.config, &keys, &base, &other).await?;

    let mut to_retrieve: BTreeSet<String> = BTreeSet::new();
    let mut key_map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut merged_keys: Vec<String> = Vec::new();
    let mut not_found: BTreeSet<String> = BTreeSet::new();
    let mut deferred: Vec<String> = Vec::new();

    for key in &keys {
        let Some(t) = triaged.remove(key) else {
            continue;
        };
        if let Some(bibcode) = &t.mapped {
            key_map.entry(bibcode.clone()).or_default().push(key.clone());
        }
        if t.retrieve {
            to_retrieve.insert(t.mapped.clone().expect("retrieve implies a bibcode"));
        }
        match t.outcome {
            Some(outcome) => {
                if outcome == Outcome::Merged {
                    merged_keys.push(key.clone());
                }
                println!("{}: {}", key, outcome);
            }
            None => deferred.push(key.clone()),
        }
    }

    // Phase 2: interactive resolution, strictly sequential. An interrupted
    // prompt aborts here, before anything is written.
    let resolver = Resolver::with_prompter(db.as_ref(), &opts.config, prompter);
    for key in &deferred {
        match resolver.find_bibcode(key).await? {
            Some(bibcode) => {
                println!("{}: {}", key, Outcome::New(bibcode.clone()));
                key_map.entry(bibcode.clone()).or_default().push(key.clone());
                to_retrieve.insert(bibcode);
            }
            None => {
                println!("{}: {}", key, Outcome::NotFound);
                not_found.insert(key.clone());
            }
        }
    }

    if !not_found.is_empty() {
        println!("{}", headerize("Please check the following keys"));
        for key in &not_found {
            println!("{}", key);
        }
    }

    let repeated: Vec<(&String, &Vec<String>)> =
        key_map.iter().filter(|(_, keys)| keys.len() > 1).collect();
    if !repeated.is_empty() {
        println!(
            "{}",
            headerize("The following keys refer to the same entry")
        );
        for (bibcode, keys) in repeated {
            println!(
                "{} has been referred as the following keys; please keep only one:\n{}\n",
                bibcode,
                keys.join(" ")
            );
        }
    }

    let mut base = base;
    let mut dirty = false;

    for key in &merged_keys {
        if let Some(entry) = other.get(key) {
            base.insert(entry.clone());
            dirty = true;
        }
    }

    if !to_retrieve.is_empty() {
        println!(
            "{}",
            headerize("Building new bibtex file, please wait...")
        );
        let bibcodes: Vec<String> = to_retrieve.into_iter().collect();
        let blob = db.export_bibtex(&bibcodes).await?;
        let retrieved = bib::parse(&blob)?;

        // The export service keys entries by bibcode; rewrite each key to
        // the first citation key that referred to it.
        let mut renamed = Bibliography::new();
        for mut entry in retrieved.into_vec() {
            if let Some(citing) = key_map.get(&entry.key) {
                entry.key = citing[0].clone();
            }
            renamed.insert(entry);
        }
        bib::merge(&mut base, renamed);
        dirty = true;
    }

    if dirty {
        bib::write(&output, &base, opts.config.backup)?;
    }

    println!("{}", headerize("Done!"));
    Ok(())
}
