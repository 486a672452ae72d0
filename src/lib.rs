//! # scitex
//!
//! Build and maintain a BibTeX file from the citation keys in a TeX
//! document, with records fetched from the SciX (NASA ADS) API.
//!
//! Keys that are themselves identifiers (bibcode, arXiv id, DOI) resolve
//! directly; author+year keys like `Riess98` go through a search with
//! interactive disambiguation. Entries already in the output file are
//! re-checked so a preprint picks up its published record on the next run.
//!
//! The `scitex` binary is the main consumer, but the pieces are usable as
//! a library:
//!
//! ```no_run
//! use scitex::{driver, AdsClient, Config, RunOptions};
//!
//! # async fn example() -> scitex::Result<()> {
//! let client = AdsClient::new(AdsClient::token_from_env()?)?;
//! let opts = RunOptions {
//!     files: vec!["paper.tex".into()],
//!     output: None,
//!     other: Vec::new(),
//!     config: Config::default(),
//! };
//! driver::run(client, opts).await?;
//! # Ok(())
//! # }
//! ```

pub mod bib;
pub mod client;
pub mod driver;
pub mod error;
pub mod ident;
pub mod parse;
pub mod rate_limit;
pub mod reconcile;
pub mod resolve;
pub mod search;
pub mod tex;
pub mod types;
pub mod update;

pub use client::AdsClient;
pub use driver::RunOptions;
pub use error::{Result, ScitexError};
pub use resolve::{Prompter, TerminalPrompter};
pub use search::Literature;
pub use types::{Config, Database, Outcome};
