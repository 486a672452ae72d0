//! Command-line entry point.

use clap::Parser;
use std::path::PathBuf;

use scitex::{driver, update, AdsClient, Config, Database, RunOptions, ScitexError};

#[derive(Parser)]
#[command(
    name = "scitex",
    version,
    about = "Find citation keys in TeX sources and build the BibTeX file from NASA ADS"
)]
struct Cli {
    /// TeX files to scan, or a single .bib file to refresh in place
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Output .bib file (default: the first \bibliography declaration)
    #[arg(short, long, value_name = "BIB")]
    output: Option<PathBuf>,

    /// Additional read-only .bib files to consult before querying ADS
    #[arg(short = 'r', long = "other", value_name = "BIB")]
    other: Vec<PathBuf>,

    /// Do not re-check entries that are already in the output file
    #[arg(long)]
    no_update: bool,

    /// Re-fetch every entry, even ones whose bibcode is unchanged
    #[arg(long)]
    force_regenerate: bool,

    /// Copy entries found in --other files into the output file
    #[arg(long)]
    merge_other: bool,

    /// Search the physics database in addition to astronomy
    #[arg(long)]
    include_physics: bool,

    /// Do not write a .bak copy before overwriting the output file
    #[arg(long)]
    no_backup: bool,

    /// Skip TLS certificate verification (asks for confirmation)
    #[arg(long)]
    disable_ssl_verification: bool,

    /// Triage keys concurrently instead of one at a time
    #[arg(short = 'P', long)]
    parallel: bool,

    /// Concurrent triage bound used with --parallel
    #[arg(long, value_name = "N", default_value_t = 8)]
    threads: usize,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            database: if self.include_physics {
                Database::AstronomyOrPhysics
            } else {
                Database::Astronomy
            },
            update: !self.no_update,
            force_regenerate: self.force_regenerate,
            merge_other: self.merge_other,
            backup: !self.no_backup,
            parallel: self.parallel,
            threads: self.threads,
        }
    }
}

fn build_client(cli: &Cli) -> Result<AdsClient, ScitexError> {
    let token = AdsClient::token_from_env()?;
    if !cli.disable_ssl_verification {
        return AdsClient::new(token);
    }

    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Disable TLS certificate verification for this run?")
        .default(false)
        .interact()
        .unwrap_or(false);
    if !confirmed {
        return Err(ScitexError::Usage(
            "TLS verification stays on without confirmation".to_string(),
        ));
    }
    AdsClient::new_without_ssl_verification(token)
}

async fn run(cli: Cli) -> i32 {
    let opts = RunOptions {
        files: cli.files.clone(),
        output: cli.output.clone(),
        other: cli.other.clone(),
        config: cli.config(),
    };

    let client = match build_client(&cli) {
        Ok(client) => client,
        Err(ScitexError::AuthRequired) => {
            eprintln!("Error: set ADS_API_TOKEN to your SciX API token");
            eprintln!("       (get one at https://ui.adsabs.harvard.edu/user/settings/token)");
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    tokio::select! {
        result = driver::run(client, opts) => match result {
            Ok(()) => {
                if let Some(version) = update::newer_version().await {
                    println!("scitex {} is available (this is {})", version, env!("CARGO_PKG_VERSION"));
                }
                0
            }
            Err(ScitexError::Usage(msg)) => {
                eprintln!("Error: {}", msg);
                2
            }
            Err(ScitexError::Interrupted) => {
                println!("\nInterrupted; nothing was written.");
                130
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted; nothing was written.");
            130
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli).await);
}
