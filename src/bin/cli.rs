#![cfg(not(tarpaulin_include))]

use clap::{Parser, Subcommand};
use shares_admin::downloader;
use shares_admin::importer::{ImportOutcome, Importer};
use shares_admin::loader::TabularFormat;
use shares_admin::store::{FileStore, persist_batch};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "shares-cli", about = "Check, import and template bulk share sheets")]
struct Cli {
    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a sheet without storing anything
    Check { file: PathBuf },
    /// Validate a sheet and store every share if the whole sheet is valid
    Import {
        file: PathBuf,
        #[arg(long, env = "SHARES_STORE", default_value = "database/shares.bin.gz")]
        store: PathBuf,
    },
    /// Write the upload template, format taken from the extension
    Template { out: PathBuf },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Check { file } => {
            let outcome = Importer::new().import_file(&file)?;
            Ok(report(&outcome, cli.json)?)
        }
        Command::Import { file, store } => {
            let outcome = Importer::new().import_file(&file)?;
            let ImportOutcome::Accepted(records) = &outcome else {
                return Ok(report(&outcome, cli.json)?);
            };

            let mut store = FileStore::open(&store)?;
            let result = persist_batch(&mut store, records);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Stored {} shares in {}", result.succeeded, store.path().display());
                for (name, reason) in &result.failed {
                    println!("  not stored: {} ({})", name, reason);
                }
            }
            Ok(if result.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Template { out } => {
            let format = TabularFormat::from_path(&out)?;
            std::fs::write(&out, downloader::template(format)?)?;
            println!("Template written to {}", out.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn report(outcome: &ImportOutcome, json: bool) -> Result<ExitCode, serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        match outcome {
            ImportOutcome::Accepted(records) => {
                println!("✓ {} shares are valid", records.len());
            }
            ImportOutcome::Rejected(errors) => {
                println!("✗ sheet rejected with {} errors:", errors.len());
                for error in errors {
                    println!("  {}", error);
                }
            }
        }
    }

    Ok(if outcome.is_accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
