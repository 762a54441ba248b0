use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use zotsieve_core::ingest::read_source_items;
use zotsieve_core::{
    Classification, Creator, DateValue, MatchReport, Matcher, RawMetadata, Sieve, SieveConfig,
    SieveSummary, novel_items,
};
use zotsieve_zotero::ZoteroSearchProvider;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "zotsieve",
    about = "Drop bibliographic records that already exist in a Zotero library",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting ZOTSIEVE_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (same as RUST_LOG=zotsieve=debug).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sieve a JSON file of source items and emit the ones not in the library.
    Check {
        /// JSON array (or single object) of source records.
        input: PathBuf,
        /// Write novel items here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Items matched at once; overrides `matching.concurrency`.
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Look up a single record in the library.
    Lookup {
        #[arg(long)]
        title: String,
        #[arg(long)]
        doi: Option<String>,
        #[arg(long)]
        issn: Option<String>,
        /// Publication date; a bare number is treated as a year.
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        item_type: Option<String>,
        /// Creator as "Family, Given" or "Family"; repeatable.
        #[arg(long, action = clap::ArgAction::Append)]
        author: Vec<String>,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the config file location.
    Path,
    /// Write the default configuration to the config file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let json_output = cli.json || std::env::var("ZOTSIEVE_JSON").as_deref() == Ok("1");
    let config_path = cli.config.clone().unwrap_or_else(SieveConfig::config_path);

    match cli.command {
        Commands::Check {
            input,
            output,
            concurrency,
        } => {
            let config = load_config(&config_path)?;
            let items = read_source_items(&input)
                .with_context(|| format!("reading source items from {}", input.display()))?;
            info!(count = items.len(), input = %input.display(), "loaded source items");

            let sieve = Sieve::new(
                build_matcher(&config)?,
                concurrency.unwrap_or(config.matching.concurrency),
            );
            let results = sieve.classify_all(items).await;
            let summary = SieveSummary::from_classifications(&results);
            let novel = Value::Array(novel_items(&results));
            let dur = start.elapsed().as_millis() as u64;

            if let Some(path) = &output {
                write_json(path, &novel)?;
            }

            if json_output {
                let per_item: Vec<Value> = results.iter().map(classification_json).collect();
                print_json(&json!({
                    "status": "ok",
                    "data": {"summary": summary, "items": per_item},
                    "meta": {"duration_ms": dur}
                }))?;
            } else {
                if output.is_none() {
                    print_json(&novel)?;
                }
                eprintln!(
                    "{} items: {} already in library, {} new ({} with failed searches), {} skipped",
                    summary.total,
                    summary.duplicates,
                    summary.novel,
                    summary.novel_with_failures,
                    summary.skipped
                );
            }
        }

        Commands::Lookup {
            title,
            doi,
            issn,
            date,
            item_type,
            author,
        } => {
            let config = load_config(&config_path)?;
            let target = lookup_target(title, doi, issn, date, item_type, &author);
            let matcher = build_matcher(&config)?;
            let report = matcher.adaptive_match(&target.title, &target).await;
            let dur = start.elapsed().as_millis() as u64;

            if json_output {
                print_json(&json!({
                    "status": "ok",
                    "data": report_json(&report),
                    "meta": {"duration_ms": dur}
                }))?;
            } else if report.is_duplicate() {
                for m in &report.matches {
                    println!(
                        "{:<10} score {:>3}  sim {:.3}  {}",
                        m.source_key.as_deref().unwrap_or("-"),
                        m.score,
                        m.similarity,
                        m.title
                    );
                }
            } else {
                println!("No match in library.");
                for f in &report.failures {
                    eprintln!("  search failed for {:?}: {}", f.query, f.reason);
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(&config_path)?;
                if json_output {
                    print_json(&json!({"status": "ok", "data": config_json(&config)?}))?;
                } else {
                    print!("{}", toml_string(&config)?);
                }
            }
            ConfigAction::Path => {
                if json_output {
                    print_json(&json!({"status": "ok", "data": {"path": config_path}}))?;
                } else {
                    println!("{}", config_path.display());
                }
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    eprintln!(
                        "Config already exists at {}. Use --force to overwrite.",
                        config_path.display()
                    );
                    std::process::exit(1);
                }
                SieveConfig::default()
                    .save_to(&config_path)
                    .with_context(|| format!("writing {}", config_path.display()))?;
                println!("Wrote {}", config_path.display());
            }
        },
    }

    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "zotsieve=debug" } else { "zotsieve=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<SieveConfig> {
    SieveConfig::load_from(path).with_context(|| format!("loading config {}", path.display()))
}

fn build_matcher(config: &SieveConfig) -> Result<Matcher<ZoteroSearchProvider>> {
    let provider = ZoteroSearchProvider::from_config(&config.zotero)
        .context("configuring the Zotero provider")?;
    Ok(Matcher::new(provider, config.matching.settings()))
}

fn lookup_target(
    title: String,
    doi: Option<String>,
    issn: Option<String>,
    date: Option<String>,
    item_type: Option<String>,
    authors: &[String],
) -> RawMetadata {
    RawMetadata {
        doi,
        issn,
        date: date.map(|d| match d.trim().parse::<i64>() {
            Ok(year) => DateValue::Year(year),
            Err(_) => DateValue::Text(d),
        }),
        item_type,
        creators: authors.iter().map(|a| parse_author(a)).collect(),
        ..RawMetadata::new(title)
    }
}

/// "Family, Given" or "Family".
fn parse_author(raw: &str) -> Creator {
    let (family, given) = match raw.split_once(',') {
        Some((family, given)) => (family.trim(), Some(given.trim())),
        None => (raw.trim(), None),
    };
    Creator {
        given: given.filter(|g| !g.is_empty()).map(str::to_string),
        ..Creator::with_family(family)
    }
}

fn report_json(report: &MatchReport) -> Value {
    json!({
        "duplicate": report.is_duplicate(),
        "matches": report.matches,
        "failures": report
            .failures
            .iter()
            .map(|f| json!({"query": f.query, "reason": f.reason}))
            .collect::<Vec<_>>(),
        "candidates_seen": report.candidates_seen,
    })
}

fn classification_json(c: &Classification) -> Value {
    let mut val = json!({
        "title": c.item.metadata.title,
        "best_match": c.report.best(),
        "failed_searches": c.report.failures.len(),
    });
    // Verdict serializes as {"verdict": ..., "reason": ...}; merge it in.
    if let (Some(obj), Ok(Value::Object(verdict))) = (val.as_object_mut(), serde_json::to_value(c.verdict)) {
        obj.extend(verdict);
    }
    val
}

fn config_json(config: &SieveConfig) -> Result<Value> {
    Ok(serde_json::to_value(config)?)
}

fn toml_string(config: &SieveConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

fn write_json(path: &Path, val: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(val)?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn print_json(val: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
