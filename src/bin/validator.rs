//! Inventory validator CLI
//!
//! Loads the inventory, validates every asset, and prints per-asset
//! issues. Load errors (duplicate ids) abort the run; data-quality issues
//! never do.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use asset_mapper::{loader, MapperConfig, RuleTable};

#[derive(Parser)]
#[command(name = "asset-validator")]
#[command(about = "Validate an asset inventory against its dependency rules")]
struct Cli {
    /// Asset .yaml files or directories (overrides config)
    #[arg(short, long)]
    assets: Vec<PathBuf>,

    /// TOML rule table replacing the builtin policy
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Config file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate all assets and print their issues
    Check {
        /// Exit non-zero when any asset is invalid
        #[arg(long)]
        strict: bool,
    },

    /// Write a JSON validation summary
    Report {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the generation timestamp, mostly for testing
        #[arg(long)]
        updated: Option<String>,
    },

    /// Fuzzy-find an asset by name or id
    Find {
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MapperConfig::load_from(cli.config.as_deref())
        .context("loading configuration")?;

    let paths = if cli.assets.is_empty() {
        config.inventory.paths.clone()
    } else {
        cli.assets.clone()
    };

    let rules = match &cli.rules {
        Some(path) => RuleTable::from_path(path)?,
        None => config.rules.load_table()?,
    };

    let inventory = loader::load_inventory(&paths)
        .context("loading inventory")?;
    let report = inventory.validate(&rules);

    match cli.command {
        Commands::Check { strict } => {
            for result in report.iter() {
                if result.errors.is_empty() && result.warnings.is_empty() {
                    continue;
                }
                let asset = inventory
                    .get(&result.asset_id)
                    .expect("validated assets are indexed");
                println!(
                    "\nASSET: {} '{}'\n       in {}",
                    asset.id,
                    asset.display_label(),
                    asset.source.file.display()
                );
                for error in &result.errors {
                    println!("    ERROR: {}", error);
                }
                for warning in &result.warnings {
                    println!("    WARNING: {}", warning);
                }
            }

            println!(
                "\n{} assets ({} archived), {} invalid, {} errors, {} warnings",
                inventory.len(),
                inventory.archived().len(),
                report.invalid_count(),
                report.error_count(),
                report.warning_count()
            );

            if strict && !report.is_all_valid() {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Report { output, updated } => {
            let generated_at =
                updated.unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

            let assets: Vec<_> = report
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.asset_id,
                        "valid": r.is_valid(),
                        "errors": r.errors.iter().map(ToString::to_string)
                            .collect::<Vec<_>>(),
                        "warnings": r.warnings.iter().map(ToString::to_string)
                            .collect::<Vec<_>>(),
                    })
                })
                .collect();

            let summary = serde_json::json!({
                "generated_at": generated_at,
                "title": inventory.title(),
                "snapshot": inventory.snapshot_hash(),
                "asset_count": inventory.len(),
                "archived_count": inventory.archived().len(),
                "invalid_count": report.invalid_count(),
                "error_count": report.error_count(),
                "warning_count": report.warning_count(),
                "assets": assets,
            });

            let json = serde_json::to_string_pretty(&summary)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &json)?;
                    println!("Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }

        Commands::Find { query, limit } => {
            let hits = inventory.search(&query, limit);
            if hits.is_empty() {
                println!("No assets matching '{}'", query);
                return Ok(());
            }
            for hit in hits {
                let asset = inventory
                    .get(&hit.id)
                    .expect("search results come from the index");
                println!(
                    "{}  [{}]  {}",
                    hit.id,
                    hit.kind,
                    hit.name.as_deref().unwrap_or("-")
                );
                println!("    defined in {}", hit.file.display());
                println!("    edit: {}", asset.source.edit_url());
            }
            Ok(())
        }
    }
}
