//! Report exporter CLI
//!
//! Writes one JSON report document per asset plus an index, for the
//! external page renderer.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use asset_mapper::config::OutputFormat;
use asset_mapper::{loader, report, MapperConfig, RuleTable};

#[derive(Parser)]
#[command(name = "asset-report-export")]
#[command(about = "Export per-asset report documents as JSON")]
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

    /// Output folder (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the generation timestamp, mostly for testing
    #[arg(long)]
    updated: Option<String>,

    /// Write compact JSON regardless of config
    #[arg(long)]
    compact: bool,
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

    let compact = cli.compact || config.output.format == OutputFormat::Compact;
    let output_dir = cli.output.unwrap_or_else(|| config.output.dir.clone());

    let inventory = loader::load_inventory(&paths).context("loading inventory")?;
    let validation = inventory.validate(&rules);
    let documents = report::build_reports(&inventory, &validation);

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    for doc in &documents {
        let path = output_dir.join(format!("{}.json", doc.report_stem));
        let json = if compact {
            serde_json::to_string(doc)?
        } else {
            serde_json::to_string_pretty(doc)?
        };
        fs::write(&path, json)?;
    }

    let generated_at = cli
        .updated
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
    let index = serde_json::json!({
        "title": inventory.title().or(config.inventory.title.as_deref()),
        "generated_at": generated_at,
        "snapshot": inventory.snapshot_hash(),
        "asset_count": inventory.len(),
        "archived_count": inventory.archived().len(),
        "invalid_count": validation.invalid_count(),
        "error_count": validation.error_count(),
        "warning_count": validation.warning_count(),
        "pages": documents.iter().map(|d| {
            serde_json::json!({
                "id": d.id,
                "page": format!("{}.json", d.report_stem),
                "valid": d.valid,
                "archived": d.archived,
            })
        }).collect::<Vec<_>>(),
    });
    let index_json = if compact {
        serde_json::to_string(&index)?
    } else {
        serde_json::to_string_pretty(&index)?
    };
    fs::write(output_dir.join("index.json"), index_json)?;

    println!(
        "Wrote {} report documents to {}",
        documents.len(),
        output_dir.display()
    );

    Ok(())
}
