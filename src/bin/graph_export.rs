//! Map exporter CLI
//!
//! Assembles the annotated dependency graph and writes GraphViz DOT, or
//! SVG via the external `dot` tool.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use asset_mapper::{loader, AssetGraph, MapperConfig, RuleTable, Theme};

#[derive(Parser)]
#[command(name = "asset-graph-export")]
#[command(about = "Export the asset dependency map to DOT/SVG")]
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

    /// Output file (defaults to assets.dot / assets.svg)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: dot or svg
    #[arg(short, long, default_value = "dot")]
    format: String,

    /// Color theme, "light" or "dark" (overrides config)
    #[arg(short, long)]
    theme: Option<String>,

    /// Trim the map to assets supporting assets of this type (regex)
    #[arg(long, value_name = "TYPE")]
    leaf_type: Option<String>,

    /// Trim to assets NOT leading to --leaf-type instead
    #[arg(long)]
    leaf_negate: bool,
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

    let theme_name = cli.theme.unwrap_or_else(|| config.output.theme.clone());
    let theme = Theme::by_name(&theme_name)
        .with_context(|| format!("unknown theme '{}'", theme_name))?;

    let inventory = loader::load_inventory(&paths).context("loading inventory")?;
    let report = inventory.validate(&rules);
    let graph = AssetGraph::build(&inventory, &report, &rules);

    println!(
        "Graph assembled: {} assets, {} dependency edges, {} invalid",
        graph.node_count(),
        graph.edge_count(),
        report.invalid_count()
    );

    let subset = match &cli.leaf_type {
        Some(pattern) => {
            let keep = graph.leads_to(pattern, cli.leaf_negate)?;
            println!("Showing {} of {} assets", keep.len(), graph.node_count());
            Some(keep)
        }
        None => None,
    };

    let dot_content = graph.to_dot_subset(&theme, subset.as_ref());

    match cli.format.as_str() {
        "dot" => {
            let output_path =
                cli.output.unwrap_or_else(|| PathBuf::from("assets.dot"));
            std::fs::write(&output_path, &dot_content)?;
            println!("Exported DOT to {}", output_path.display());
        }
        "svg" => {
            let output_path =
                cli.output.unwrap_or_else(|| PathBuf::from("assets.svg"));

            // write DOT to a temp file, then let graphviz lay it out
            let temp_dot = output_path.with_extension("temp.dot");
            std::fs::write(&temp_dot, &dot_content)?;

            let output = std::process::Command::new("dot")
                .arg("-Tsvg")
                .arg(&temp_dot)
                .arg("-o")
                .arg(&output_path)
                .output()
                .context("running graphviz 'dot'")?;

            let _ = std::fs::remove_file(&temp_dot);

            if output.status.success() {
                println!("Exported SVG to {}", output_path.display());
            } else {
                eprintln!("GraphViz conversion failed:");
                eprintln!("{}", String::from_utf8_lossy(&output.stderr));
                std::process::exit(1);
            }
        }
        other => {
            eprintln!("Invalid format '{}'. Use 'dot' or 'svg'", other);
            std::process::exit(1);
        }
    }

    Ok(())
}
