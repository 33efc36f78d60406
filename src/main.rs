use accelerator_insights::logging::init_logging;
use accelerator_insights::{
    Aggregation, FactCache, FactTableKind, FactTables, Filters, GroupShare, PipelineConfig, SourceSnapshot,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "accelerator-insights")]
#[command(about = "Founder, startup and deal analytics for an accelerator program")]
#[command(version)]
struct Cli {
    /// Founders CSV
    #[arg(long, global = true, default_value = "data/founders.csv")]
    founders: PathBuf,

    /// Startups CSV
    #[arg(long, global = true, default_value = "data/startups.csv")]
    startups: PathBuf,

    /// Deals CSV
    #[arg(long, global = true, default_value = "data/deals.csv")]
    deals: PathBuf,

    /// JSON file with taxonomies and cohort cadence (defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Row counts per fact table and load warnings
    Summary,
    /// Count rows per group-by combination
    Aggregate {
        #[arg(long, default_value = "founder-startup")]
        table: FactTableKind,
        /// Dimensions to group by, in order (comma-separated or repeated)
        #[arg(long, required = true, value_delimiter = ',')]
        group_by: Vec<String>,
        /// DIMENSION=VALUE; a value of "All" does nothing
        #[arg(long, value_parser = parse_filter)]
        filter: Vec<(String, String)>,
        /// Report percentages within these grouped dimensions
        #[arg(long, value_delimiter = ',')]
        share_base: Option<Vec<String>>,
        #[arg(long)]
        json: bool,
    },
    /// Standing dashboard views
    View {
        #[arg(value_enum)]
        name: ViewName,
        #[arg(long, value_parser = parse_filter)]
        filter: Vec<(String, String)>,
        #[arg(long)]
        json: bool,
    },
    /// Values available for a filter dropdown
    Options {
        #[arg(long, default_value = "founder-startup")]
        table: FactTableKind,
        #[arg(long)]
        dimension: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewName {
    FacultyDistribution,
    IndustryTrend,
    GenderByStatus,
}

fn parse_filter(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(dimension, value)| (dimension.trim().to_string(), value.trim().to_string()))
        .ok_or_else(|| format!("expected DIMENSION=VALUE, got '{}'", raw))
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let cache = FactCache::from_config(config)?;

    let snapshot = SourceSnapshot::load(&cli.founders, &cli.startups, &cli.deals)
        .context("Failed to load source snapshot")?;
    let tables = cache.get_or_compute(&snapshot);
    info!(snapshot = %snapshot.id.short(), "ready");

    match cli.command {
        Commands::Summary => print_summary(&snapshot, &tables),
        Commands::Aggregate {
            table,
            group_by,
            filter,
            share_base,
            json,
        } => {
            let group_by: Vec<&str> = group_by.iter().map(String::as_str).collect();
            let filters: Filters = filter.into_iter().collect();
            let aggregation = tables.aggregate(table, &group_by, &filters)?;

            match share_base {
                Some(base) => {
                    let base: Vec<&str> = base.iter().map(String::as_str).collect();
                    let shares = aggregation.shares(&base)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&shares)?);
                    } else {
                        print_shares(&aggregation.dimensions, &shares);
                    }
                }
                None if json => println!("{}", serde_json::to_string_pretty(&aggregation)?),
                None => print_aggregation(&aggregation),
            }
        }
        Commands::View { name, filter, json } => {
            let filters: Filters = filter.into_iter().collect();
            match name {
                ViewName::GenderByStatus => {
                    let shares = tables.gender_by_status(&filters)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&shares)?);
                    } else {
                        print_shares(&["Status".to_string(), "Gender".to_string()], &shares);
                    }
                }
                ViewName::FacultyDistribution | ViewName::IndustryTrend => {
                    let aggregation = match name {
                        ViewName::FacultyDistribution => tables.faculty_distribution(&filters)?,
                        _ => tables.industry_trend(&filters)?,
                    };
                    if json {
                        println!("{}", serde_json::to_string_pretty(&aggregation)?);
                    } else {
                        print_aggregation(&aggregation);
                    }
                }
            }
        }
        Commands::Options { table, dimension } => {
            for value in tables.filter_options(table, &dimension)? {
                println!("{}", value);
            }
        }
    }

    Ok(())
}

fn print_summary(snapshot: &SourceSnapshot, tables: &Arc<FactTables>) {
    println!("📂 Snapshot {} (loaded {})", snapshot.id.short(), snapshot.loaded_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   Founders: {}", tables.founders.len());
    println!("   Startups: {} ({} industry rows)", tables.startups.len(), tables.startup_industries.len());
    println!("   Deals:    {}", tables.deals.len());
    println!();
    for table in [FactTableKind::FounderStartup, FactTableKind::StartupDeal, FactTableKind::Full] {
        println!("   {:<16} {} rows", table.as_str(), tables.row_count(table));
    }

    if tables.warnings.is_empty() {
        println!("\n✅ No load warnings");
    } else {
        println!("\n⚠️  {} load warnings:", tables.warnings.len());
        for warning in &tables.warnings {
            println!("   {}", warning);
        }
    }
}

fn print_aggregation(aggregation: &Aggregation) {
    println!("{} | Count", aggregation.dimensions.join(" | "));
    for group in &aggregation.groups {
        println!("{} | {}", group.key.join(" | "), group.count);
    }
    println!("Total: {}", aggregation.total());
}

fn print_shares(dimensions: &[String], shares: &[GroupShare]) {
    println!("{} | Count | %", dimensions.join(" | "));
    for share in shares {
        println!("{} | {} | {:.1}%", share.key.join(" | "), share.count, share.percentage);
    }
}
