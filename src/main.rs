//! Cellstore CLI - serve the HTTP API or drive the store from the command line

use cellstore::config::{self, Settings};
use cellstore::ingest::{self, Upload};
use cellstore::query::QueryEngine;
use cellstore::storage::{self, ConnectionPool};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "cellstore")]
#[command(version)]
#[command(about = "Spreadsheet ingestion service - category-keyed cell store with sum and search")]
#[command(long_about = r#"
Cellstore flattens uploaded workbooks into a cell table keyed by category and answers:
  • Typed sums over numeric cells
  • Case-insensitive region search over text cells

Example usage:
  cellstore create-category --name Sales --region EU --type retail
  cellstore upload --category Sales ./q1.xlsx
  cellstore sum --type retail
  cellstore serve --port 8000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides config and CELLSTORE_DATABASE)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to bind (overrides config and API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a default config file and create the database schema
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Create a category
    CreateCategory {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        region: String,

        /// Category type used by `sum`
        #[arg(short = 't', long = "type")]
        kind: String,
    },

    /// Ingest a workbook from disk into a category
    Upload {
        /// Category name
        #[arg(short = 'C', long)]
        category: String,

        /// Workbook to ingest
        path: PathBuf,
    },

    /// Sum all numeric cells of categories with the given type
    Sum {
        #[arg(short = 't', long = "type")]
        kind: String,
    },

    /// Find regions whose cells contain a search term
    Regions {
        #[arg(short, long)]
        term: String,
    },

    /// Show row totals
    Stats,
}

#[derive(Tabled)]
struct RegionRow {
    #[tabled(rename = "Region")]
    region: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        settings.database = database;
    }

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(settings.port);
            let pool = open_pool(&settings)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(cellstore::server::start_server(
                port,
                pool,
                settings.max_upload_bytes,
            ))?;
        }

        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            settings.save(&path, force)?;
            open_pool(&settings)?;
            println!("{} Wrote {}", "✓".green(), path.display());
            println!("{} Database ready at {}", "✓".green(), settings.database.display());
        }

        Commands::CreateCategory { name, region, kind } => {
            let pool = open_pool(&settings)?;
            let mut conn = pool.get()?;
            let category = ingest::create_category(&mut conn, &name, &region, &kind)?;
            println!(
                "{} Created category {} (id {}, region {}, type {})",
                "✓".green(),
                category.name.bold(),
                category.id,
                category.region,
                category.kind
            );
        }

        Commands::Upload { category, path } => {
            let contents = std::fs::read(&path)?;
            let upload = Upload {
                category_name: category,
                filename: path.file_name().map(|s| s.to_string_lossy().to_string()),
                content_type: Some(content_type_for(&path).to_string()),
                contents,
            };

            let pool = open_pool(&settings)?;
            let mut conn = pool.get()?;
            let report = ingest::ingest(&mut conn, &upload)?;

            println!("{} Ingested {}", "✓".green(), report.filename.bold());
            println!("   Sheets: {}", report.sheets.join(", "));
            println!("   Float values: {}", report.float_values);
            println!("   String values: {}", report.str_values);
            if report.other_values > 0 {
                println!(
                    "   {} {} boolean/date/error value(s) not stored",
                    "!".yellow(),
                    report.other_values
                );
            }
        }

        Commands::Sum { kind } => {
            let pool = open_pool(&settings)?;
            let conn = pool.get()?;
            let sum = QueryEngine::new(&conn).sum_by_type(&kind)?;
            println!("{}", sum);
        }

        Commands::Regions { term } => {
            if term.is_empty() {
                anyhow::bail!("search term must not be empty");
            }
            let pool = open_pool(&settings)?;
            let conn = pool.get()?;
            let regions = QueryEngine::new(&conn).find_regions(&term)?;

            if regions.is_empty() {
                println!("∅ No regions found.");
            } else {
                let rows: Vec<_> = regions.into_iter().map(|region| RegionRow { region }).collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Stats => {
            let pool = open_pool(&settings)?;
            let conn = pool.get()?;
            println!("📊 Cellstore Statistics ({:?})", settings.database);
            println!("------------------------------------");
            println!("{}", storage::stats(&conn)?);
        }
    }

    Ok(())
}

fn open_pool(settings: &Settings) -> anyhow::Result<ConnectionPool> {
    settings.prepare_database_dir()?;
    let pool = ConnectionPool::open(&settings.database, settings.pool_options())?;
    Ok(pool)
}

/// MIME type to report for a workbook on disk
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("xlsx") | Some("xlsm") => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
        Some("xls") => "application/vnd.ms-excel",
        _ => "application/octet-stream",
    }
}
