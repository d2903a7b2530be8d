use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tidescan_common::{Config, DateRange, ScanRequest, SourceScope};
use tidescan_scanner::export::write_csv;
use tidescan_scanner::{ScanSession, Scanner};

#[derive(Parser)]
#[command(name = "tidescan", about = "Market-intelligence scanner for water-utility procurement")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Web,
    News,
    Custom,
}

impl From<ScopeArg> for SourceScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Web => SourceScope::Web,
            ScopeArg::News => SourceScope::News,
            ScopeArg::Custom => SourceScope::Custom,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run one market scan and print the stored insights.
    Scan {
        /// Search keyword; repeat for several.
        #[arg(long = "keyword", required = true)]
        keywords: Vec<String>,

        /// Industry sector context, e.g. "Water".
        #[arg(long)]
        sector: Option<String>,

        /// Market category; repeat for several.
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Supplier of interest; repeat for several.
        #[arg(long = "supplier")]
        suppliers: Vec<String>,

        /// Geographic focus; repeat for several. Defaults to UK.
        #[arg(long = "geo")]
        geographic_scope: Vec<String>,

        #[arg(long, value_enum, default_value = "web")]
        scope: ScopeArg,

        /// Start of the date range, YYYY-MM-DD. End defaults to today.
        #[arg(long)]
        from: Option<String>,

        /// End of the date range, YYYY-MM-DD.
        #[arg(long)]
        to: Option<String>,

        #[arg(long, default_value_t = 10)]
        max_results: usize,

        /// Write the insights to this CSV file as well.
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tidescan=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    match cli.command {
        Command::Scan {
            keywords,
            sector,
            categories,
            suppliers,
            geographic_scope,
            scope,
            from,
            to,
            max_results,
            export,
        } => {
            let mut request = ScanRequest::new(keywords)
                .with_scope(scope.into())
                .with_categories(categories)
                .with_suppliers(suppliers)
                .with_max_results(max_results);
            if let Some(sector) = sector {
                request = request.with_sector(sector);
            }
            if !geographic_scope.is_empty() {
                request = request.with_geographic_scope(geographic_scope);
            }
            if let Some(from) = from {
                let start = parse_date(&from)?;
                let end = match to {
                    Some(to) => parse_date(&to)?,
                    None => Utc::now().date_naive(),
                };
                request = request.with_date_range(DateRange { start, end });
            }

            let session = ScanSession::new(config);
            let scanner = Scanner::from_config(session.config())?;

            let stats = match scanner.run(&session, &request).await {
                Ok(stats) => stats,
                Err(err) => {
                    if err.is_retryable() {
                        warn!("Scan failed with a transient error; re-running it may succeed");
                    }
                    return Err(err.into());
                }
            };
            println!("{stats}");

            let store = session.store();
            for insight in store.list() {
                println!(
                    "[{}] {} ({}, relevance {:.2})",
                    insight.impact_level, insight.title, insight.category,
                    insight.relevance_score
                );
                println!("    {}", insight.summary);
                for url in &insight.source_urls {
                    println!("    source: {url}");
                }
            }

            if let Some(path) = export {
                let mut file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_csv(store.list(), &mut file)?;
                info!(path = %path.display(), insights = store.len(), "Exported CSV");
            }
        }
    }

    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}
