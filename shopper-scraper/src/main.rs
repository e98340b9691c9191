use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use shopper_core::cache::{InMemoryCache, ResultCache};
use tracing::{info, warn};

use shopper_scraper::apis::factory::create_all_adapters;
use shopper_scraper::common::constants::ALL_SITES;
use shopper_scraper::config::ScraperConfig;
use shopper_scraper::observability::logging::init_logging;
use shopper_scraper::{Aggregator, SearchOptions};

#[derive(Parser)]
#[command(name = "shopper-scraper")]
#[command(about = "Multi-source price scraper and offer reconciliation for SmartShopper")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate offers for a query across all sites and print them as JSON
    Search {
        /// Product query, e.g. "iphone 15 pro"
        query: String,
        /// Drop products priced below this floor (base currency)
        #[arg(long)]
        min_price: Option<f64>,
        /// Drop products priced above this ceiling (base currency)
        #[arg(long)]
        max_price: Option<f64>,
        /// Comma-separated site ids to restrict the fan-out to
        #[arg(long, value_delimiter = ',')]
        platforms: Option<Vec<String>>,
        /// Override the overall aggregation deadline, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// List the registered site adapters
    Sites,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    init_logging();

    match cli.command {
        Commands::Search {
            query,
            min_price,
            max_price,
            platforms,
            timeout_secs,
        } => {
            let config = match ScraperConfig::load(&cli.config) {
                Ok(config) => config,
                Err(err) => {
                    warn!("Config '{}' not usable ({}), using defaults", cli.config, err);
                    ScraperConfig::default()
                }
            };

            let adapters = create_all_adapters(&config);
            let cache: Arc<dyn ResultCache> = Arc::new(InMemoryCache::new());
            let aggregator = Aggregator::new(adapters, cache, &config);

            let options = SearchOptions {
                min_price,
                max_price,
                platforms,
                timeout: timeout_secs.map(Duration::from_secs),
            };

            info!("Aggregating offers for '{}'", query);
            let products = aggregator.aggregate(&query, &options).await?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        Commands::Sites => {
            for site in ALL_SITES {
                println!("{site}");
            }
        }
    }

    Ok(())
}
