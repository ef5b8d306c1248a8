mod analysis;
mod config;
mod dates;
mod models;
mod pipeline;
mod report;
mod scraper;
mod storage;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::storage::DayStore;

#[derive(Parser)]
#[command(name = "krx-theme-etl", about = "KRX/Naver theme market-data ETL", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Trading day override (YYYYMMDD); defaults to the last trading day
    /// (weekends roll back to Friday).
    #[arg(short, long, global = true)]
    date: Option<String>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Download the KRX full-market end-of-day price list
    Snapshot,

    /// Scrape the Naver theme index pages
    Themes,

    /// Scrape each theme's member table (needs `themes` first)
    Members,

    /// Scrape the Naver market-cap listing (KOSPI + KOSDAQ)
    MarketCap,

    /// Classify, pivot and summarize the day's stored tables
    Analyze,

    /// Fetch headlines for every security in the analysis report
    News,

    /// Emit chart image links for the analysis report
    ChartLinks,

    /// The whole daily batch: snapshot → themes → members → market-cap → analyze
    Run,

    /// Show which of the day's artifacts exist
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "krx_theme_etl=info,warn",
        1 => "krx_theme_etl=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    let date = match &cli.date {
        Some(d) => {
            if dates::parse_date_str(d).is_none() {
                anyhow::bail!("--date must be YYYYMMDD, got '{}'", d);
            }
            d.clone()
        }
        None => dates::last_trading_day_str(),
    };

    let store = DayStore::open(&config.storage.data_dir, &date)?;
    let pipe = Pipeline::new(config);

    match cli.command {
        Command::Snapshot => {
            let _t = utils::Timer::start("KRX snapshot");
            let n = pipe.snapshot_step(&store).await?;
            info!("Done: {} securities stored", n);
        }

        Command::Themes => {
            let _t = utils::Timer::start("Theme index scrape");
            let n = pipe.theme_step(&store).await?;
            info!("Done: {} themes stored", n);
        }

        Command::Members => {
            let _t = utils::Timer::start("Theme member scrape");
            let n = pipe.members_step(&store).await?;
            info!("Done: {} membership edges stored", n);
        }

        Command::MarketCap => {
            let _t = utils::Timer::start("Market-cap scrape");
            let n = pipe.market_cap_step(&store).await?;
            info!("Done: {} listing rows stored", n);
        }

        Command::Analyze => {
            let _t = utils::Timer::start("Analysis");
            let n = pipe.analyze_step(&store)?;
            info!("Done: {} securities selected", n);
        }

        Command::News => {
            let _t = utils::Timer::start("News fetch");
            let n = pipe.news_step(&store).await?;
            info!("Done: {} headlines stored", n);
        }

        Command::ChartLinks => {
            let _t = utils::Timer::start("Chart links");
            let n = pipe.chart_links_step(&store)?;
            info!("Done: {} chart rows stored", n);
        }

        Command::Run => {
            let _t = utils::Timer::start("Daily batch");
            let stats = pipe.run(&store).await?;
            info!(
                "Done: {} securities, {} themes, {} edges, {} selected",
                stats.securities, stats.themes, stats.membership_edges, stats.selected
            );
        }

        Command::Status => {
            println!("─────────────────────────────────────────────");
            println!("  krx-theme-etl — artifacts for {}", store.date());
            println!("  dir: {}", store.dir().display());
            println!("─────────────────────────────────────────────");
            for (name, exists) in store.status() {
                println!("  [{}] {}", if exists { "✓" } else { " " }, name);
            }
            println!("─────────────────────────────────────────────");
        }
    }

    Ok(())
}
