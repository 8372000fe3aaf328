use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use listing_harvest::capacity::{CapacityFilter, rank_by_price_per_tb};
use listing_harvest::config::Config;
use listing_harvest::data_models::{DEFAULT_MAX_PAGES, PageCountPolicy, SearchQuery, SortMode};
use listing_harvest::fetcher::PageFetcher;
use listing_harvest::paginator::SearchPaginator;

#[derive(Parser, Debug)]
#[command(about = "Collect listing previews from marketplace search pages")]
struct Args {
    /// Search keywords
    query: String,

    /// Upper bound on pages fetched, page 1 included
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,

    /// Category id, 0 for all categories
    #[arg(long, default_value_t = 0)]
    category: u32,

    #[arg(long, default_value_t = 240)]
    items_per_page: u32,

    #[arg(long, value_enum, default_value_t = SortMode::NewlyListed)]
    sort: SortMode,

    /// discover: advertised page count capped by --max-pages; caller_cap: always --max-pages
    #[arg(long, value_enum, default_value_t = PageCountPolicy::Discover)]
    page_count: PageCountPolicy,

    /// Include auctions, not just fixed-price listings
    #[arg(long)]
    all_formats: bool,

    /// Rank storage listings by price per terabyte instead of dumping raw previews
    #[arg(long)]
    per_tb: bool,

    /// Write JSON here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    // Bridge log crate -> tracing (so log::info! etc. work)
    tracing_log::LogTracer::init()?;

    let config = Config::from_env();
    let fetcher = PageFetcher::new(&config.fetcher).context("failed to build http client")?;
    let paginator = SearchPaginator::new(fetcher, &config.search_base_url)?
        .with_max_concurrency(config.max_concurrency);

    let query = SearchQuery::new(args.query)
        .with_max_pages(args.max_pages)
        .with_category(args.category)
        .with_items_per_page(args.items_per_page)
        .with_sort(args.sort)
        .with_page_count(args.page_count)
        .with_buy_it_now_only(!args.all_formats);

    let report = paginator
        .run_with_report(&query)
        .await
        .context("search failed")?;

    for failure in &report.failures {
        eprintln!("page {} failed: {}", failure.page, failure.reason);
    }

    let json = if args.per_tb {
        let offers = rank_by_price_per_tb(&report.listings, &CapacityFilter::default());
        serde_json::to_string_pretty(&offers)?
    } else {
        serde_json::to_string_pretty(&report.listings)?
    };

    match args.output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            log::info!(
                "wrote {} listings to {}",
                report.listings.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
