use anyhow::Context;
use clap::{Parser, ValueEnum};
use houses_board::filters::{active_filter_count, chips, encode_query};
use houses_board::query::{HttpSource, MemorySource, PropertySource};
use houses_board::sync::{AddressBar, FilePreferenceStore, FilterSynchronizer, MemoryAddressBar};
use houses_board::view::{PropertyListView, TracingNotifier, ViewMode};
use houses_board::{Config, QueryExecutor};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "houses-board", about = "Browse the property list with URL-style filters")]
struct Args {
    /// Query string to start from, e.g. "status=PUBLISHED&minRooms=3"
    query: Option<String>,

    /// Page to show
    #[arg(long)]
    page: Option<u32>,

    /// Free-text search on the property name
    #[arg(long)]
    search: Option<String>,

    /// Layout of the result set
    #[arg(long, value_enum, default_value_t = Layout::Table)]
    view: Layout,

    /// Forget saved filters and start from the defaults
    #[arg(long)]
    clear: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Layout {
    Table,
    Grid,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    let source: Arc<dyn PropertySource> = match (&config.api_url, &config.data_path) {
        (Some(url), _) => Arc::new(HttpSource::new(url)?),
        (None, Some(path)) => Arc::new(MemorySource::from_json_file(path)?),
        (None, None) => anyhow::bail!("Set HOUSES_API_URL or HOUSES_DATA_PATH"),
    };
    info!("Using {} property source", source.source_name());

    let address_bar = Arc::new(MemoryAddressBar::with_query(args.query.as_deref().unwrap_or("")));
    let preferences = Arc::new(FilePreferenceStore::new(config.prefs_path.clone()));
    let sync = FilterSynchronizer::restore(address_bar.clone(), preferences, config.search_debounce);
    let executor = QueryExecutor::new(source, config.page_size, config.stale_after);

    let mut view = PropertyListView::new(sync, executor, Arc::new(TracingNotifier))
        .with_virtualize_threshold(config.virtualize_threshold);
    view.set_view_mode(match args.view {
        Layout::Table => ViewMode::Table,
        Layout::Grid => ViewMode::Grid,
    });

    view.open().await;

    if args.clear {
        view.clear_all();
    }
    if let Some(search) = &args.search {
        if view.synchronizer().filters().search != *search {
            view.set_search_input(search.clone());
            view.wait_for_change().await;
        }
    }
    if let Some(page) = args.page {
        view.set_page(page);
    }
    view.settle().await;

    let filters = view.synchronizer().filters();
    let page = view.synchronizer().page();
    let active = chips(&filters);
    if !active.is_empty() {
        let labels: Vec<String> = active.iter().map(|chip| chip.to_string()).collect();
        println!("Filters ({}): {}", active_filter_count(&filters), labels.join(" · "));
    }

    for line in view.render() {
        println!("{}", line);
    }

    if let Some(result) = view.result() {
        println!();
        println!(
            "Page {} of {} ({} properties)",
            page,
            result.total_pages.max(1),
            result.total
        );
    }
    println!("?{}", encode_query(&filters, page));
    info!("Address bar: ?{}", address_bar.query());

    Ok(())
}
