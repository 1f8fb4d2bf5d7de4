//! catalogdb CLI
//!
//! Loads the catalog snapshot and vector index named in `config.toml` and
//! runs one discovery operation. Results go to stdout as JSON, logs to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catalogdb_core::config::{Config, Settings};
use catalogdb_core::seed::load_seed_path;
use catalogdb_core::traits::VectorIndex;
use catalogdb_core::types::{NewOrder, OrderFilter, OrderLine, OrderStatus, SearchRequest};
use catalogdb_discovery::{CatalogService, Discovery, OrderService};
use catalogdb_embed::{get_default_embedder, UrlImageFetcher};
use catalogdb_store::JsonCatalog;
use catalogdb_vector::{backfill_embeddings, LanceVectorIndex, MemoryVectorIndex, ProductIndexer};

#[derive(Parser)]
#[command(name = "catalogdb")]
#[command(author, version, about = "Product discovery over a local catalog", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep product vectors in memory instead of the LanceDB directory
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load seed bundle(s) into the catalog and index their embeddings
    Import {
        /// A bundle file or a directory of *.json bundles
        path: PathBuf,
    },

    /// Re-embed every active product
    Reindex,

    /// Search or list active products
    Search {
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        merchant: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a product with its visually related items
    Product { id: String },

    /// Classify an image file and list the products of its category
    Classify { image: PathBuf },

    /// Print the active category tree
    Categories,

    /// Catalog and vector index counts
    Status,

    /// Place an order for one merchant's products, taking their stock
    Order {
        /// Ordering user id
        #[arg(long)]
        user: String,
        /// `product_id:quantity`, repeatable
        #[arg(long = "item", value_parser = parse_order_line, required = true)]
        items: Vec<OrderLine>,
        #[arg(long)]
        address: String,
        #[arg(long)]
        phone: String,
    },

    /// Cancel a pending order and return its stock
    Cancel {
        #[arg(long)]
        user: String,
        id: String,
    },

    /// List orders, newest first
    Orders {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        merchant: Option<String>,
        /// pending, paid, shipped, delivered or cancelled
        #[arg(long, value_parser = parse_order_status)]
        status: Option<OrderStatus>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn parse_order_line(raw: &str) -> std::result::Result<OrderLine, String> {
    let (product_id, quantity) = raw.rsplit_once(':').ok_or_else(|| format!("expected product_id:quantity, got {raw}"))?;
    let quantity = quantity.parse().map_err(|e| format!("bad quantity in {raw}: {e}"))?;
    Ok(OrderLine { product_id: product_id.to_string(), quantity })
}

fn parse_order_status(raw: &str) -> std::result::Result<OrderStatus, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase())).map_err(|_| format!("unknown order status {raw}"))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

struct Services {
    store: Arc<JsonCatalog>,
    indexer: ProductIndexer,
    discovery: Discovery,
    catalog: CatalogService,
    orders: OrderService,
}

async fn build_services(settings: &Settings, base: &Path, memory: bool) -> Result<Services> {
    let store = Arc::new(JsonCatalog::open(&settings.catalog_path(base))?);
    let embedder = get_default_embedder(&settings.embed)?;
    let index: Arc<dyn VectorIndex> = if memory {
        Arc::new(MemoryVectorIndex::new(embedder.dim()))
    } else {
        let dir = settings.lancedb_dir(base);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Arc::new(LanceVectorIndex::open(&dir.to_string_lossy(), &settings.vector.table, embedder.dim()).await?)
    };
    let fetcher = Arc::new(UrlImageFetcher::new(std::time::Duration::from_millis(settings.images.fetch_timeout_ms))?);
    let indexer = ProductIndexer::new(index, embedder, fetcher, settings.embed.timeout());
    let discovery = Discovery::new(store.clone(), indexer.clone(), settings.search.clone(), &settings.classifier);
    let catalog = CatalogService::new(store.clone(), indexer.clone());
    let orders = OrderService::new(store.clone(), settings.search.clone());
    Ok(Services { store, indexer, discovery, catalog, orders })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct Status {
    catalog: Option<PathBuf>,
    categories: usize,
    products: usize,
    reviews: usize,
    orders: usize,
    vectors: usize,
    embedder: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = Config::load_from(Path::new(&cli.config))?;
    let settings = config.settings()?;
    let base = cli.config.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let services = build_services(&settings, base, cli.memory).await?;

    match cli.command {
        Commands::Import { path } => {
            let bundle = load_seed_path(&path)?;
            let imported = services.store.import(bundle)?;
            info!(path = %path.display(), "seed imported, indexing embeddings");
            let indexed = backfill_embeddings(services.store.as_ref(), &services.indexer, true).await?;
            print_json(&serde_json::json!({ "imported": imported, "embeddings": indexed }))?;
        }

        Commands::Reindex => {
            let report = backfill_embeddings(services.store.as_ref(), &services.indexer, true).await?;
            print_json(&report)?;
        }

        Commands::Search { query, category, merchant, min_price, max_price, skip, limit } => {
            let request = SearchRequest {
                search: query,
                category_id: category,
                merchant_id: merchant,
                min_price,
                max_price,
                skip,
                limit,
            };
            print_json(&services.discovery.search(&request).await?)?;
        }

        Commands::Product { id } => {
            print_json(&services.discovery.product_detail(&id).await?)?;
        }

        Commands::Classify { image } => {
            let bytes = std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            print_json(&services.discovery.search_by_image(&bytes).await?)?;
        }

        Commands::Categories => {
            print_json(&services.catalog.category_tree()?)?;
        }

        Commands::Status => {
            let counts = services.store.counts()?;
            let status = Status {
                catalog: services.store.path().map(Path::to_path_buf),
                categories: counts.categories,
                products: counts.products,
                reviews: counts.reviews,
                orders: counts.orders,
                vectors: services.indexer.index().count().await?,
                embedder: services.indexer.embedder().embedder_id().to_string(),
            };
            print_json(&status)?;
        }

        Commands::Order { user, items, address, phone } => {
            let order = NewOrder { items, shipping_address: address, contact_phone: phone };
            print_json(&services.orders.place_order(&user, order)?)?;
        }

        Commands::Cancel { user, id } => {
            print_json(&services.orders.cancel_order(&user, &id)?)?;
        }

        Commands::Orders { user, merchant, status, skip, limit } => {
            let filter = OrderFilter { user_id: user, merchant_id: merchant, status };
            print_json(&services.orders.list_orders(&filter, skip, limit)?)?;
        }
    }

    Ok(())
}
