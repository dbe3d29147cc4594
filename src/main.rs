use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use siftx_api::RestApi;
use siftx_core::Collection;

/// A read-only search index over columnar datasets
#[derive(Parser, Debug)]
#[command(name = "siftx")]
#[command(about = "Index a dataset and serve filtered, ranked queries", long_about = None)]
struct Args {
    /// Dataset to index (.csv, .tsv, .json, .jsonl)
    #[arg(short, long)]
    datafile: PathBuf,

    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    address: String,

    /// Path prefix for the API routes
    #[arg(long, default_value = "/")]
    path: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting siftX v{}", env!("CARGO_PKG_VERSION"));
    info!("Dataset: {:?}", args.datafile);

    let columns = siftx_format::load(&args.datafile)?;
    info!("Loaded {} columns", columns.len());

    // serving starts immediately; queries report unavailable until the
    // background build publishes the index
    let collection = Collection::build(columns)?;

    let watcher = collection.clone();
    tokio::task::spawn_blocking(move || {
        watcher.wait_ready();
        info!("Index ready");
    });

    let address = args.address.clone();
    let prefix = args.path.clone();
    let http_collection = collection.clone();
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on {}", address);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(http_collection, &address, &prefix).await {
                eprintln!("HTTP server error: {}", e);
            }
        })
    });

    info!("HTTP API: http://{}{}", args.address, args.path);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
