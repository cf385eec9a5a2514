use std::sync::Arc;

use clap::Parser;
use clinic_core::{CacheStore, ClinicConfig, HttpFetcher};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use clinic_server::mirror::Mirror;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "clinic.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience, production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match ClinicConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    if args.health {
        let pool = match clinic_core::db::create_pool(&config.database, &config.cache).await {
            Ok(p) => p,
            Err(e) => {
                println!("❌ Failed to open database {}: {}", config.database.url, e);
                std::process::exit(1);
            }
        };

        match clinic_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ SQLite connected: {}", v),
            Err(e) => {
                println!("❌ SQLite connection failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ clinic-mirror DB health check passed");
        return Ok(());
    }

    // Open the cache store
    let store = match CacheStore::open(&config.database, &config.cache).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open cache store {}: {}", config.database.url, e);
            std::process::exit(1);
        }
    };

    let fetcher = HttpFetcher::new(&config.site)?;
    let mirror = Mirror::new(Arc::new(fetcher), config.site.clone(), store);

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    clinic_server::http::start_http_server(mirror, config, tx.subscribe()).await?;

    Ok(())
}
