//! Listing Trader - Main Entry Point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listing_trader::config::{Config, FuturesOptions};
use listing_trader::exchange::BinanceClient;
use listing_trader::feed::{HttpFeed, StreamListener};
use listing_trader::pipeline::{forward_signals, handoff};
use listing_trader::signal::{
    classify_announcement, extract_tickers, AssetFilter, CoinGeckoClient, SignalDetector,
};
use listing_trader::strategy::{spawn_symbol_refresh, OrderExecutor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Listing Trader CLI
#[derive(Parser)]
#[command(name = "listing-trader")]
#[command(version, about = "Trade Binance futures on new asset listing announcements")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a post text against the listing detector without trading
    Classify {
        /// Post text to classify
        #[arg(short, long)]
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Classify { text }) = cli.command {
        let is_listing = classify_announcement(&text);
        println!("listing announcement: {}", is_listing);
        if is_listing {
            println!("tickers: {:?}", extract_tickers(&text));
        }
        return Ok(());
    }

    init_logging()?;
    run().await
}

async fn run() -> Result<()> {
    info!("Listing Trader v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    config.validate().context("Invalid configuration")?;

    let options = FuturesOptions::from_config(&config.futures);
    if options.will_execute_order {
        warn!("Order execution ENABLED - real orders will be submitted");
    } else {
        info!("Order execution disabled - trades are only logged");
    }
    if config.binance.testnet {
        info!("Using Binance futures testnet");
    }

    let assets = CoinGeckoClient::new(&config.assets)?
        .get_coin_symbols()
        .await
        .context("Fail to get supported coins")?;
    let filter = AssetFilter::new(assets);

    let exchange = Arc::new(BinanceClient::new(&config.binance)?);
    let executor = Arc::new(
        OrderExecutor::new(exchange.clone(), options)
            .await
            .context("Fail to init binance futures manager")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let refresher = spawn_symbol_refresh(
        executor.symbol_cache(),
        exchange,
        Duration::from_secs(config.cache.refresh_interval_secs),
        shutdown_rx.clone(),
    );

    let listener = StreamListener::new(Arc::new(HttpFeed::new(&config.feed)?));
    let messages = listener
        .start(&config.feed.tracked_author_ids)
        .await
        .context("Fail to subscribe buy signal")?;

    // Only the first tracked author is treated as the announcement source
    let detector = SignalDetector::new(config.feed.tracked_author_ids[0].clone(), filter);
    let (signal_tx, signal_rx) = handoff();

    let forwarder = tokio::spawn(forward_signals(
        detector,
        messages,
        signal_tx,
        shutdown_rx.clone(),
    ));
    let consumer = {
        let executor = executor.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { executor.run(signal_rx, shutdown).await })
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Stop application");

    shutdown_tx.send_replace(true);
    listener.stop();

    for (name, task) in [("forwarder", forwarder), ("consumer", consumer), ("refresher", refresher)] {
        if let Err(e) = task.await {
            error!(task = name, error = %e, "Task ended abnormally");
        }
    }

    info!("Listing Trader shutdown complete");
    Ok(())
}

fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "listing-trader.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("listing_trader=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    Ok(())
}
