//! Futures symbol metadata cache.
//!
//! The map is never mutated in place. A refresh builds a complete new map
//! off-lock and swaps it in, so readers see either the old or the new
//! generation in full.

use crate::error::ExecutionError;
use crate::exchange::{FuturesExchange, TradableSymbol};
use crate::utils::shutdown_requested;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

type SymbolMap = HashMap<String, TradableSymbol>;

#[derive(Debug, Default)]
pub struct SymbolCache {
    symbols: RwLock<Arc<SymbolMap>>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-key lookup.
    pub async fn get(&self, symbol: &str) -> Result<TradableSymbol, ExecutionError> {
        self.symbols
            .read()
            .await
            .get(symbol)
            .cloned()
            .ok_or_else(|| ExecutionError::SymbolNotFound(symbol.to_string()))
    }

    /// The current generation of the map.
    pub async fn snapshot(&self) -> Arc<SymbolMap> {
        self.symbols.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.symbols.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.symbols.read().await.is_empty()
    }

    /// Swap in a complete new mapping.
    pub async fn replace(&self, symbols: Vec<TradableSymbol>) {
        let map: SymbolMap = symbols
            .into_iter()
            .map(|s| (s.symbol.clone(), s))
            .collect();
        *self.symbols.write().await = Arc::new(map);
    }

    /// Fetch all symbol metadata and replace the mapping. On failure the
    /// previous mapping is kept untouched.
    pub async fn refresh<E>(&self, exchange: &E) -> Result<usize, ExecutionError>
    where
        E: FuturesExchange + ?Sized,
    {
        let symbols = exchange
            .get_symbols()
            .await
            .map_err(ExecutionError::ExchangeQuery)?;
        if symbols.is_empty() {
            return Err(ExecutionError::EmptySymbolCache);
        }

        let count = symbols.len();
        self.replace(symbols).await;
        debug!(symbols = count, "Symbol cache refreshed");

        Ok(count)
    }
}

/// Refresh `cache` every `every` until shutdown. The first refresh happens
/// one full interval after spawning.
pub fn spawn_symbol_refresh<E>(
    cache: Arc<SymbolCache>,
    exchange: Arc<E>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    E: FuturesExchange + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        info!(interval_secs = every.as_secs(), "Symbol refresh task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = cache.refresh(exchange.as_ref()).await {
                        error!(error = %e, "Fail to update supported symbols info");
                    }
                }
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        info!("Symbol refresh task stopped");
    })
}
