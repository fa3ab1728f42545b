//! Order execution for listing buy signals.
//!
//! Signals are processed one at a time. Each attempt runs: symbol lookup,
//! price fetch, quantity sizing, leverage change, market buy, fill lookup,
//! take-profit placement. Nothing is retried and nothing is rolled back: a
//! leverage change stays in effect even when a later step fails, and a
//! failed take-profit leaves the long open without protection.

use crate::config::FuturesOptions;
use crate::error::ExecutionError;
use crate::exchange::{FuturesExchange, NewOrder, OrderSide};
use crate::signal::BuySignal;
use crate::strategy::symbol_cache::SymbolCache;
use crate::utils::decimal::{apply_percentage, quantity_for_notional, round_to_tick};
use crate::utils::shutdown_requested;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// What a completed attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionOutcome {
    /// Order submission disabled; the intended trade was only reported.
    DryRun {
        symbol: String,
        price: Decimal,
        quantity: Decimal,
    },
    /// Long opened and take-profit placed.
    Opened {
        symbol: String,
        order_id: i64,
        quantity: Decimal,
        avg_fill_price: Decimal,
        take_profit_price: Decimal,
    },
}

/// Opens leveraged longs for buy signals.
pub struct OrderExecutor<E: ?Sized> {
    exchange: Arc<E>,
    options: FuturesOptions,
    cache: Arc<SymbolCache>,
}

impl<E> OrderExecutor<E>
where
    E: FuturesExchange + ?Sized + 'static,
{
    /// Create an executor. Fails unless the initial symbol fetch succeeds.
    pub async fn new(exchange: Arc<E>, options: FuturesOptions) -> Result<Self, ExecutionError> {
        let cache = Arc::new(SymbolCache::new());
        let count = cache.refresh(exchange.as_ref()).await?;

        info!(
            symbols = count,
            leverage = options.leverage,
            each_trade_usd = %options.each_trade_amount_usd,
            take_profit_pct = %options.take_profit_percentage,
            will_execute_order = options.will_execute_order,
            "Order executor ready"
        );

        Ok(Self {
            exchange,
            options,
            cache,
        })
    }

    pub fn symbol_cache(&self) -> Arc<SymbolCache> {
        self.cache.clone()
    }

    pub fn options(&self) -> &FuturesOptions {
        &self.options
    }

    /// Open a long on the asset's USDT pair.
    pub async fn consume_buy_signal(
        &self,
        signal: &BuySignal,
    ) -> Result<PositionOutcome, ExecutionError> {
        self.create_long_position(&signal.pair_symbol()).await
    }

    pub async fn create_long_position(
        &self,
        symbol: &str,
    ) -> Result<PositionOutcome, ExecutionError> {
        let futures_symbol = self.cache.get(symbol).await?;

        let price = self
            .exchange
            .get_price(symbol)
            .await
            .map_err(|source| ExecutionError::Query {
                symbol: symbol.to_string(),
                source,
            })?
            .ok_or_else(|| ExecutionError::PriceUnavailable(symbol.to_string()))?;

        let quantity = quantity_for_notional(
            self.options.each_trade_amount_usd,
            price,
            futures_symbol.quantity_precision,
        )
        .ok_or_else(|| ExecutionError::PriceUnavailable(symbol.to_string()))?;

        self.exchange
            .set_leverage(symbol, self.options.leverage)
            .await
            .map_err(|source| ExecutionError::LeverageChange {
                symbol: symbol.to_string(),
                source,
            })?;

        if !self.options.will_execute_order {
            info!(%symbol, %price, %quantity, "Trying to buy (order execution disabled)");
            return Ok(PositionOutcome::DryRun {
                symbol: symbol.to_string(),
                price,
                quantity,
            });
        }

        let buy = self
            .exchange
            .place_order(&NewOrder::market(symbol, OrderSide::Buy, quantity))
            .await
            .map_err(|source| ExecutionError::OrderSubmission {
                symbol: symbol.to_string(),
                source,
            })?;
        info!(%symbol, %price, %quantity, order_id = buy.order_id, "Executed buy order");

        let filled = self
            .exchange
            .get_order(symbol, buy.order_id)
            .await
            .map_err(|source| ExecutionError::OrderLookup {
                symbol: symbol.to_string(),
                order_id: buy.order_id,
                source,
            })?;
        if filled.avg_price <= Decimal::ZERO {
            warn!(
                %symbol,
                order_id = buy.order_id,
                status = ?filled.status,
                "Order reports no average fill price, take profit not placed"
            );
            return Err(ExecutionError::OrderLookup {
                symbol: symbol.to_string(),
                order_id: buy.order_id,
                source: anyhow::anyhow!(
                    "no average fill price (status {:?}), position left open",
                    filled.status
                ),
            });
        }

        let take_profit_price = round_to_tick(
            apply_percentage(filled.avg_price, self.options.take_profit_percentage),
            futures_symbol.tick_size,
        );

        self.exchange
            .place_order(&NewOrder::take_profit_close(
                symbol,
                OrderSide::Sell,
                take_profit_price,
            ))
            .await
            .map_err(|source| ExecutionError::TakeProfitSubmission {
                symbol: symbol.to_string(),
                source,
            })?;
        info!(
            %symbol,
            avg_fill_price = %filled.avg_price,
            %take_profit_price,
            "Take profit order placed"
        );

        Ok(PositionOutcome::Opened {
            symbol: symbol.to_string(),
            order_id: buy.order_id,
            quantity,
            avg_fill_price: filled.avg_price,
            take_profit_price,
        })
    }

    /// Consume buy signals one at a time until the channel closes or
    /// shutdown is requested. Failed attempts are logged and dropped.
    pub async fn run(
        &self,
        mut signals: mpsc::Receiver<BuySignal>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Start listening on buy signal channel");

        loop {
            let signal = tokio::select! {
                signal = signals.recv() => match signal {
                    Some(signal) => signal,
                    None => break,
                },
                _ = shutdown_requested(&mut shutdown) => break,
            };

            info!(
                symbol = %signal.symbol,
                source = %signal.source,
                detected_at = %signal.detected_at,
                queued_ms = signal.age().num_milliseconds(),
                "Incoming buy signal"
            );

            if let Err(e) = self.consume_buy_signal(&signal).await {
                error!(
                    symbol = %signal.symbol,
                    source = %signal.source,
                    detected_at = %signal.detected_at,
                    error = %e,
                    "Fail to consume buy signal"
                );
            }
        }

        info!("Buy signal consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{
        MockFuturesExchange, OrderResponse, OrderStatus, OrderType, TimeInForce, TradableSymbol,
    };
    use rust_decimal_macros::dec;

    fn symbols() -> Vec<TradableSymbol> {
        vec![
            TradableSymbol {
                symbol: "BTCUSDT".to_string(),
                quantity_precision: 3,
                tick_size: dec!(0.1),
            },
            TradableSymbol {
                symbol: "DOGEUSDT".to_string(),
                quantity_precision: 0,
                tick_size: dec!(0.000001),
            },
        ]
    }

    fn order(order_id: i64, status: OrderStatus, avg_price: Decimal) -> OrderResponse {
        OrderResponse {
            order_id,
            symbol: "BTCUSDT".to_string(),
            status,
            client_order_id: String::new(),
            price: Decimal::ZERO,
            avg_price,
            orig_qty: dec!(0.010),
            executed_qty: dec!(0.010),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            time_in_force: None,
            update_time: 0,
        }
    }

    fn exchange_with_symbols() -> MockFuturesExchange {
        let mut exchange = MockFuturesExchange::new();
        exchange.expect_get_symbols().times(1).returning(|| Ok(symbols()));
        exchange
    }

    fn live_options() -> FuturesOptions {
        FuturesOptions {
            will_execute_order: true,
            ..FuturesOptions::default()
        }
    }

    async fn executor(exchange: MockFuturesExchange, options: FuturesOptions) -> OrderExecutor<MockFuturesExchange> {
        OrderExecutor::new(Arc::new(exchange), options).await.unwrap()
    }

    #[tokio::test]
    async fn test_new_requires_symbol_metadata() {
        let mut exchange = MockFuturesExchange::new();
        exchange
            .expect_get_symbols()
            .returning(|| Err(anyhow::anyhow!("connection refused")));
        let result = OrderExecutor::new(Arc::new(exchange), FuturesOptions::default()).await;
        assert!(matches!(result, Err(ExecutionError::ExchangeQuery(_))));

        let mut exchange = MockFuturesExchange::new();
        exchange.expect_get_symbols().returning(|| Ok(vec![]));
        let result = OrderExecutor::new(Arc::new(exchange), FuturesOptions::default()).await;
        assert!(matches!(result, Err(ExecutionError::EmptySymbolCache)));
    }

    #[tokio::test]
    async fn test_unknown_symbol_stops_before_any_exchange_call() {
        let mut exchange = exchange_with_symbols();
        exchange.expect_get_price().never();
        exchange.expect_set_leverage().never();
        exchange.expect_place_order().never();

        let executor = executor(exchange, live_options()).await;
        let result = executor
            .consume_buy_signal(&BuySignal::new("SOL", "https://twitter.com/x/status/1"))
            .await;

        assert!(matches!(result, Err(ExecutionError::SymbolNotFound(s)) if s == "SOLUSDT"));
    }

    #[tokio::test]
    async fn test_missing_price() {
        let mut exchange = exchange_with_symbols();
        exchange.expect_get_price().times(1).returning(|_| Ok(None));
        exchange.expect_set_leverage().never();

        let executor = executor(exchange, live_options()).await;
        let result = executor.create_long_position("BTCUSDT").await;
        assert!(matches!(result, Err(ExecutionError::PriceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_price_transport_failure() {
        let mut exchange = exchange_with_symbols();
        exchange
            .expect_get_price()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("timeout")));
        exchange.expect_set_leverage().never();

        let executor = executor(exchange, live_options()).await;
        let result = executor.create_long_position("BTCUSDT").await;
        assert!(matches!(result, Err(ExecutionError::Query { .. })));
    }

    #[tokio::test]
    async fn test_dry_run_sets_leverage_but_places_no_order() {
        let mut exchange = exchange_with_symbols();
        exchange
            .expect_get_price()
            .withf(|symbol| symbol == "BTCUSDT")
            .times(1)
            .returning(|_| Ok(Some(dec!(50000))));
        exchange
            .expect_set_leverage()
            .withf(|symbol, leverage| symbol == "BTCUSDT" && *leverage == 5)
            .times(1)
            .returning(|_, _| Ok(()));
        exchange.expect_place_order().never();

        let executor = executor(exchange, FuturesOptions::default()).await;
        let outcome = executor
            .consume_buy_signal(&BuySignal::new("BTC", "https://twitter.com/x/status/1"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PositionOutcome::DryRun {
                symbol: "BTCUSDT".to_string(),
                price: dec!(50000),
                quantity: dec!(0.010),
            }
        );
    }

    #[tokio::test]
    async fn test_leverage_failure_aborts_attempt() {
        let mut exchange = exchange_with_symbols();
        exchange
            .expect_get_price()
            .returning(|_| Ok(Some(dec!(50000))));
        exchange
            .expect_set_leverage()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("code -4028")));
        exchange.expect_place_order().never();

        let executor = executor(exchange, live_options()).await;
        let result = executor.create_long_position("BTCUSDT").await;
        assert!(matches!(result, Err(ExecutionError::LeverageChange { .. })));
    }

    #[tokio::test]
    async fn test_opens_long_with_take_profit() {
        let mut exchange = exchange_with_symbols();
        exchange
            .expect_get_price()
            .returning(|_| Ok(Some(dec!(50000))));
        exchange.expect_set_leverage().returning(|_, _| Ok(()));
        exchange
            .expect_place_order()
            .withf(|order| {
                order.order_type == OrderType::Market
                    && order.side == OrderSide::Buy
                    && order.quantity == Some(dec!(0.010))
            })
            .times(1)
            .returning(|_| Ok(order(77, OrderStatus::New, Decimal::ZERO)));
        exchange
            .expect_get_order()
            .withf(|symbol, order_id| symbol == "BTCUSDT" && *order_id == 77)
            .times(1)
            .returning(|_, _| Ok(order(77, OrderStatus::Filled, dec!(50123.45))));
        exchange
            .expect_place_order()
            .withf(|order| {
                order.order_type == OrderType::TakeProfitMarket
                    && order.side == OrderSide::Sell
                    && order.time_in_force == Some(TimeInForce::Gtc)
                    && order.close_position == Some(true)
                    && order.quantity.is_none()
                    && order.stop_price == Some(dec!(52629.6))
            })
            .times(1)
            .returning(|_| Ok(order(78, OrderStatus::New, Decimal::ZERO)));

        let executor = executor(exchange, live_options()).await;
        let outcome = executor.create_long_position("BTCUSDT").await.unwrap();

        // 50123.45 * 1.05 = 52629.6225, snapped to the 0.1 tick
        assert_eq!(
            outcome,
            PositionOutcome::Opened {
                symbol: "BTCUSDT".to_string(),
                order_id: 77,
                quantity: dec!(0.010),
                avg_fill_price: dec!(50123.45),
                take_profit_price: dec!(52629.6),
            }
        );
    }

    #[tokio::test]
    async fn test_order_lookup_failure() {
        let mut exchange = exchange_with_symbols();
        exchange.expect_get_price().returning(|_| Ok(Some(dec!(0.25))));
        exchange.expect_set_leverage().returning(|_, _| Ok(()));
        exchange
            .expect_place_order()
            .times(1)
            .returning(|_| Ok(order(9, OrderStatus::New, Decimal::ZERO)));
        exchange
            .expect_get_order()
            .returning(|_, _| Err(anyhow::anyhow!("order does not exist")));

        let executor = executor(exchange, live_options()).await;
        let result = executor.create_long_position("DOGEUSDT").await;
        assert!(matches!(result, Err(ExecutionError::OrderLookup { order_id: 9, .. })));
    }

    #[tokio::test]
    async fn test_missing_fill_price_skips_take_profit() {
        let mut exchange = exchange_with_symbols();
        exchange.expect_get_price().returning(|_| Ok(Some(dec!(50000))));
        exchange.expect_set_leverage().returning(|_, _| Ok(()));
        exchange
            .expect_place_order()
            .withf(|order| order.order_type == OrderType::Market)
            .times(1)
            .returning(|_| Ok(order(77, OrderStatus::New, Decimal::ZERO)));
        exchange
            .expect_get_order()
            .times(1)
            .returning(|_, _| Ok(order(77, OrderStatus::New, Decimal::ZERO)));
        exchange
            .expect_place_order()
            .withf(|order| order.order_type == OrderType::TakeProfitMarket)
            .never();

        let executor = executor(exchange, live_options()).await;
        let result = executor.create_long_position("BTCUSDT").await;
        assert!(matches!(
            result,
            Err(ExecutionError::OrderLookup { order_id: 77, ref symbol, .. }) if symbol == "BTCUSDT"
        ));
    }

    #[tokio::test]
    async fn test_take_profit_failure_leaves_position_open() {
        let mut exchange = exchange_with_symbols();
        exchange.expect_get_price().returning(|_| Ok(Some(dec!(0.25))));
        exchange.expect_set_leverage().returning(|_, _| Ok(()));
        exchange
            .expect_place_order()
            .withf(|order| order.order_type == OrderType::Market && order.quantity == Some(dec!(2000)))
            .times(1)
            .returning(|_| Ok(order(9, OrderStatus::New, Decimal::ZERO)));
        exchange
            .expect_get_order()
            .returning(|_, _| Ok(order(9, OrderStatus::Filled, dec!(0.2501))));
        exchange
            .expect_place_order()
            .withf(|order| order.order_type == OrderType::TakeProfitMarket)
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("code -2021 order would immediately trigger")));

        let executor = executor(exchange, live_options()).await;
        let result = executor.create_long_position("DOGEUSDT").await;
        assert!(matches!(
            result,
            Err(ExecutionError::TakeProfitSubmission { symbol, .. }) if symbol == "DOGEUSDT"
        ));
    }

    #[tokio::test]
    async fn test_run_processes_signals_sequentially_past_failures() {
        let mut exchange = exchange_with_symbols();
        exchange
            .expect_get_price()
            .withf(|symbol| symbol == "BTCUSDT")
            .times(2)
            .returning(|_| Ok(Some(dec!(50000))));
        exchange.expect_set_leverage().times(2).returning(|_, _| Ok(()));
        exchange.expect_place_order().never();

        let executor = executor(exchange, FuturesOptions::default()).await;
        let (tx, rx) = mpsc::channel(3);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(BuySignal::new("BTC", "a")).await.unwrap();
        tx.send(BuySignal::new("NOPE", "b")).await.unwrap();
        tx.send(BuySignal::new("BTC", "c")).await.unwrap();
        drop(tx);

        executor.run(rx, shutdown_rx).await;
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let executor = executor(exchange_with_symbols(), FuturesOptions::default()).await;
        let (_tx, rx) = mpsc::channel::<BuySignal>(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), executor.run(rx, shutdown_rx))
            .await
            .expect("executor should stop on shutdown");
    }
}
