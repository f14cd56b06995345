//! The paper broker

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use vega_core::{Price, Symbol, TransactionSide};
use vega_ports::{
    BrokerClient, BrokerError, BrokerOrder, BrokerPosition, BrokerResult, OrderRequest,
    OrderState, Quote,
};

/// Immediate-fill broker with scriptable failures
pub struct PaperBroker {
    orders: Arc<DashMap<String, BrokerOrder>>,
    positions: Arc<DashMap<Symbol, BrokerPosition>>,
    premiums: Arc<DashMap<Symbol, Price>>,
    default_premium: Price,
    margin: Arc<DashMap<(), Decimal>>,
    next_id: Arc<AtomicU64>,
    fail_next: Arc<AtomicU32>,
    reject_market: Arc<AtomicBool>,
}

impl PaperBroker {
    pub fn new() -> Self {
        let margin = Arc::new(DashMap::new());
        margin.insert((), dec!(10000000));
        Self {
            orders: Arc::new(DashMap::new()),
            positions: Arc::new(DashMap::new()),
            premiums: Arc::new(DashMap::new()),
            default_premium: dec!(100),
            margin,
            next_id: Arc::new(AtomicU64::new(1)),
            fail_next: Arc::new(AtomicU32::new(0)),
            reject_market: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Premium used when a symbol has no scripted price
    pub fn with_default_premium(mut self, premium: Price) -> Self {
        self.default_premium = premium;
        self
    }

    /// Script the fill premium for a symbol
    pub fn set_premium(&self, symbol: impl Into<Symbol>, premium: Price) {
        self.premiums.insert(symbol.into(), premium);
    }

    /// Fail the next `n` placements with a transient error
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Reject market orders so only limit orders fill
    pub fn reject_market(&self, reject: bool) {
        self.reject_market.store(reject, Ordering::SeqCst);
    }

    pub fn set_margin_available(&self, margin: Decimal) {
        self.margin.insert((), margin);
    }

    /// Number of orders placed so far
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    fn premium_for(&self, request: &OrderRequest) -> Price {
        if let Some(limit) = request.limit_price {
            return limit;
        }
        self.premiums
            .get(&request.symbol)
            .map(|p| *p.value())
            .unwrap_or(self.default_premium)
    }

    fn apply_position(&self, request: &OrderRequest, premium: Price) {
        let signed = match request.side {
            TransactionSide::Buy => request.quantity,
            TransactionSide::Sell => -request.quantity,
        };
        let mut entry = self
            .positions
            .entry(request.symbol.clone())
            .or_insert_with(|| BrokerPosition {
                symbol: request.symbol.clone(),
                quantity: Decimal::ZERO,
                average_premium: premium,
            });
        entry.quantity += signed;
        entry.average_premium = premium;
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PaperBroker {
    fn clone(&self) -> Self {
        Self {
            orders: Arc::clone(&self.orders),
            positions: Arc::clone(&self.positions),
            premiums: Arc::clone(&self.premiums),
            default_premium: self.default_premium,
            margin: Arc::clone(&self.margin),
            next_id: Arc::clone(&self.next_id),
            fail_next: Arc::clone(&self.fail_next),
            reject_market: Arc::clone(&self.reject_market),
        }
    }
}

#[async_trait]
impl BrokerClient for PaperBroker {
    async fn place_order(&self, request: &OrderRequest) -> BrokerResult<String> {
        // Scripted transient failures first
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(BrokerError::Transient("scripted failure".to_string()));
        }

        if self.reject_market.load(Ordering::SeqCst)
            && request.limit_price.is_none()
            && request.trigger_price.is_none()
        {
            return Err(BrokerError::Rejected("market orders disabled".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let order_id = format!("SIM-{id}");
        let premium = self.premium_for(request);

        // Stop orders rest; everything else fills immediately
        let state = if request.trigger_price.is_some() {
            OrderState::Open
        } else {
            self.apply_position(request, premium);
            OrderState::Filled
        };

        debug!(
            "[Sim] {} {} {} x {} -> {:?} at {}",
            order_id,
            request.side.as_str(),
            request.symbol,
            request.quantity,
            state,
            premium
        );

        self.orders.insert(
            order_id.clone(),
            BrokerOrder {
                order_id: order_id.clone(),
                correlation_id: request.correlation_id,
                symbol: request.symbol.clone(),
                side: request.side,
                state,
                quantity: request.quantity,
                filled_quantity: if state == OrderState::Filled {
                    request.quantity
                } else {
                    Decimal::ZERO
                },
                average_premium: if state == OrderState::Filled {
                    Some(premium)
                } else {
                    None
                },
                updated_at: Utc::now(),
            },
        );
        Ok(order_id)
    }

    async fn modify_order(
        &self,
        order_id: &str,
        limit_price: Option<Price>,
        trigger_price: Option<Price>,
    ) -> BrokerResult<()> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| BrokerError::Rejected(format!("unknown order {order_id}")))?;
        if order.state.is_terminal() {
            return Err(BrokerError::Rejected("order already terminal".to_string()));
        }
        let _ = (limit_price, trigger_price);
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn cancel_order(&self, order_id: &str) -> BrokerResult<()> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| BrokerError::Rejected(format!("unknown order {order_id}")))?;
        if !order.state.is_terminal() {
            order.state = OrderState::Cancelled;
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn order_status(&self, order_id: &str) -> BrokerResult<BrokerOrder> {
        self.orders
            .get(order_id)
            .map(|o| o.value().clone())
            .ok_or_else(|| BrokerError::Rejected(format!("unknown order {order_id}")))
    }

    async fn positions(&self) -> BrokerResult<Vec<BrokerPosition>> {
        Ok(self.positions.iter().map(|p| p.value().clone()).collect())
    }

    async fn quote(&self, symbol: &str) -> BrokerResult<Quote> {
        let last_price = self
            .premiums
            .get(symbol)
            .map(|p| *p.value())
            .unwrap_or(self.default_premium);
        Ok(Quote {
            symbol: symbol.to_string(),
            last_price,
            timestamp: Utc::now(),
        })
    }

    async fn margin_available(&self) -> BrokerResult<Price> {
        Ok(self.margin.get(&()).map(|m| *m.value()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request(symbol: &str, side: TransactionSide) -> OrderRequest {
        OrderRequest {
            correlation_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side,
            quantity: dec!(50),
            limit_price: None,
            trigger_price: None,
        }
    }

    #[tokio::test]
    async fn test_fills_at_scripted_premium() {
        let broker = PaperBroker::new();
        broker.set_premium("NIFTY25SEP2524000CE", dec!(123));

        let id = broker
            .place_order(&request("NIFTY25SEP2524000CE", TransactionSide::Sell))
            .await
            .unwrap();
        let order = broker.order_status(&id).await.unwrap();
        assert_eq!(order.state, OrderState::Filled);
        assert_eq!(order.average_premium, Some(dec!(123)));

        let positions = broker.positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, dec!(-50));
    }

    #[tokio::test]
    async fn test_scripted_failures_then_fill() {
        let broker = PaperBroker::new();
        broker.fail_next(2);

        for _ in 0..2 {
            let err = broker
                .place_order(&request("NIFTY25SEP2524000CE", TransactionSide::Sell))
                .await;
            assert!(matches!(err, Err(BrokerError::Transient(_))));
        }
        assert!(
            broker
                .place_order(&request("NIFTY25SEP2524000CE", TransactionSide::Sell))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_market_rejection_allows_limit() {
        let broker = PaperBroker::new();
        broker.reject_market(true);

        let market = request("NIFTY25SEP2524000CE", TransactionSide::Sell);
        assert!(matches!(
            broker.place_order(&market).await,
            Err(BrokerError::Rejected(_))
        ));

        let limit = OrderRequest {
            limit_price: Some(dec!(99)),
            ..market
        };
        let id = broker.place_order(&limit).await.unwrap();
        let order = broker.order_status(&id).await.unwrap();
        assert_eq!(order.average_premium, Some(dec!(99)));
    }

    #[tokio::test]
    async fn test_stop_orders_rest_until_cancelled() {
        let broker = PaperBroker::new();
        let stop = OrderRequest {
            trigger_price: Some(dec!(90)),
            ..request("NIFTY25SEP2524000CE", TransactionSide::Buy)
        };
        let id = broker.place_order(&stop).await.unwrap();
        assert_eq!(
            broker.order_status(&id).await.unwrap().state,
            OrderState::Open
        );

        broker.cancel_order(&id).await.unwrap();
        assert_eq!(
            broker.order_status(&id).await.unwrap().state,
            OrderState::Cancelled
        );
    }
}
