//! Bundled estimators

use serde::Serialize;

use tradesim_core::{ImpactConfig, OrderBookSnapshot, OrderType, TradeParameters};

use crate::{fees, impact, maker_taker, slippage};

/// Per-snapshot cost figures, before net cost is assembled
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub slippage: f64,
    pub fees: f64,
    pub market_impact: f64,
    pub maker_proportion: f64,
}

/// Stateless cost model carrying only its fixed configuration
#[derive(Debug, Clone, Default)]
pub struct CostModel {
    impact: ImpactConfig,
}

impl CostModel {
    pub fn new(impact: ImpactConfig) -> Self {
        Self { impact }
    }

    pub fn slippage(&self, book: &OrderBookSnapshot, quantity: f64, order_type: OrderType) -> f64 {
        slippage::slippage(book, quantity, order_type)
    }

    pub fn fees(
        &self,
        venue: &str,
        tier: &str,
        quantity: f64,
        price: f64,
        maker_split: f64,
    ) -> f64 {
        fees::fees(venue, tier, quantity, price, maker_split)
    }

    pub fn market_impact(
        &self,
        book: &OrderBookSnapshot,
        quantity: f64,
        volatility: f64,
        price: f64,
    ) -> f64 {
        impact::market_impact_with(&self.impact, book, quantity, volatility, price)
    }

    pub fn maker_taker_split(&self, book: &OrderBookSnapshot, quantity: f64) -> f64 {
        maker_taker::maker_taker_split(book, quantity)
    }

    /// All four figures for one snapshot, with fees and impact priced at `mid_price`
    pub fn breakdown(
        &self,
        book: &OrderBookSnapshot,
        params: &TradeParameters,
        mid_price: f64,
    ) -> CostBreakdown {
        let maker_proportion = self.maker_taker_split(book, params.quantity);
        let slippage = self.slippage(book, params.quantity, params.order_type);
        let fees = self.fees(
            &params.venue,
            &params.fee_tier,
            params.quantity,
            mid_price,
            maker_proportion,
        );
        let market_impact = self.market_impact(book, params.quantity, params.volatility, mid_price);

        CostBreakdown {
            slippage,
            fees,
            market_impact,
            maker_proportion,
        }
    }
}
