//! Stochastic oil price: small daily drift plus weighted quarterly shocks.

use field_core::{uniform, MarketPrice, MarketTable, PricePoint, ShockEvent};
use rand::Rng;
use tracing::info;

/// Result of one market day.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceStep {
    pub day: u32,
    pub previous: f64,
    pub price: f64,
    /// True on quarter days, whether or not a shock fired.
    pub quarter: bool,
    pub shock: Option<String>,
}

/// Draw a quarterly event. `None` is the implicit "stable" remainder.
pub fn draw_shock<'a, R: Rng + ?Sized>(table: &'a MarketTable, rng: &mut R) -> Option<&'a ShockEvent> {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for shock in &table.shocks {
        cumulative += shock.weight;
        if roll < cumulative {
            return Some(shock);
        }
    }
    None
}

/// Advance the price for production day `day` (1-based).
pub fn step_price<R: Rng + ?Sized>(
    market: &mut MarketPrice,
    table: &MarketTable,
    day: u32,
    rng: &mut R,
) -> PriceStep {
    let previous = market.current;
    let quarter = table.quarter_days > 0 && day % table.quarter_days == 0;
    let mut shock_id = None;
    if quarter {
        if let Some(shock) = draw_shock(table, rng) {
            let impact = uniform(rng, shock.impact_min, shock.impact_max);
            market.current = (previous + impact).clamp(table.floor, table.ceiling);
            info!(day, shock = %shock.id, impact, price = market.current, "market shock");
            shock_id = Some(shock.id.clone());
        }
        market.history.push(PricePoint {
            day,
            price: market.current,
            event: Some(shock_id.clone().unwrap_or_else(|| "stable".to_string())),
        });
    } else {
        let drift = uniform(rng, -table.daily_drift, table.daily_drift);
        market.current = (previous + drift).clamp(table.floor, table.ceiling);
        if table.history_interval_days > 0 && day % table.history_interval_days == 0 {
            market.history.push(PricePoint {
                day,
                price: market.current,
                event: None,
            });
        }
    }
    PriceStep {
        day,
        previous,
        price: market.current,
        quarter,
        shock: shock_id,
    }
}
