#![deny(warnings)]

//! Economic models for the field simulation.
//!
//! This crate provides:
//! - The stochastic oil price (daily drift, weighted quarterly shocks)
//! - Daily royalty, OPEX and tax arithmetic shared by the production tick
//! - Development cost and the discounted 20-year NPV used both for plan
//!   previews and for the sanction hurdle

use field_core::EngineError;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use thiserror::Error;

pub mod cashflow;
pub mod market;
pub mod npv;

pub use cashflow::{
    daily_cash_flow, fixed_opex_daily, opex_reduction, royalty_terms, DailyCashFlow, OpexInputs,
};
pub use market::{draw_shock, step_price, PriceStep};
pub use npv::{
    calculate_npv, development_cost, estimated_field_rate, npv_inputs, project_npv,
    DevelopmentCost, NpvInputs,
};

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Prices must be finite and positive; volumes and costs non-negative.
    #[error("invalid price or cost value")]
    InvalidPrice,
    /// A rate fell outside its meaningful range.
    #[error("invalid rate: {0}")]
    InvalidRate(f64),
    /// Numeric conversion failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

impl From<EconError> for EngineError {
    fn from(err: EconError) -> Self {
        match err {
            EconError::NonFinite => EngineError::NonFinite,
            other => EngineError::InvalidInput(other.to_string()),
        }
    }
}

/// Convert a float amount to money rounded to cents.
pub fn to_money(value: f64) -> Result<Decimal, EconError> {
    if !value.is_finite() {
        return Err(EconError::NonFinite);
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .ok_or(EconError::NonFinite)
}

/// Money as a float for rate arithmetic.
pub fn to_f64(value: Decimal) -> Result<f64, EconError> {
    value.to_f64().ok_or(EconError::NonFinite)
}

/// Scale a money amount by a float factor, rounding to cents.
pub fn scale_money(amount: Decimal, factor: f64) -> Result<Decimal, EconError> {
    to_money(to_f64(amount)? * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(to_money(1.005_1).unwrap(), Decimal::new(101, 2));
        assert_eq!(to_money(-2.5).unwrap(), Decimal::new(-250, 2));
        assert_eq!(to_money(f64::NAN), Err(EconError::NonFinite));
        assert_eq!(to_money(f64::INFINITY), Err(EconError::NonFinite));
    }

    #[test]
    fn scaling_applies_reduction() {
        let cost = Decimal::new(8_000_000, 0);
        assert_eq!(scale_money(cost, 0.9).unwrap(), Decimal::new(7_200_000, 0));
    }

    #[test]
    fn econ_errors_map_into_engine_errors() {
        assert_eq!(EngineError::from(EconError::NonFinite), EngineError::NonFinite);
        assert!(matches!(
            EngineError::from(EconError::InvalidPrice),
            EngineError::InvalidInput(_)
        ));
    }
}
