//! Downside risk relative to a minimum acceptable return (MAR).
//!
//! A period counts as downside when its return is below the MAR. Downside
//! periods contribute their raw squared return; every other period contributes
//! zero. The sum is divided by the full period count:
//!
//! `DD = sqrt( Σ_{r < MAR} r² / N )`

use crate::{ReturnTable, Result, RiskError};

/// Per-period downside deviation of a return series.
///
/// # Errors
/// Fails with [`RiskError::InvalidInput`] on an empty series.
pub fn downside_deviation(returns: &[f64], mar: f64) -> Result<f64> {
    if returns.is_empty() {
        return Err(RiskError::invalid("downside_deviation", "series has no periods"));
    }

    let sum_sq: f64 = returns
        .iter()
        .filter(|&&r| r < mar)
        .map(|r| r * r)
        .sum();
    Ok((sum_sq / returns.len() as f64).sqrt())
}

/// Downside deviation scaled by `sqrt(periods_per_year)`.
pub fn annualized_downside_deviation(returns: &[f64], mar: f64, periods_per_year: u32) -> Result<f64> {
    Ok(downside_deviation(returns, mar)? * f64::from(periods_per_year).sqrt())
}

/// Downside deviation of every return column of a table, in column order.
pub fn table_downside_deviation(table: &ReturnTable, mar: f64) -> Result<Vec<(String, f64)>> {
    table
        .return_columns()
        .into_iter()
        .map(|name| {
            let series = table.series(&name)?;
            if series.is_empty() {
                return Err(RiskError::invalid(name.as_str(), "series has no periods"));
            }
            Ok((name, downside_deviation(series.values(), mar)?))
        })
        .collect()
}
