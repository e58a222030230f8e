//! Cumulative return utilities.
//!
//! Compounds period returns into the growth of a unit investment (the VAMI
//! curve before scaling). Drawdowns and annualized returns are built on top.

use crate::{Result, RiskError};

/// Growth factors `Π_{i<=t} (1 + r_i)` for every period.
pub fn growth_curve(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |growth, r| {
            *growth *= 1.0 + r;
            Some(*growth)
        })
        .collect()
}

/// Ending value of a unit investment: `Π (1 + r)`.
///
/// # Errors
/// Fails with [`RiskError::InvalidInput`] on an empty series.
pub fn terminal_growth(returns: &[f64]) -> Result<f64> {
    if returns.is_empty() {
        return Err(RiskError::invalid("terminal_growth", "series has no periods"));
    }
    Ok(returns.iter().map(|r| 1.0 + r).product())
}

/// Total compounded return: `terminal_growth - 1`.
pub fn cumulative_return(returns: &[f64]) -> Result<f64> {
    Ok(terminal_growth(returns)? - 1.0)
}
