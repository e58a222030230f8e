//! Drawdown engine - underwater curve and maximum drawdown.
//!
//! Drawdown at period `t` compares the growth of a unit investment with its
//! running peak:
//!
//! `DD_t = G_t / max(G_0..=G_t) - 1`, where `G_t = Π_{i<=t} (1 + r_i)`
//!
//! The first period has no prior peak, so `DD_0 = G_0 - 1 = r_0`, which is
//! positive after a gain. Every later value is at most zero. Once wealth is
//! wiped out (`G = 0`) the curve stays at `-1`; growth below zero means a loss
//! of more than the whole investment and has no drawdown.

use crate::{Result, RiskError, cumulative::growth_curve};

/// Underwater curve of a return series, one value per period.
///
/// # Errors
/// - [`RiskError::InvalidInput`] on an empty series
/// - [`RiskError::DegenerateComputation`] when growth turns negative
pub fn drawdowns(returns: &[f64]) -> Result<Vec<f64>> {
    if returns.is_empty() {
        return Err(RiskError::invalid("drawdowns", "series has no periods"));
    }

    let growth = growth_curve(returns);
    if let Some(index) = growth.iter().position(|&g| g < 0.0) {
        return Err(RiskError::degenerate(
            "drawdowns",
            format!("growth at period {index} is negative"),
        ));
    }

    let mut peak = growth[0];
    let mut result = Vec::with_capacity(growth.len());
    result.push(growth[0] - 1.0);

    for &g in &growth[1..] {
        peak = peak.max(g);
        result.push(if peak > 0.0 { g / peak - 1.0 } else { -1.0 });
    }

    Ok(result)
}

/// Maximum drawdown: the deepest point of the underwater curve, never positive.
///
/// A single gaining period, or a series that never falls below a prior peak,
/// has a maximum drawdown of zero.
pub fn max_drawdown(returns: &[f64]) -> Result<f64> {
    let curve = drawdowns(returns)?;
    Ok(curve.into_iter().fold(0.0, f64::min))
}
