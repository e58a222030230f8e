//! Factor risk attribution - share of total variance by factor.
//!
//! Follows the marginal contribution to risk decomposition of Grinold & Kahn:
//!
//! - `factor variance = bᵀ F b`
//! - `total variance = bᵀ F b + Var(ε)`
//! - `contribution_k = b_k (F b)_k / total variance`
//! - `Unexplained = 1 - Σ contribution_k`
//!
//! where `b` are the factor loadings, `F` the factor covariance matrix and `ε`
//! the regression residuals. The contributions sum to one by construction.

use crate::{Result, ReturnTable, RiskError, moments::covariance_matrix_of, regression::FactorFit};
use ndarray::{Array1, Array2, ArrayView1};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Label of the residual share appended after the factors.
pub const UNEXPLAINED: &str = "Unexplained";

/// Share of total variance attributed to one factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    /// Factor label, or [`UNEXPLAINED`]
    pub label: String,
    /// Fraction of total variance
    pub fraction: f64,
}

/// Variance decomposition of one return series over a set of factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAttribution {
    /// Factor contributions in input order, followed by the unexplained share
    pub contributions: Vec<RiskContribution>,
    /// Variance explained by the factors, `bᵀ F b`
    pub factor_variance: f64,
    /// Population variance of the residuals
    pub residual_variance: f64,
    /// Sum of factor and residual variance
    pub total_variance: f64,
}

impl RiskAttribution {
    /// Labels in output order.
    pub fn labels(&self) -> Vec<&str> {
        self.contributions.iter().map(|c| c.label.as_str()).collect()
    }

    /// Fractions in output order.
    pub fn fractions(&self) -> Vec<f64> {
        self.contributions.iter().map(|c| c.fraction).collect()
    }

    /// Fraction attributed to a label.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.contributions
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.fraction)
    }

    /// Residual share of variance.
    pub fn unexplained(&self) -> f64 {
        self.get(UNEXPLAINED).unwrap_or_default()
    }

    /// Render as a two-column DataFrame: `factor`, `contribution`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = df![
            "factor" => self.labels(),
            "contribution" => self.fractions(),
        ]?;
        Ok(df)
    }
}

/// Decompose total variance into factor contributions plus an unexplained share.
///
/// `coefficients`, the rows and columns of `factor_covariance` and `labels`
/// must all follow the same factor order.
///
/// # Errors
/// - [`RiskError::DimensionMismatch`] when shapes disagree
/// - [`RiskError::InvalidInput`] on empty residuals
/// - [`RiskError::DegenerateComputation`] when total variance is not positive
pub fn attribute<S: AsRef<str>>(
    coefficients: &Array1<f64>,
    factor_covariance: &Array2<f64>,
    residuals: &[f64],
    labels: &[S],
) -> Result<RiskAttribution> {
    let k = coefficients.len();
    if factor_covariance.dim() != (k, k) {
        let (rows, cols) = factor_covariance.dim();
        return Err(RiskError::DimensionMismatch {
            context: "factor covariance".to_string(),
            expected: k,
            actual: if rows == k { cols } else { rows },
        });
    }
    if labels.len() != k {
        return Err(RiskError::DimensionMismatch {
            context: "factor labels".to_string(),
            expected: k,
            actual: labels.len(),
        });
    }
    if coefficients.iter().chain(factor_covariance.iter()).any(|v| !v.is_finite()) {
        return Err(RiskError::invalid("attribute", "coefficients and covariance must be finite"));
    }
    if let Some(index) = residuals.iter().position(|v| !v.is_finite()) {
        return Err(RiskError::DataQuality {
            column: "residuals".to_string(),
            index,
        });
    }

    if residuals.is_empty() {
        return Err(RiskError::invalid("attribute", "residual series has no periods"));
    }

    let residual_variance = ArrayView1::from(residuals).var(0.0);
    let marginal = factor_covariance.dot(coefficients);
    let factor_variance = coefficients.dot(&marginal);
    let total_variance = factor_variance + residual_variance;
    if !(total_variance > 0.0 && total_variance.is_finite()) {
        return Err(RiskError::degenerate(
            "attribute",
            format!("total variance is {total_variance}"),
        ));
    }

    let shares = coefficients * &marginal / total_variance;
    let mut contributions: Vec<RiskContribution> = labels
        .iter()
        .zip(shares.iter())
        .map(|(label, &fraction)| RiskContribution {
            label: label.as_ref().to_string(),
            fraction,
        })
        .collect();
    contributions.push(RiskContribution {
        label: UNEXPLAINED.to_string(),
        fraction: 1.0 - shares.sum(),
    });

    debug!(factors = k, total_variance, "attributed factor risk");
    Ok(RiskAttribution {
        contributions,
        factor_variance,
        residual_variance,
        total_variance,
    })
}

/// Sample covariance matrix of the given columns (divide by `N - 1`).
///
/// Every column is checked for missing or non-finite values first.
pub fn covariance_matrix(table: &ReturnTable, columns: &[&str]) -> Result<Array2<f64>> {
    for name in columns {
        table.series(name)?;
    }
    covariance_matrix_of(table.frame(), columns)
}

/// Attribute the risk of a fitted factor model, using the sample covariance of
/// its factor columns in `factors`.
pub fn attribute_fit(fit: &FactorFit, factors: &ReturnTable) -> Result<RiskAttribution> {
    let names: Vec<&str> = fit.factors.iter().map(String::as_str).collect();
    let covariance = covariance_matrix(factors, &names)?;
    let residuals = fit.residuals.to_vec();
    attribute(&fit.betas, &covariance, &residuals, &names)
}
