//! Ordinary least squares by Householder QR.
//!
//! Columns of the design matrix are scaled to unit norm before the
//! factorization and the coefficients are unscaled afterwards, so regressors
//! of very different magnitude (a factor and its square) stay well conditioned.
//! A column whose reflected diagonal falls below a relative tolerance makes
//! the fit fail with [`RiskError::RankDeficient`].

use crate::{Result, ReturnTable, RiskError};
use ndarray::{Array1, Array2, Axis, Slice};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Relative tolerance on the diagonal of `R` below which a column is dependent.
const RANK_TOLERANCE: f64 = 1e-10;

/// Result of a least-squares fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    /// Coefficients, one per design column
    pub coefficients: Array1<f64>,
    /// Fitted values `X b`
    pub fitted: Array1<f64>,
    /// Residuals `y - X b`
    pub residuals: Array1<f64>,
}

/// Fit `response ~ design` by least squares without adding an intercept.
///
/// # Errors
/// - [`RiskError::DimensionMismatch`] when row counts differ
/// - [`RiskError::InsufficientData`] with fewer rows than columns
/// - [`RiskError::DataQuality`] on a non-finite input
/// - [`RiskError::RankDeficient`] when columns are linearly dependent
pub fn fit_ols(design: &Array2<f64>, response: &Array1<f64>) -> Result<OlsFit> {
    let (rows, cols) = design.dim();
    if response.len() != rows {
        return Err(RiskError::DimensionMismatch {
            context: "regression response".to_string(),
            expected: rows,
            actual: response.len(),
        });
    }
    if cols == 0 {
        return Err(RiskError::invalid("fit_ols", "design matrix has no columns"));
    }
    if rows < cols {
        return Err(RiskError::InsufficientData {
            required: cols,
            available: rows,
        });
    }
    if let Some(index) = response.iter().position(|v| !v.is_finite()) {
        return Err(RiskError::DataQuality {
            column: "response".to_string(),
            index,
        });
    }
    if let Some(((index, _), _)) = design.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(RiskError::DataQuality {
            column: "design".to_string(),
            index,
        });
    }

    let scales: Array1<f64> = design
        .axis_iter(Axis(1))
        .map(|column| {
            let norm = column.dot(&column).sqrt();
            if norm > 0.0 { norm } else { 1.0 }
        })
        .collect();
    let mut r = design / &scales;
    let mut qty = response.clone();

    for k in 0..cols {
        let mut v = r.column(k).slice_axis_move(Axis(0), Slice::from(k..)).to_owned();
        let norm = v.dot(&v).sqrt();
        if norm == 0.0 {
            continue;
        }
        let alpha = if r[[k, k]] > 0.0 { -norm } else { norm };
        v[0] -= alpha;
        let v_norm_sq = v.dot(&v);
        if v_norm_sq == 0.0 {
            continue;
        }

        for j in k..cols {
            let below = r.column(j).slice_axis_move(Axis(0), Slice::from(k..));
            let projection = 2.0 * v.dot(&below) / v_norm_sq;
            r.column_mut(j)
                .slice_axis_move(Axis(0), Slice::from(k..))
                .scaled_add(-projection, &v);
        }
        let projection = 2.0 * v.dot(&qty.slice_axis(Axis(0), Slice::from(k..))) / v_norm_sq;
        qty.slice_axis_mut(Axis(0), Slice::from(k..))
            .scaled_add(-projection, &v);
    }

    let diagonal_max = (0..cols).map(|k| r[[k, k]].abs()).fold(0.0, f64::max);
    let rank = (0..cols)
        .filter(|&k| r[[k, k]].abs() > RANK_TOLERANCE * diagonal_max)
        .count();
    if rank < cols || diagonal_max == 0.0 {
        return Err(RiskError::RankDeficient {
            rank,
            columns: cols,
        });
    }

    let mut scaled = Array1::<f64>::zeros(cols);
    for k in (0..cols).rev() {
        let tail = r
            .row(k)
            .slice_axis_move(Axis(0), Slice::from(k + 1..))
            .dot(&scaled.slice_axis(Axis(0), Slice::from(k + 1..)));
        scaled[k] = (qty[k] - tail) / r[[k, k]];
    }

    let coefficients = scaled / &scales;
    let fitted = design.dot(&coefficients);
    let residuals = response - &fitted;

    debug!(rows, cols, "fitted least squares");
    Ok(OlsFit {
        coefficients,
        fitted,
        residuals,
    })
}

/// Linear factor model of one return column on a set of factor columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorFit {
    /// Response column
    pub response: String,
    /// Factor columns, in the order of [`Self::betas`]
    pub factors: Vec<String>,
    /// Intercept (alpha), when the model was fitted with one
    pub intercept: Option<f64>,
    /// Factor loadings
    pub betas: Array1<f64>,
    /// Fitted values
    pub fitted: Array1<f64>,
    /// Residual returns
    pub residuals: Array1<f64>,
    /// Coefficient of determination, centered when an intercept is present
    pub r_squared: f64,
}

/// Regress a return column on factor columns of the same table.
pub fn fit_factor_model(
    table: &ReturnTable,
    response: &str,
    factors: &[&str],
    intercept: bool,
) -> Result<FactorFit> {
    if factors.is_empty() {
        return Err(RiskError::invalid("fit_factor_model", "no factor columns given"));
    }

    let y = Array1::from(table.series(response)?.into_values());
    let offset = usize::from(intercept);
    let mut design = Array2::<f64>::zeros((y.len(), factors.len() + offset));
    if intercept {
        design.column_mut(0).fill(1.0);
    }
    for (j, name) in factors.iter().enumerate() {
        let values = table.series(name)?.into_values();
        design.column_mut(j + offset).assign(&Array1::from(values));
    }

    let fit = fit_ols(&design, &y)?;
    let total = if intercept {
        let mean = y.mean().unwrap_or_default();
        y.mapv(|v| (v - mean).powi(2)).sum()
    } else {
        y.dot(&y)
    };
    let r_squared = if total > 0.0 {
        1.0 - fit.residuals.dot(&fit.residuals) / total
    } else {
        0.0
    };

    Ok(FactorFit {
        response: response.to_string(),
        factors: factors.iter().map(|f| (*f).to_string()).collect(),
        intercept: intercept.then(|| fit.coefficients[0]),
        betas: fit
            .coefficients
            .slice_axis(Axis(0), Slice::from(offset..))
            .to_owned(),
        fitted: fit.fitted,
        residuals: fit.residuals,
        r_squared,
    })
}
