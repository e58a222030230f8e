//! Convexity analysis - quadratic exposure of a return series to a factor.
//!
//! Fits the Treynor-Mazuy style curve `y = b1 x + b2 x²` without an intercept,
//! so the fit measures curvature rather than level. A positive `b2` means the
//! series gains more in large factor moves than a linear exposure would.

use crate::{
    Result, ReturnTable, RiskError,
    regression::fit_ols,
    traits::Configurable,
};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for [`ConvexityAnalysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvexityConfig {
    /// Number of evenly spaced points on the fitted curve.
    pub grid_points: usize,
}

impl Default for ConvexityConfig {
    fn default() -> Self {
        Self { grid_points: 100 }
    }
}

/// Fitted quadratic exposure and the curve evaluated over the factor range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexityFit {
    /// Name of the factor (x) series
    pub factor: String,
    /// Name of the response (y) series
    pub response: String,
    /// `[b1, b2]`: linear and quadratic coefficients
    pub coefficients: [f64; 2],
    /// Evenly spaced factor values from `min(x)` to `max(x)`
    pub fitted_x: Vec<f64>,
    /// Fitted curve at [`Self::fitted_x`]
    pub fitted_y: Vec<f64>,
    /// Observed factor returns
    pub raw_x: Vec<f64>,
    /// Observed response returns
    pub raw_y: Vec<f64>,
}

impl ConvexityFit {
    /// Linear coefficient `b1`.
    pub const fn linear(&self) -> f64 {
        self.coefficients[0]
    }

    /// Quadratic coefficient `b2`.
    pub const fn quadratic(&self) -> f64 {
        self.coefficients[1]
    }

    /// Evaluate the fitted quadratic at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients[0] * x + self.coefficients[1] * x * x
    }

    /// Fitted curve as a DataFrame with columns `x`, `y_hat`.
    pub fn curve_dataframe(&self) -> Result<DataFrame> {
        let df = df![
            "x" => self.fitted_x.as_slice(),
            "y_hat" => self.fitted_y.as_slice(),
        ]?;
        Ok(df)
    }
}

/// Quadratic regression of a response series on a factor.
#[derive(Debug, Clone, Default)]
pub struct ConvexityAnalysis {
    config: ConvexityConfig,
}

impl Configurable for ConvexityAnalysis {
    type Config = ConvexityConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl ConvexityAnalysis {
    /// Create the analysis with a 100-point curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the quadratic for two columns of a table.
    pub fn fit_columns(&self, table: &ReturnTable, factor: &str, response: &str) -> Result<ConvexityFit> {
        let x = table.series(factor)?.into_values();
        let y = table.series(response)?.into_values();
        self.fit_named(factor, response, x, y)
    }

    /// Fit `y = b1 x + b2 x²` and evaluate it over the observed range of `x`.
    ///
    /// # Errors
    /// - [`RiskError::DimensionMismatch`] when the series differ in length
    /// - [`RiskError::InvalidInput`] with fewer than 3 distinct factor values
    pub fn fit(&self, x: &[f64], y: &[f64]) -> Result<ConvexityFit> {
        self.fit_named("x", "y", x.to_vec(), y.to_vec())
    }

    fn fit_named(&self, factor: &str, response: &str, x: Vec<f64>, y: Vec<f64>) -> Result<ConvexityFit> {
        if self.config.grid_points < 2 {
            return Err(RiskError::invalid("ConvexityConfig", "grid_points must be at least 2"));
        }
        if x.len() != y.len() {
            return Err(RiskError::DimensionMismatch {
                context: format!("convexity of {response} on {factor}"),
                expected: x.len(),
                actual: y.len(),
            });
        }
        for (column, values) in [(factor, &x), (response, &y)] {
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(RiskError::DataQuality {
                    column: column.to_string(),
                    index,
                });
            }
        }

        let mut distinct = x.clone();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        if distinct.len() < 3 {
            return Err(RiskError::invalid(
                factor,
                format!(
                    "quadratic fit needs at least 3 distinct factor values, got {}",
                    distinct.len()
                ),
            ));
        }

        let mut design = Array2::<f64>::zeros((x.len(), 2));
        for (i, &xi) in x.iter().enumerate() {
            design[[i, 0]] = xi;
            design[[i, 1]] = xi * xi;
        }
        let fit = fit_ols(&design, &Array1::from(y.clone()))?;
        let coefficients = [fit.coefficients[0], fit.coefficients[1]];

        let (min, max) = (distinct[0], distinct[distinct.len() - 1]);
        let fitted_x = Array1::linspace(min, max, self.config.grid_points).to_vec();
        let fitted_y = fitted_x
            .iter()
            .map(|&v| coefficients[0] * v + coefficients[1] * v * v)
            .collect();

        debug!(factor, response, b1 = coefficients[0], b2 = coefficients[1], "fitted convexity");
        Ok(ConvexityFit {
            factor: factor.to_string(),
            response: response.to_string(),
            coefficients,
            fitted_x,
            fitted_y,
            raw_x: x,
            raw_y: y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn synthetic() -> (Vec<f64>, Vec<f64>) {
        let x = vec![-0.08, -0.05, -0.02, 0.0, 0.01, 0.03, 0.04, 0.07];
        let y = x.iter().map(|v| 2.0 * v + 3.0 * v * v).collect();
        (x, y)
    }

    #[test]
    fn test_recovers_coefficients() {
        let (x, y) = synthetic();
        let fit = ConvexityAnalysis::new().fit(&x, &y).unwrap();

        assert_abs_diff_eq!(fit.linear(), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.quadratic(), 3.0, epsilon = 1e-7);
    }

    #[test]
    fn test_fitted_curve_spans_factor_range() {
        let (x, y) = synthetic();
        let fit = ConvexityAnalysis::new().fit(&x, &y).unwrap();

        assert_eq!(fit.fitted_x.len(), 100);
        assert_eq!(fit.fitted_y.len(), 100);
        assert_abs_diff_eq!(fit.fitted_x[0], -0.08);
        assert_abs_diff_eq!(fit.fitted_x[99], 0.07, epsilon = 1e-15);

        let x0 = fit.fitted_x[0];
        assert_abs_diff_eq!(fit.fitted_y[0], 2.0 * x0 + 3.0 * x0 * x0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.evaluate(0.07), fit.fitted_y[99], epsilon = 1e-12);
        assert_eq!(fit.raw_x, x);
        assert_eq!(fit.raw_y, y);
    }

    #[test]
    fn test_too_few_distinct_values() {
        let x = [0.01, 0.01, -0.02, -0.02];
        let y = [0.02, 0.02, -0.01, -0.01];
        assert!(matches!(
            ConvexityAnalysis::new().fit(&x, &y),
            Err(RiskError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_non_finite_values_name_their_series() {
        let (x, mut y) = synthetic();
        y[2] = f64::NAN;
        let result = ConvexityAnalysis::new().fit(&x, &y);
        assert!(matches!(
            result,
            Err(RiskError::DataQuality { ref column, index: 2 }) if column == "y"
        ));

        let (mut x, y) = synthetic();
        x[5] = f64::INFINITY;
        assert!(matches!(
            ConvexityAnalysis::new().fit(&x, &y),
            Err(RiskError::DataQuality { ref column, index: 5 }) if column == "x"
        ));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            ConvexityAnalysis::new().fit(&[0.01, 0.02, 0.03], &[0.01, 0.02]),
            Err(RiskError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_custom_grid() {
        let (x, y) = synthetic();
        let analysis = ConvexityAnalysis::with_config(ConvexityConfig { grid_points: 5 });
        let fit = analysis.fit(&x, &y).unwrap();

        assert_eq!(fit.fitted_x.len(), 5);
        assert_eq!(analysis.config().grid_points, 5);
    }

    #[test]
    fn test_fit_columns() {
        let (x, y) = synthetic();
        let table = ReturnTable::from_columns(&[("SPX", x), ("Fund", y)]).unwrap();
        let fit = ConvexityAnalysis::new()
            .fit_columns(&table, "SPX", "Fund")
            .unwrap();

        assert_eq!(fit.factor, "SPX");
        assert_eq!(fit.response, "Fund");
        assert_eq!(fit.curve_dataframe().unwrap().height(), 100);
    }
}
