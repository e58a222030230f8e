//! Sample moments of return columns, evaluated as polars expressions.
//!
//! Dispersion uses the population convention (divide by `N`) and the shape
//! statistics are the biased moment estimators:
//!
//! - `skew = m3 / m2^1.5`
//! - `excess kurtosis = m4 / m2^2 - 3`
//!
//! where `m_k = mean((r - mean)^k)`. Covariances between columns divide by
//! `N - 1`.

use crate::{Result, ReturnSeries, RiskError};
use ndarray::Array2;
use polars::prelude::*;

/// Location, dispersion and shape of one return column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnMoments {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Biased skewness; `None` for a constant column
    pub skew: Option<f64>,
    /// Biased excess kurtosis; `None` for a constant column
    pub kurtosis: Option<f64>,
}

fn float(name: &str) -> Expr {
    col(name).cast(DataType::Float64)
}

fn centered(name: &str) -> Expr {
    float(name) - float(name).mean()
}

/// Moments of a single series.
pub fn series_moments(series: &ReturnSeries) -> Result<ColumnMoments> {
    let frame = DataFrame::new(vec![Column::new(series.name().into(), series.values())])?;
    column_moments(&frame, &[series.name()])?
        .pop()
        .ok_or_else(|| RiskError::invalid(series.name(), "series has no periods"))
}

/// Moments of several columns, computed in one lazy `select`.
///
/// Columns must already be free of nulls and non-finite values, as
/// guaranteed by [`ReturnTable::series`](crate::ReturnTable::series).
pub(crate) fn column_moments(frame: &DataFrame, columns: &[&str]) -> Result<Vec<ColumnMoments>> {
    if frame.height() == 0 {
        return Err(RiskError::invalid("moments", "series has no periods"));
    }
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let exprs: Vec<Expr> = columns
        .iter()
        .enumerate()
        .flat_map(|(i, name)| {
            [
                float(name).mean().alias(format!("mean_{i}")),
                centered(name).pow(2.0).mean().alias(format!("m2_{i}")),
                centered(name).pow(3.0).mean().alias(format!("m3_{i}")),
                centered(name).pow(4.0).mean().alias(format!("m4_{i}")),
            ]
        })
        .collect();
    let stats = frame.clone().lazy().select(exprs).collect()?;

    (0..columns.len())
        .map(|i| {
            let m2 = scalar(&stats, &format!("m2_{i}"))?;
            let (skew, kurtosis) = if m2 > 0.0 {
                let m3 = scalar(&stats, &format!("m3_{i}"))?;
                let m4 = scalar(&stats, &format!("m4_{i}"))?;
                (Some(m3 / m2.powf(1.5)), Some(m4 / (m2 * m2) - 3.0))
            } else {
                (None, None)
            };
            Ok(ColumnMoments {
                mean: scalar(&stats, &format!("mean_{i}"))?,
                std: m2.sqrt(),
                skew,
                kurtosis,
            })
        })
        .collect()
}

/// Sample covariance matrix of columns of a frame, in column order.
///
/// Same precondition on the values as [`column_moments`].
pub(crate) fn covariance_matrix_of(frame: &DataFrame, columns: &[&str]) -> Result<Array2<f64>> {
    let n = frame.height();
    if n < 2 {
        return Err(RiskError::InsufficientData {
            required: 2,
            available: n,
        });
    }

    let k = columns.len();
    let mut covariance = Array2::<f64>::zeros((k, k));
    if k == 0 {
        return Ok(covariance);
    }

    let denominator = lit((n - 1) as f64);
    let mut exprs = Vec::with_capacity(k * (k + 1) / 2);
    for i in 0..k {
        for j in i..k {
            exprs.push(
                ((centered(columns[i]) * centered(columns[j])).sum() / denominator.clone())
                    .alias(format!("cov_{i}_{j}")),
            );
        }
    }
    let stats = frame.clone().lazy().select(exprs).collect()?;

    for i in 0..k {
        for j in i..k {
            let value = scalar(&stats, &format!("cov_{i}_{j}"))?;
            covariance[[i, j]] = value;
            covariance[[j, i]] = value;
        }
    }
    Ok(covariance)
}

fn scalar(stats: &DataFrame, name: &str) -> Result<f64> {
    stats
        .column(name)?
        .f64()?
        .get(0)
        .ok_or_else(|| RiskError::degenerate(name, "statistic is undefined"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn moments_of(values: &[f64]) -> ColumnMoments {
        series_moments(&ReturnSeries::new("r", values.to_vec()).unwrap()).unwrap()
    }

    #[test]
    fn test_mean_and_population_std() {
        let m = moments_of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_relative_eq!(m.mean, 5.0, epsilon = 1e-12);
        assert_relative_eq!(m.std, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_series_has_zero_skew() {
        let skew = moments_of(&[-0.02, -0.01, 0.0, 0.01, 0.02]).skew.unwrap();
        assert!(skew.abs() < 1e-12);
    }

    #[test]
    fn test_skew_sign() {
        // Long left tail
        let skew = moments_of(&[0.01, 0.01, 0.02, 0.01, -0.10]).skew.unwrap();
        assert!(skew < 0.0);
    }

    #[test]
    fn test_two_point_kurtosis() {
        // A symmetric two-point distribution has m4 / m2^2 = 1.
        let kurt = moments_of(&[-1.0, 1.0, -1.0, 1.0]).kurtosis.unwrap();
        assert_relative_eq!(kurt, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_series_has_no_shape_moments() {
        let m = moments_of(&[0.25, 0.25, 0.25]);
        assert_eq!(m.std, 0.0);
        assert_eq!(m.skew, None);
        assert_eq!(m.kurtosis, None);
    }

    #[test]
    fn test_several_columns_in_order() {
        let frame = df![
            "A" => [1.0, 2.0, 3.0, 4.0],
            "B" => [10i64, 10, 10, 10],
        ]
        .unwrap();
        let moments = column_moments(&frame, &["B", "A"]).unwrap();

        assert_eq!(moments.len(), 2);
        assert_relative_eq!(moments[0].mean, 10.0);
        assert_eq!(moments[0].skew, None);
        assert_relative_eq!(moments[1].mean, 2.5, epsilon = 1e-12);
        assert_relative_eq!(moments[1].std, 1.25_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_sample_covariance_matrix() {
        let frame = df![
            "x" => [1.0, 2.0, 3.0, 4.0],
            "y" => [2.0, 4.0, 6.0, 8.0],
        ]
        .unwrap();
        let cov = covariance_matrix_of(&frame, &["x", "y"]).unwrap();

        // var(x) with n - 1 is 5/3 and y = 2x
        assert_relative_eq!(cov[[0, 0]], 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[0, 1]], 10.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[1, 0]], cov[[0, 1]]);
        assert_relative_eq!(cov[[1, 1]], array![2.0, 4.0, 6.0, 8.0].var(1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_needs_two_periods() {
        let frame = df!["x" => [1.0]].unwrap();
        assert!(matches!(
            covariance_matrix_of(&frame, &["x"]),
            Err(RiskError::InsufficientData { required: 2, available: 1 })
        ));
    }

    #[test]
    fn test_empty_series_rejected() {
        let series = ReturnSeries::new("r", Vec::new()).unwrap();
        assert!(matches!(
            series_moments(&series),
            Err(RiskError::InvalidInput { .. })
        ));
    }
}
