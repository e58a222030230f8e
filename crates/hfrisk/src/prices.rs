//! Conversion of price histories into period returns.
//!
//! Formula: `r_t = p_t / p_{t-1} - 1`. The first row has no prior price and is
//! dropped, so `N` prices give `N - 1` returns.

use crate::{Result, RiskError, table::column_values};
use polars::prelude::*;

/// Replace a price column by simple period returns.
///
/// Rows are taken in their current order. Every other column of the frame
/// (dates, identifiers) is kept; the price column is replaced by
/// `return_column`.
///
/// # Errors
/// Fails with [`RiskError::InsufficientData`] for fewer than two prices and
/// with [`RiskError::InvalidInput`] for a non-positive price.
pub fn returns_from_prices(frame: &DataFrame, price_column: &str, return_column: &str) -> Result<DataFrame> {
    let prices = column_values(frame, price_column)?;
    if prices.len() < 2 {
        return Err(RiskError::InsufficientData {
            required: 2,
            available: prices.len(),
        });
    }
    if let Some(index) = prices.iter().position(|&p| p <= 0.0) {
        return Err(RiskError::invalid(
            price_column,
            format!("price at row {index} is not positive"),
        ));
    }

    let result = frame
        .clone()
        .lazy()
        .with_column(col(price_column).cast(DataType::Float64).alias(price_column))
        .with_column(col(price_column).shift(lit(1)).alias("price_lag"))
        .with_column(((col(price_column) / col("price_lag")) - lit(1.0)).alias(return_column))
        .filter(col("price_lag").is_not_null())
        .drop(["price_lag", price_column])
        .collect()?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_returns_from_prices() {
        let df = df![
            "date" => ["2024-01-31", "2024-02-29", "2024-03-31"],
            "last" => [100.0, 110.0, 99.0],
        ]
        .unwrap();

        let result = returns_from_prices(&df, "last", "AAPL").unwrap();
        assert_eq!(result.height(), 2);

        let returns = result.column("AAPL").unwrap().f64().unwrap();
        assert_relative_eq!(returns.get(0).unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(returns.get(1).unwrap(), -0.1, epsilon = 1e-12);

        let dates = result.column("date").unwrap().str().unwrap();
        assert_eq!(dates.get(0), Some("2024-02-29"));
        assert!(result.column("last").is_err());
    }

    #[test]
    fn test_integer_prices_are_cast() {
        let df = df![
            "last" => [50i64, 75, 60],
        ]
        .unwrap();
        let result = returns_from_prices(&df, "last", "ret").unwrap();
        let returns = result.column("ret").unwrap().f64().unwrap();
        assert_relative_eq!(returns.get(0).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(returns.get(1).unwrap(), -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_prices() {
        let single = df!["last" => [100.0]].unwrap();
        assert!(matches!(
            returns_from_prices(&single, "last", "ret"),
            Err(RiskError::InsufficientData { .. })
        ));

        let zero = df!["last" => [100.0, 0.0, 50.0]].unwrap();
        assert!(matches!(
            returns_from_prices(&zero, "last", "ret"),
            Err(RiskError::InvalidInput { .. })
        ));
    }
}
