//! Basic statistics aggregator - one summary record per return column.
//!
//! For a column with `N` periods and `P` periods per year:
//!
//! - `annualized_volatility = std * sqrt(P)`
//! - `growth = Π (1 + r)`, `vami = vami_base * growth`
//! - `annualized_return = growth^(P/N) - 1`
//! - `monthly_equivalent_return = growth^(1/N) - 1`
//! - `sharpe = annualized_return / annualized_volatility`
//! - `var_95 = mean - z * std` (parametric, one period)
//! - `sortino = monthly_equivalent_return * P / annualized_downside_deviation`
//!
//! A failure in one column is reported next to the successful records instead
//! of aborting the whole table.

use crate::{
    Result, ReturnSeries, ReturnTable, RiskError,
    cumulative::terminal_growth,
    downside::annualized_downside_deviation,
    drawdown::max_drawdown,
    moments::{ColumnMoments, column_moments, series_moments},
    traits::{Configurable, PeriodFrequency},
};
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Which growth figure feeds the monthly-equivalent return and Sortino ratio.
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonthlyReturnBasis {
    /// Each column uses its own compounded growth
    #[default]
    PerColumn,
    /// Every column shares the value computed from the last column of the table
    LastColumn,
}

/// Configuration for [`SummaryStatistics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Number of return periods in one year (12 for monthly data).
    pub periods_per_year: u32,
    /// Threshold below which a period counts as downside.
    pub minimum_acceptable_return: f64,
    /// Normal quantile used by the parametric VaR.
    pub var_z_score: f64,
    /// Starting value of the VAMI index.
    pub vami_base: f64,
    /// Source of the monthly-equivalent return.
    pub monthly_return_basis: MonthlyReturnBasis,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: PeriodFrequency::Monthly.periods_per_year(),
            minimum_acceptable_return: 0.0,
            var_z_score: 1.96,
            vami_base: 1000.0,
            monthly_return_basis: MonthlyReturnBasis::PerColumn,
        }
    }
}

impl StatsConfig {
    /// Default configuration annualizing at the given frequency.
    pub fn for_frequency(frequency: PeriodFrequency) -> Self {
        Self {
            periods_per_year: frequency.periods_per_year(),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that the parameters describe a usable annualization.
    pub fn validate(&self) -> Result<()> {
        if self.periods_per_year == 0 {
            return Err(RiskError::invalid("StatsConfig", "periods_per_year must be positive"));
        }
        if !(self.vami_base.is_finite() && self.vami_base > 0.0) {
            return Err(RiskError::invalid("StatsConfig", "vami_base must be positive"));
        }
        if !self.var_z_score.is_finite() {
            return Err(RiskError::invalid("StatsConfig", "var_z_score must be finite"));
        }
        if self.minimum_acceptable_return.is_nan() {
            return Err(RiskError::invalid("StatsConfig", "minimum_acceptable_return is NaN"));
        }
        Ok(())
    }
}

/// Risk and performance statistics of one return column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Column the record belongs to
    pub asset: String,
    /// Number of periods
    pub periods: usize,
    /// Mean period return
    pub mean: f64,
    /// Population standard deviation of period returns
    pub std: f64,
    /// Standard deviation scaled to one year
    pub annualized_volatility: f64,
    /// Geometric annualized return
    pub annualized_return: f64,
    /// Total compounded return
    pub cumulative_return: f64,
    /// Annualized return over annualized volatility; `None` for zero volatility
    pub sharpe: Option<f64>,
    /// Ending value of the VAMI index
    pub vami: f64,
    /// Parametric one-period value at risk
    pub var_95: f64,
    /// Sample skewness; `None` for a constant series
    pub skew: Option<f64>,
    /// Sample excess kurtosis; `None` for a constant series
    pub kurtosis: Option<f64>,
    /// Deepest drawdown, never positive
    pub max_drawdown: f64,
    /// Annualized downside deviation below the MAR
    pub downside_deviation: f64,
    /// Sortino ratio; `None` when there is no downside deviation
    pub sortino: Option<f64>,
    /// Constant period return that compounds to the same growth
    pub monthly_equivalent_return: f64,
}

/// A column that could not be summarized.
#[derive(Debug)]
pub struct ColumnFailure {
    /// Column name
    pub column: String,
    /// Why the column failed
    pub error: RiskError,
}

/// Summary of a whole return table.
#[derive(Debug, Default)]
pub struct TableSummary {
    /// Records of the columns that succeeded, in input column order
    pub records: Vec<SummaryRecord>,
    /// Columns that failed, in input column order
    pub failures: Vec<ColumnFailure>,
}

impl TableSummary {
    /// Whether every column was summarized.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Record for a given column.
    pub fn get(&self, asset: &str) -> Option<&SummaryRecord> {
        self.records.iter().find(|r| r.asset == asset)
    }

    /// Render the records as a DataFrame, one row per asset.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let records = self.records.as_slice();
        let columns = vec![
            Column::new("asset".into(), metric(records, |r| r.asset.as_str())),
            Column::new("periods".into(), metric(records, |r| r.periods as u64)),
            Column::new("mean".into(), metric(records, |r| r.mean)),
            Column::new("std".into(), metric(records, |r| r.std)),
            Column::new("annvol".into(), metric(records, |r| r.annualized_volatility)),
            Column::new("annret".into(), metric(records, |r| r.annualized_return)),
            Column::new("cumret".into(), metric(records, |r| r.cumulative_return)),
            Column::new("sharpe".into(), metric(records, |r| r.sharpe)),
            Column::new("vami".into(), metric(records, |r| r.vami)),
            Column::new("var_95".into(), metric(records, |r| r.var_95)),
            Column::new("skew".into(), metric(records, |r| r.skew)),
            Column::new("kurt".into(), metric(records, |r| r.kurtosis)),
            Column::new("maxdd".into(), metric(records, |r| r.max_drawdown)),
            Column::new("dn_dev".into(), metric(records, |r| r.downside_deviation)),
            Column::new("sortino".into(), metric(records, |r| r.sortino)),
            Column::new("mon_ret".into(), metric(records, |r| r.monthly_equivalent_return)),
        ];

        Ok(DataFrame::new(columns)?)
    }
}

/// Per-column summary statistics of a return table.
#[derive(Debug, Clone, Default)]
pub struct SummaryStatistics {
    config: StatsConfig,
}

impl Configurable for SummaryStatistics {
    type Config = StatsConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl SummaryStatistics {
    /// Create the aggregator with monthly defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarize a single series using its own growth for the monthly return.
    pub fn summarize_series(&self, series: &ReturnSeries) -> Result<SummaryRecord> {
        self.config.validate()?;
        if series.is_empty() {
            return Err(RiskError::invalid(series.name(), "series has no periods"));
        }
        self.record(series, series_moments(series)?, None)
    }

    /// Summarize every return column of the table.
    ///
    /// Moments of all readable columns come from a single lazy `select` over
    /// the frame. Columns that fail are collected in
    /// [`TableSummary::failures`]. With [`MonthlyReturnBasis::LastColumn`] the
    /// whole call fails if the last column cannot provide the shared monthly
    /// return.
    pub fn summarize(&self, table: &ReturnTable) -> Result<TableSummary> {
        self.config.validate()?;

        let columns = table.return_columns();
        let Some(last) = columns.last() else {
            return Err(RiskError::invalid("summarize", "table has no return columns"));
        };
        let shared_monthly = match self.config.monthly_return_basis {
            MonthlyReturnBasis::PerColumn => None,
            MonthlyReturnBasis::LastColumn => {
                let series = table.series(last)?;
                Some(monthly_equivalent(last, series.values())?)
            }
        };

        let extracted: Vec<Result<ReturnSeries>> =
            columns.iter().map(|name| table.series(name)).collect();
        let readable: Vec<&str> = extracted
            .iter()
            .filter_map(|series| series.as_ref().ok().map(ReturnSeries::name))
            .collect();
        let mut moments = if readable.is_empty() || table.periods() == 0 {
            Vec::new()
        } else {
            column_moments(table.frame(), &readable)?
        }
        .into_iter();

        let mut summary = TableSummary::default();
        for (name, series) in columns.into_iter().zip(extracted) {
            let outcome = series.and_then(|series| {
                let column = moments
                    .next()
                    .ok_or_else(|| RiskError::invalid(series.name(), "series has no periods"))?;
                self.record(&series, column, shared_monthly)
            });
            match outcome {
                Ok(record) => summary.records.push(record),
                Err(error) => {
                    warn!(column = %name, %error, "excluding column from summary");
                    summary.failures.push(ColumnFailure {
                        column: name,
                        error,
                    });
                }
            }
        }

        debug!(
            computed = summary.records.len(),
            failed = summary.failures.len(),
            "summarized return table"
        );
        Ok(summary)
    }

    fn record(
        &self,
        series: &ReturnSeries,
        moments: ColumnMoments,
        shared_monthly: Option<f64>,
    ) -> Result<SummaryRecord> {
        let name = series.name();
        let values = series.values();
        if values.is_empty() {
            return Err(RiskError::invalid(name, "series has no periods"));
        }

        let n = values.len() as f64;
        let periods_per_year = f64::from(self.config.periods_per_year);

        let ColumnMoments {
            mean: mu,
            std,
            skew,
            kurtosis,
        } = moments;
        let annualized_volatility = std * periods_per_year.sqrt();

        let growth = checked_growth(name, values)?;
        let annualized_return = growth.powf(periods_per_year / n) - 1.0;
        let monthly_equivalent_return = match shared_monthly {
            Some(value) => value,
            None => growth.powf(1.0 / n) - 1.0,
        };

        let downside_deviation = annualized_downside_deviation(
            values,
            self.config.minimum_acceptable_return,
            self.config.periods_per_year,
        )?;

        let record = SummaryRecord {
            asset: name.to_string(),
            periods: values.len(),
            mean: mu,
            std,
            annualized_volatility,
            annualized_return,
            cumulative_return: growth - 1.0,
            sharpe: ratio(annualized_return, annualized_volatility),
            vami: growth * self.config.vami_base,
            var_95: mu - self.config.var_z_score * std,
            skew,
            kurtosis,
            max_drawdown: max_drawdown(values)?,
            downside_deviation,
            sortino: ratio(monthly_equivalent_return * periods_per_year, downside_deviation),
            monthly_equivalent_return,
        };

        debug!(column = %name, periods = record.periods, "computed summary statistics");
        Ok(record)
    }
}

fn checked_growth(name: &str, values: &[f64]) -> Result<f64> {
    let growth = terminal_growth(values).map_err(|_| RiskError::invalid(name, "series has no periods"))?;
    if growth < 0.0 {
        return Err(RiskError::degenerate(
            name,
            format!("terminal growth {growth} is negative, annualized return is not real"),
        ));
    }
    Ok(growth)
}

fn monthly_equivalent(name: &str, values: &[f64]) -> Result<f64> {
    let growth = checked_growth(name, values)?;
    Ok(growth.powf(1.0 / values.len() as f64) - 1.0)
}

fn metric<'a, T>(records: &'a [SummaryRecord], pick: impl Fn(&'a SummaryRecord) -> T) -> Vec<T> {
    records.iter().map(pick).collect()
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn fund_table() -> ReturnTable {
        ReturnTable::from_columns(&[
            ("Fund", vec![0.1, -0.05, 0.02]),
            ("SPX", vec![0.01, 0.03, -0.02]),
        ])
        .unwrap()
    }

    #[test]
    fn test_record_values() {
        let summary = SummaryStatistics::new().summarize(&fund_table()).unwrap();
        assert!(summary.is_complete());

        let fund = summary.get("Fund").unwrap();
        let growth: f64 = 1.1 * 0.95 * 1.02;
        let mu: f64 = (0.1 - 0.05 + 0.02) / 3.0;
        let std = (((0.1 - mu).powi(2) + (-0.05 - mu).powi(2) + (0.02 - mu).powi(2)) / 3.0_f64).sqrt();
        let annvol = std * 12.0_f64.sqrt();
        let annret = growth.powf(4.0) - 1.0;
        let mon_ret = growth.powf(1.0 / 3.0) - 1.0;
        let dn_dev = (0.0025_f64 / 3.0).sqrt() * 12.0_f64.sqrt();

        assert_eq!(fund.periods, 3);
        assert_relative_eq!(fund.mean, mu, epsilon = 1e-12);
        assert_relative_eq!(fund.std, std, epsilon = 1e-12);
        assert_relative_eq!(fund.annualized_volatility, annvol, epsilon = 1e-12);
        assert_relative_eq!(fund.annualized_return, annret, epsilon = 1e-12);
        assert_relative_eq!(fund.cumulative_return, growth - 1.0, epsilon = 1e-12);
        assert_relative_eq!(fund.vami, 1000.0 * growth, epsilon = 1e-9);
        assert_relative_eq!(fund.sharpe.unwrap(), annret / annvol, epsilon = 1e-12);
        assert_relative_eq!(fund.var_95, mu - 1.96 * std, epsilon = 1e-12);
        assert_relative_eq!(fund.max_drawdown, -0.05, epsilon = 1e-12);
        assert_relative_eq!(fund.downside_deviation, dn_dev, epsilon = 1e-12);
        assert_relative_eq!(fund.monthly_equivalent_return, mon_ret, epsilon = 1e-12);
        assert_relative_eq!(fund.sortino.unwrap(), mon_ret * 12.0 / dn_dev, epsilon = 1e-12);
    }

    #[test]
    fn test_records_keep_column_order() {
        let summary = SummaryStatistics::new().summarize(&fund_table()).unwrap();
        let assets: Vec<_> = summary.records.iter().map(|r| r.asset.as_str()).collect();
        assert_eq!(assets, vec!["Fund", "SPX"]);
    }

    #[test]
    fn test_last_column_basis_shares_monthly_return() {
        let config = StatsConfig {
            monthly_return_basis: MonthlyReturnBasis::LastColumn,
            ..StatsConfig::default()
        };
        let summary = SummaryStatistics::with_config(config)
            .summarize(&fund_table())
            .unwrap();

        let spx_growth: f64 = 1.01 * 1.03 * 0.98;
        let shared = spx_growth.powf(1.0 / 3.0) - 1.0;
        for record in &summary.records {
            assert_relative_eq!(record.monthly_equivalent_return, shared, epsilon = 1e-12);
        }

        let fund = summary.get("Fund").unwrap();
        assert_relative_eq!(
            fund.sortino.unwrap(),
            shared * 12.0 / fund.downside_deviation,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_failing_column_is_isolated() {
        let frame = df![
            "Good" => [0.01, 0.02, -0.01],
            "Gap" => [Some(0.01), None, Some(0.02)],
            "Blowup" => [0.1, -1.5, 0.1],
        ]
        .unwrap();
        let summary = SummaryStatistics::new()
            .summarize(&ReturnTable::new(frame))
            .unwrap();

        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.records[0].asset, "Good");
        assert_eq!(summary.failures.len(), 2);
        assert!(matches!(
            summary.failures[0].error,
            RiskError::DataQuality { index: 1, .. }
        ));
        assert_eq!(summary.failures[1].column, "Blowup");
        assert!(matches!(
            summary.failures[1].error,
            RiskError::DegenerateComputation { .. }
        ));
    }

    #[rstest]
    #[case(MonthlyReturnBasis::PerColumn)]
    #[case(MonthlyReturnBasis::LastColumn)]
    fn test_table_without_return_columns_rejected(#[case] basis: MonthlyReturnBasis) {
        let table = ReturnTable::new(df!["Regime" => ["bull", "bear"]].unwrap())
            .with_regime_column("Regime")
            .unwrap();
        let config = StatsConfig {
            monthly_return_basis: basis,
            ..StatsConfig::default()
        };

        assert!(matches!(
            SummaryStatistics::with_config(config).summarize(&table),
            Err(RiskError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_last_column_failure_aborts_shared_basis() {
        let table = ReturnTable::from_columns(&[
            ("Fund", vec![0.01, 0.02, -0.01]),
            ("Blowup", vec![0.1, -1.5, 0.1]),
        ])
        .unwrap();
        let config = StatsConfig {
            monthly_return_basis: MonthlyReturnBasis::LastColumn,
            ..StatsConfig::default()
        };

        assert!(matches!(
            SummaryStatistics::with_config(config).summarize(&table),
            Err(RiskError::DegenerateComputation { .. })
        ));

        // The default basis isolates the same column instead.
        let summary = SummaryStatistics::new().summarize(&table).unwrap();
        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.failures[0].column, "Blowup");
    }

    #[test]
    fn test_no_downside_gives_no_sortino() {
        let series = ReturnSeries::new("Steady", vec![0.01, 0.02, 0.015]).unwrap();
        let record = SummaryStatistics::new().summarize_series(&series).unwrap();

        assert_eq!(record.downside_deviation, 0.0);
        assert_eq!(record.sortino, None);
        assert_eq!(record.max_drawdown, 0.0);
    }

    #[test]
    fn test_constant_series_has_no_sharpe() {
        let series = ReturnSeries::new("Flat", vec![0.0; 4]).unwrap();
        let record = SummaryStatistics::new().summarize_series(&series).unwrap();

        assert_eq!(record.sharpe, None);
        assert_eq!(record.skew, None);
        assert_eq!(record.kurtosis, None);
    }

    #[test]
    fn test_periods_per_year_drives_annualization() {
        let series = ReturnSeries::new("Daily", vec![0.001, -0.002, 0.003, 0.0005]).unwrap();
        let daily = SummaryStatistics::with_config(StatsConfig::for_frequency(PeriodFrequency::Daily))
            .summarize_series(&series)
            .unwrap();

        assert_relative_eq!(
            daily.annualized_volatility,
            daily.std * 252.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_config_from_json() {
        let config = StatsConfig::from_json_str(r#"{ "periods_per_year": 4, "vami_base": 100.0 }"#)
            .unwrap();
        assert_eq!(config.periods_per_year, 4);
        assert_eq!(config.vami_base, 100.0);
        assert_eq!(config.var_z_score, 1.96);
        assert_eq!(config.monthly_return_basis, MonthlyReturnBasis::PerColumn);

        assert!(StatsConfig::from_json_str(r#"{ "periods_per_year": 0 }"#).is_err());
    }

    #[test]
    fn test_to_dataframe() {
        let summary = SummaryStatistics::new().summarize(&fund_table()).unwrap();
        let df = summary.to_dataframe().unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 16);
        let maxdd = df.column("maxdd").unwrap().f64().unwrap();
        assert_relative_eq!(maxdd.get(0).unwrap(), -0.05, epsilon = 1e-12);
    }
}
