//! Regime analysis - mean returns conditioned on a market regime label.
//!
//! Periods are grouped by the table's regime column and every return column is
//! averaged within each group. Regimes are reported in sorted label order.

use crate::{Result, ReturnTable, RiskError, table::column_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mean return of every column within every regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeMeans {
    regime_column: String,
    columns: Vec<String>,
    regimes: Vec<(String, Vec<f64>)>,
}

impl RegimeMeans {
    /// Return columns, in table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Regime labels in sorted order.
    pub fn regimes(&self) -> impl Iterator<Item = &str> {
        self.regimes.iter().map(|(label, _)| label.as_str())
    }

    /// Mean vector of a regime, aligned with [`Self::columns`].
    pub fn get(&self, regime: &str) -> Option<&[f64]> {
        self.regimes
            .iter()
            .find(|(label, _)| label == regime)
            .map(|(_, means)| means.as_slice())
    }

    /// Mean return of one column within one regime.
    pub fn mean(&self, regime: &str, column: &str) -> Option<f64> {
        let position = self.columns.iter().position(|c| c == column)?;
        self.get(regime).map(|means| means[position])
    }

    /// Render as a DataFrame: the regime column followed by one mean column per asset.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::new(
            self.regime_column.as_str().into(),
            self.regimes().collect::<Vec<_>>(),
        ));
        for (position, name) in self.columns.iter().enumerate() {
            let means = self
                .regimes
                .iter()
                .map(|(_, means)| means[position])
                .collect::<Vec<_>>();
            columns.push(Column::new(name.as_str().into(), means));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Group the table's periods by regime and average each return column.
///
/// # Errors
/// Fails when the table has no regime column, when a regime label is missing,
/// or when a return column contains a missing or non-finite value.
pub fn by_regime(table: &ReturnTable) -> Result<RegimeMeans> {
    let regime = table
        .regime_column()
        .ok_or_else(|| RiskError::invalid("by_regime", "table has no regime column"))?;
    let frame = table.frame();

    let labels = frame.column(regime)?.cast(&DataType::String)?;
    if let Some(index) = labels.str()?.into_iter().position(|label| label.is_none()) {
        return Err(RiskError::DataQuality {
            column: regime.to_string(),
            index,
        });
    }

    let columns = table.return_columns();
    for name in &columns {
        column_values(frame, name)?;
    }

    let grouped = frame
        .clone()
        .lazy()
        .group_by([col(regime)])
        .agg(
            columns
                .iter()
                .map(|name| col(name.as_str()).cast(DataType::Float64).mean())
                .collect::<Vec<_>>(),
        )
        .sort([regime], SortMultipleOptions::default())
        .collect()?;

    let label_column = grouped.column(regime)?.cast(&DataType::String)?;
    let labels: Vec<String> = label_column
        .str()?
        .into_iter()
        .map(|label| label.unwrap_or_default().to_string())
        .collect();

    let mut regimes: Vec<(String, Vec<f64>)> = labels
        .into_iter()
        .map(|label| (label, Vec::with_capacity(columns.len())))
        .collect();
    for name in &columns {
        for (row, mean) in column_values(&grouped, name)?.into_iter().enumerate() {
            regimes[row].1.push(mean);
        }
    }

    debug!(regime_column = %regime, regimes = regimes.len(), "computed regime means");
    Ok(RegimeMeans {
        regime_column: regime.to_string(),
        columns,
        regimes,
    })
}
