//! Return tables and the series extracted from them.
//!
//! A [`ReturnTable`] wraps a polars [`DataFrame`] whose rows are periods and
//! whose columns are assets or factors. One column may be designated as the
//! period index (dates) and one as the regime label; every other column is
//! treated as a return series, in input order.

use crate::{Result, RiskError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Ordered period returns of a single asset or factor.
///
/// Values are fractional returns (0.01 = 1%) and always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    name: String,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Create a series, rejecting non-finite values.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(RiskError::DataQuality {
                column: name,
                index,
            });
        }
        Ok(Self { name, values })
    }

    /// Column name of the series.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Period returns.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no periods.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the series and return its values.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Period-indexed table of return columns with optional index and regime columns.
#[derive(Debug, Clone)]
pub struct ReturnTable {
    frame: DataFrame,
    index_column: Option<String>,
    regime_column: Option<String>,
}

impl ReturnTable {
    /// Wrap a DataFrame in which every column is a return column.
    pub const fn new(frame: DataFrame) -> Self {
        Self {
            frame,
            index_column: None,
            regime_column: None,
        }
    }

    /// Build a table from named return vectors of equal length.
    pub fn from_columns<S: AsRef<str>>(columns: &[(S, Vec<f64>)]) -> Result<Self> {
        let columns = columns
            .iter()
            .map(|(name, values)| Column::new(name.as_ref().into(), values.as_slice()))
            .collect::<Vec<_>>();
        Ok(Self::new(DataFrame::new(columns)?))
    }

    /// Designate the period index column (dates or integers).
    pub fn with_index_column(mut self, name: &str) -> Result<Self> {
        self.require_column(name)?;
        self.index_column = Some(name.to_string());
        Ok(self)
    }

    /// Designate the categorical regime column.
    pub fn with_regime_column(mut self, name: &str) -> Result<Self> {
        self.require_column(name)?;
        self.regime_column = Some(name.to_string());
        Ok(self)
    }

    /// Underlying DataFrame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Name of the period index column, if any.
    pub fn index_column(&self) -> Option<&str> {
        self.index_column.as_deref()
    }

    /// Name of the regime column, if any.
    pub fn regime_column(&self) -> Option<&str> {
        self.regime_column.as_deref()
    }

    /// Number of periods (rows).
    pub fn periods(&self) -> usize {
        self.frame.height()
    }

    /// Return column names in input order.
    pub fn return_columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| {
                Some(name.as_str()) != self.index_column() && Some(name.as_str()) != self.regime_column()
            })
            .collect()
    }

    /// Extract a return column as a [`ReturnSeries`].
    ///
    /// The column is cast to `Float64`; a null or non-finite entry fails with
    /// [`RiskError::DataQuality`].
    pub fn series(&self, name: &str) -> Result<ReturnSeries> {
        let values = column_values(&self.frame, name)?;
        ReturnSeries::new(name, values)
    }

    /// Restrict the table to the given return columns, keeping the index column.
    pub fn select(&self, columns: &[&str]) -> Result<Self> {
        let mut names: Vec<String> = Vec::with_capacity(columns.len() + 1);
        if let Some(index) = self.index_column() {
            names.push(index.to_string());
        }
        for name in columns {
            self.require_column(name)?;
            names.push((*name).to_string());
        }

        Ok(Self {
            frame: self.frame.select(names)?,
            index_column: self.index_column.clone(),
            regime_column: None,
        })
    }

    fn require_column(&self, name: &str) -> Result<()> {
        if self.frame.column(name).is_err() {
            return Err(RiskError::MissingColumn(name.to_string()));
        }
        Ok(())
    }
}

/// Read a numeric column as `f64` values, failing on nulls and non-finite entries.
pub(crate) fn column_values(frame: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = frame
        .column(name)
        .map_err(|_| RiskError::MissingColumn(name.to_string()))?;
    let cast = column.cast(&DataType::Float64)?;
    let values = cast.f64()?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(RiskError::DataQuality {
                column: name.to_string(),
                index,
            }),
        })
        .collect()
}
