//! Data sources that hand the analytics well-formed return tables.
//!
//! Price retrieval sits behind the [`PriceSource`] trait so a remote quote
//! provider can be plugged in next to the CSV-backed [`CsvPriceSource`]. Any
//! credential a provider needs is a field of the implementing type.

use crate::{Result, ReturnTable, RiskError, prices::returns_from_prices};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Date column of every price frame, ISO formatted (`YYYY-MM-DD`).
pub const DATE_COLUMN: &str = "date";
/// Last traded price column of every price frame.
pub const PRICE_COLUMN: &str = "last";

/// Request for the price history of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Ticker or other identifier
    pub identifier: String,
    /// First date, inclusive
    pub start: NaiveDate,
    /// Last date, inclusive
    pub end: NaiveDate,
}

impl QuoteRequest {
    /// Create a request, rejecting a start date after the end date.
    pub fn new(identifier: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(RiskError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            identifier: identifier.into(),
            start,
            end,
        })
    }
}

/// A provider of historical prices.
pub trait PriceSource: Send + Sync + std::fmt::Debug {
    /// Short name of the provider, used in logs.
    fn name(&self) -> &str;

    /// Price history for the request, sorted by date.
    ///
    /// Returns a DataFrame with columns: `date`, `last`
    fn fetch(&self, request: &QuoteRequest) -> Result<DataFrame>;

    /// Period returns for the request, named after the identifier and indexed by `date`.
    fn fetch_returns(&self, request: &QuoteRequest) -> Result<ReturnTable> {
        let prices = self.fetch(request)?;
        let returns = returns_from_prices(&prices, PRICE_COLUMN, &request.identifier)?;
        ReturnTable::new(returns).with_index_column(DATE_COLUMN)
    }
}

/// Reads `<directory>/<identifier>.csv` files with `date` and `last` columns.
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    directory: PathBuf,
}

impl CsvPriceSource {
    /// Create a source rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, identifier: &str) -> PathBuf {
        self.directory.join(format!("{identifier}.csv"))
    }
}

impl PriceSource for CsvPriceSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, request: &QuoteRequest) -> Result<DataFrame> {
        let path = self.path_for(&request.identifier);
        let raw = read_csv(&path)?;
        for required in [DATE_COLUMN, PRICE_COLUMN] {
            if raw.column(required).is_err() {
                return Err(RiskError::MissingColumn(required.to_string()));
            }
        }

        let prices = raw
            .lazy()
            .select([
                col(DATE_COLUMN).cast(DataType::String),
                col(PRICE_COLUMN).cast(DataType::Float64),
            ])
            .filter(
                col(DATE_COLUMN)
                    .gt_eq(lit(request.start.to_string()))
                    .and(col(DATE_COLUMN).lt_eq(lit(request.end.to_string()))),
            )
            .sort([DATE_COLUMN], SortMultipleOptions::default())
            .collect()?;

        debug!(
            source = self.name(),
            identifier = %request.identifier,
            rows = prices.height(),
            "fetched price history"
        );
        Ok(prices)
    }
}

/// Fetch several identifiers and inner-join their returns on `date`.
///
/// Identifiers become column names, so each may appear only once.
pub fn fetch_return_table(
    source: &dyn PriceSource,
    identifiers: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ReturnTable> {
    let mut seen = HashSet::with_capacity(identifiers.len());
    if let Some(duplicate) = identifiers.iter().find(|id| !seen.insert(**id)) {
        return Err(RiskError::invalid(
            "fetch_return_table",
            format!("identifier {duplicate} requested more than once"),
        ));
    }

    let mut result: Option<DataFrame> = None;

    for identifier in identifiers {
        let request = QuoteRequest::new(*identifier, start, end)?;
        let returns = source.fetch_returns(&request)?.frame().clone();

        result = Some(match result {
            Some(df) => df
                .lazy()
                .join(
                    returns.lazy(),
                    [col(DATE_COLUMN)],
                    [col(DATE_COLUMN)],
                    JoinArgs::new(JoinType::Inner),
                )
                .sort([DATE_COLUMN], SortMultipleOptions::default())
                .collect()?,
            None => returns,
        });
    }

    let frame = result.ok_or_else(|| RiskError::invalid("fetch_return_table", "no identifiers given"))?;
    ReturnTable::new(frame).with_index_column(DATE_COLUMN)
}

/// Read a CSV return table, optionally designating index and regime columns.
///
/// Every remaining column must be numeric returns.
pub fn read_return_table(
    path: impl AsRef<Path>,
    index_column: Option<&str>,
    regime_column: Option<&str>,
) -> Result<ReturnTable> {
    let mut table = ReturnTable::new(read_csv(path.as_ref())?);
    if let Some(index) = index_column {
        table = table.with_index_column(index)?;
    }
    if let Some(regime) = regime_column {
        table = table.with_regime_column(regime)?;
    }
    debug!(
        path = %path.as_ref().display(),
        periods = table.periods(),
        columns = table.return_columns().len(),
        "loaded return table"
    );
    Ok(table)
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(RiskError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )));
    }
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(frame)
}
