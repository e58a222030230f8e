#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hfrisk/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod attribution;
pub mod convexity;
pub mod cumulative;
pub mod downside;
pub mod drawdown;
pub mod error;
pub mod moments;
pub mod prices;
pub mod regime;
pub mod regression;
pub mod source;
pub mod summary;
pub mod table;
pub mod traits;

// Re-export core types
pub use attribution::{
    RiskAttribution, RiskContribution, UNEXPLAINED, attribute, attribute_fit, covariance_matrix,
};
pub use convexity::{ConvexityAnalysis, ConvexityConfig, ConvexityFit};
pub use cumulative::{cumulative_return, growth_curve, terminal_growth};
pub use downside::{annualized_downside_deviation, downside_deviation, table_downside_deviation};
pub use drawdown::{drawdowns, max_drawdown};
pub use error::{Result, RiskError};
pub use moments::{ColumnMoments, series_moments};
pub use prices::returns_from_prices;
pub use regime::{RegimeMeans, by_regime};
pub use regression::{FactorFit, OlsFit, fit_factor_model, fit_ols};
pub use source::{CsvPriceSource, PriceSource, QuoteRequest, fetch_return_table, read_return_table};
pub use summary::{
    ColumnFailure, MonthlyReturnBasis, StatsConfig, SummaryRecord, SummaryStatistics, TableSummary,
};
pub use table::{ReturnSeries, ReturnTable};
pub use traits::{AnalysisConfig, Configurable, PeriodFrequency};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
