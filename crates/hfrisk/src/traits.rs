//! Core trait definitions shared by the analyses.
//!
//! Analyses that take tuning parameters implement [`Configurable`], which gives
//! every one of them the same `new()` / `with_config()` / `config()` surface.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Sampling frequency of a return series.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodFrequency {
    /// Trading-day returns
    Daily,
    /// Weekly returns
    Weekly,
    /// Monthly returns, the usual hedge fund reporting frequency
    Monthly,
    /// Quarterly returns
    Quarterly,
}

impl PeriodFrequency {
    /// Number of periods in one year, used for annualization.
    pub const fn periods_per_year(self) -> u32 {
        match self {
            Self::Daily => 252,
            Self::Weekly => 52,
            Self::Monthly => 12,
            Self::Quarterly => 4,
        }
    }
}

/// Marker trait for analysis configuration types.
///
/// All config types should implement Default, Clone, Send, Sync, and Debug.
pub trait AnalysisConfig: Default + Clone + Send + Sync + std::fmt::Debug {}

/// Blanket implementation for any type that satisfies the trait bounds.
impl<T: Default + Clone + Send + Sync + std::fmt::Debug> AnalysisConfig for T {}

/// An analysis that supports runtime configuration.
pub trait Configurable: Sized {
    /// Configuration type for this analysis.
    type Config: AnalysisConfig;

    /// Create a new analysis with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Returns the current configuration.
    fn config(&self) -> &Self::Config;
}
