//! Request parameter types.
//!
//! This module defines [`PeriodType`] for cash flow statements and
//! [`PriceRange`] for price history lookups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FinanceError;

/// Reporting period for financial statements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// Annual reporting period.
    #[default]
    Annual,
    /// Quarterly reporting period.
    #[serde(rename = "quarter")]
    Quarterly,
}

impl PeriodType {
    /// Returns the value sent as the `period` query parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarter",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" | "year" | "fy" => Ok(Self::Annual),
            "quarter" | "quarterly" | "q" => Ok(Self::Quarterly),
            _ => Err(FinanceError::InvalidParameter(format!("unknown period: {s}"))),
        }
    }
}

/// Time window of a price history request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceRange {
    /// Intraday, one trading day.
    #[serde(rename = "1d")]
    OneDay,
    /// Five trading days.
    #[serde(rename = "5d")]
    FiveDays,
    /// One month.
    #[default]
    #[serde(rename = "1m")]
    OneMonth,
    /// Six months.
    #[serde(rename = "6m")]
    SixMonths,
    /// One year.
    #[serde(rename = "1y")]
    OneYear,
    /// Five years.
    #[serde(rename = "5y")]
    FiveYears,
}

impl PriceRange {
    /// All ranges, shortest first.
    pub const ALL: [Self; 6] = [
        Self::OneDay,
        Self::FiveDays,
        Self::OneMonth,
        Self::SixMonths,
        Self::OneYear,
        Self::FiveYears,
    ];

    /// Returns the value sent as the `range` query parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1m",
            Self::SixMonths => "6m",
            Self::OneYear => "1y",
            Self::FiveYears => "5y",
        }
    }

    /// Returns true if the range is served as intraday bars.
    #[must_use]
    pub const fn is_intraday(&self) -> bool {
        matches!(self, Self::OneDay | Self::FiveDays)
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceRange {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FinanceError::InvalidParameter(format!("unknown price range: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_query_values() {
        assert_eq!(PeriodType::Annual.as_str(), "annual");
        assert_eq!(PeriodType::Quarterly.to_string(), "quarter");
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("Quarter".parse::<PeriodType>().unwrap(), PeriodType::Quarterly);
        assert_eq!(" annual ".parse::<PeriodType>().unwrap(), PeriodType::Annual);
        assert!(matches!(
            "monthly".parse::<PeriodType>(),
            Err(FinanceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_price_range_parse() {
        assert_eq!("6M".parse::<PriceRange>().unwrap(), PriceRange::SixMonths);
        assert!("2w".parse::<PriceRange>().is_err());
        assert!(PriceRange::OneDay.is_intraday());
        assert!(!PriceRange::OneYear.is_intraday());
    }
}
