//! Resource payloads returned by the finance API.
//!
//! This module defines the data structures exchanged with the fetching layer:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`CashFlowStatement`] - Cash flow statement for one period
//! - [`CompanyProfile`] - Company reference information
//! - [`PricePoint`] / [`PriceHistory`] - Price bars for charting
//! - [`NewsArticle`] - Market news item
//! - [`StockQuote`] - Latest quote for a symbol
//! - [`SymbolMatch`] - Symbol search result

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::{Column, DataFrame, DataType, IntoLazy, NamedFrom, TimeUnit, col};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FinanceError, Result};
use crate::params::PeriodType;

/// A trading symbol/ticker.
///
/// Symbols are trimmed and uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, trimming and converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the symbol is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Cash flow statement for a single reporting period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowStatement {
    /// End date of the reporting period.
    pub date: NaiveDate,
    /// Stock symbol.
    pub symbol: Symbol,
    /// Type of period (annual or quarterly).
    #[serde(default)]
    pub period: PeriodType,
    /// Cash generated by operations.
    #[serde(default)]
    pub operating_cash_flow: f64,
    /// Capital expenditures, usually negative.
    #[serde(default)]
    pub capital_expenditure: f64,
    /// Operating cash flow net of capital expenditures.
    #[serde(default)]
    pub free_cash_flow: f64,
    /// Dividends paid, usually negative.
    #[serde(default)]
    pub dividends_paid: f64,
    /// Net change in cash over the period.
    #[serde(default)]
    pub net_change_in_cash: f64,
}

/// Company reference information.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Company name.
    pub company_name: String,
    /// Primary exchange.
    #[serde(default)]
    pub exchange: String,
    /// Business sector.
    #[serde(default)]
    pub sector: String,
    /// Industry within the sector.
    #[serde(default)]
    pub industry: String,
    /// Country of incorporation.
    #[serde(default)]
    pub country: String,
    /// Trading currency.
    #[serde(default)]
    pub currency: String,
    /// Business description.
    pub description: Option<String>,
    /// Company website.
    pub website: Option<String>,
    /// Chief executive officer.
    pub ceo: Option<String>,
    /// Market capitalization.
    pub market_cap: Option<f64>,
    /// Number of full-time employees.
    pub employees: Option<u64>,
}

/// A single price bar.
///
/// `date` is either a calendar date (`2024-01-02`) for daily bars or an
/// RFC 3339 timestamp for intraday bars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Bar date or timestamp as sent by the API.
    pub date: String,
    /// Opening price.
    pub open: f64,
    /// Highest price during the period.
    pub high: f64,
    /// Lowest price during the period.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Trading volume.
    #[serde(default)]
    pub volume: f64,
}

impl PricePoint {
    /// Parses the bar's date into a UTC timestamp.
    ///
    /// Calendar dates resolve to midnight UTC.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.date) {
            return Some(ts.with_timezone(&Utc));
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(&self.date, "%Y-%m-%d %H:%M:%S") {
            return Some(ts.and_utc());
        }
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|ts| ts.and_utc())
    }
}

/// Price history for one symbol, as returned by the stock price endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory {
    points: Vec<PricePoint>,
}

impl PriceHistory {
    /// Creates a price history from a vector of bars.
    #[must_use]
    pub const fn from_points(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    /// Returns the number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if there are no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the bars in API order.
    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Returns the most recent close, by timestamp.
    #[must_use]
    pub fn latest_close(&self) -> Option<f64> {
        self.points
            .iter()
            .filter_map(|p| p.timestamp().map(|ts| (ts, p.close)))
            .max_by_key(|(ts, _)| *ts)
            .map(|(_, close)| close)
    }

    /// Converts the history into a DataFrame sorted by timestamp.
    ///
    /// Columns: timestamp, open, high, low, close, volume. Bars with an
    /// unparseable date are skipped.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let parsed: Vec<(i64, &PricePoint)> = self
            .points
            .iter()
            .filter_map(|p| p.timestamp().map(|ts| (ts.timestamp_millis(), p)))
            .collect();

        let timestamps: Vec<i64> = parsed.iter().map(|(ts, _)| *ts).collect();
        let opens: Vec<f64> = parsed.iter().map(|(_, p)| p.open).collect();
        let highs: Vec<f64> = parsed.iter().map(|(_, p)| p.high).collect();
        let lows: Vec<f64> = parsed.iter().map(|(_, p)| p.low).collect();
        let closes: Vec<f64> = parsed.iter().map(|(_, p)| p.close).collect();
        let volumes: Vec<f64> = parsed.iter().map(|(_, p)| p.volume).collect();

        let df = DataFrame::new(vec![
            Column::new("timestamp".into(), timestamps),
            Column::new("open".into(), opens),
            Column::new("high".into(), highs),
            Column::new("low".into(), lows),
            Column::new("close".into(), closes),
            Column::new("volume".into(), volumes),
        ])
        .map_err(|e| FinanceError::Parse(e.to_string()))?;

        df.lazy()
            .with_column(col("timestamp").cast(DataType::Datetime(TimeUnit::Milliseconds, None)))
            .sort(["timestamp"], Default::default())
            .collect()
            .map_err(|e| FinanceError::Parse(e.to_string()))
    }
}

impl FromIterator<PricePoint> for PriceHistory {
    fn from_iter<I: IntoIterator<Item = PricePoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// A market news item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    /// Article identifier.
    pub id: String,
    /// Headline.
    pub headline: String,
    /// Short summary.
    #[serde(default)]
    pub summary: String,
    /// Publisher name.
    #[serde(default)]
    pub source: String,
    /// Link to the full article.
    pub url: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Symbols mentioned in the article.
    #[serde(default)]
    pub symbols: Vec<Symbol>,
}

/// Latest quote for a symbol.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Display name.
    pub name: Option<String>,
    /// Last traded price.
    pub price: f64,
    /// Absolute change against the previous close.
    #[serde(default)]
    pub change: f64,
    /// Percent change against the previous close.
    #[serde(default)]
    pub change_percent: f64,
    /// Session open.
    pub open: Option<f64>,
    /// Session high.
    pub high: Option<f64>,
    /// Session low.
    pub low: Option<f64>,
    /// Previous session close.
    pub previous_close: Option<f64>,
    /// Session volume.
    pub volume: Option<f64>,
    /// Quote time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl StockQuote {
    /// Returns true if the price is at or above the previous close.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}

/// A symbol search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolMatch {
    /// Matched symbol.
    pub symbol: Symbol,
    /// Security name.
    pub name: String,
    /// Listing exchange.
    pub exchange: Option<String>,
    /// Security type (e.g. "stock", "etf").
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
