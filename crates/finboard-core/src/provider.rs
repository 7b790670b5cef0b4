//! The finance API trait.
//!
//! [`FinanceApi`] is the seam between the query layer and the transport.
//! `finboard-client` provides the HTTP implementation; tests substitute
//! in-memory fakes.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    params::{PeriodType, PriceRange},
    types::{
        CashFlowStatement, CompanyProfile, NewsArticle, PriceHistory, StockQuote, Symbol,
        SymbolMatch,
    },
};

/// Typed access to the six finance resources.
///
/// Every call is a single best-effort request. Implementations do not retry,
/// batch, or cache; failures are returned verbatim.
#[async_trait]
pub trait FinanceApi: Send + Sync + Debug {
    /// Fetches cash flow statements for a symbol, most recent first.
    async fn company_cash_flow(
        &self,
        symbol: &Symbol,
        period: PeriodType,
    ) -> Result<Vec<CashFlowStatement>>;

    /// Fetches the company profile for a symbol.
    async fn company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile>;

    /// Fetches price history for a symbol over a range.
    async fn stock_price(&self, symbol: &Symbol, range: PriceRange) -> Result<PriceHistory>;

    /// Fetches market news, optionally restricted to a category.
    async fn market_news(&self, category: Option<&str>) -> Result<Vec<NewsArticle>>;

    /// Fetches the latest quote for a symbol.
    async fn stock_quote(&self, symbol: &Symbol) -> Result<StockQuote>;

    /// Searches symbols by name or ticker prefix.
    async fn symbol_search(&self, query: &str) -> Result<Vec<SymbolMatch>>;
}
