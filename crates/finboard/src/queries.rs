//! Cached finance queries, one per resource kind.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use finboard_core::{
    CashFlowStatement, CompanyProfile, FinanceApi, NewsArticle, PeriodType, PriceHistory,
    PriceRange, Stock, StockQuote, Symbol, SymbolMatch,
};
use finboard_query::{Query, QueryCache, QueryOptions, SharedError};

use crate::keys;

/// Finance resources behind a shared query cache.
///
/// Each method subscribes to the resource's key and returns a live
/// [`Query`]. The activation rule of the resource is applied as the
/// query's `active` gate: a blank symbol or a one-character search never
/// fetches and leaves the query `Idle`, even after
/// [`Query::set_enabled`]`(true)`.
///
/// # Example
///
/// ```rust,ignore
/// use finboard::{FinanceQueries, QueryOptions};
///
/// let queries = FinanceQueries::from_env()?;
/// let mut quote = queries.stock_quote("AAPL", QueryOptions::new());
/// let view = quote.settled().await.view();
/// if let Some(quote) = view.data {
///     println!("{} {}", quote.symbol, quote.price);
/// }
/// ```
#[derive(Clone)]
pub struct FinanceQueries {
    api: Arc<dyn FinanceApi>,
    cache: QueryCache,
}

impl fmt::Debug for FinanceQueries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinanceQueries")
            .field("api", &self.api)
            .field("cache", &self.cache)
            .finish()
    }
}

impl FinanceQueries {
    /// Create queries over `api`, caching in `cache`.
    #[must_use]
    pub fn new(api: Arc<dyn FinanceApi>, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    /// Create queries over the HTTP client configured from the environment.
    #[cfg(feature = "http")]
    pub fn from_env() -> finboard_core::Result<Self> {
        let client = finboard_client::HttpFinanceClient::from_env()?;
        Ok(Self::new(Arc::new(client), QueryCache::new()))
    }

    /// Returns the underlying API.
    #[must_use]
    pub fn api(&self) -> &Arc<dyn FinanceApi> {
        &self.api
    }

    /// Returns the shared cache.
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Cash flow statements for `symbol`.
    pub fn company_cash_flow(
        &self,
        symbol: impl Into<Symbol>,
        period: PeriodType,
        options: QueryOptions,
    ) -> Query<Vec<CashFlowStatement>> {
        let symbol = symbol.into();
        let active = options.active && keys::symbol_is_active(&symbol);
        let api = Arc::clone(&self.api);
        self.cache.query(
            keys::company_cash_flow(&symbol, period),
            options.active(active),
            move || {
                let api = Arc::clone(&api);
                let symbol = symbol.clone();
                async move { api.company_cash_flow(&symbol, period).await }
            },
        )
    }

    /// Company profile for `symbol`.
    pub fn company_profile(
        &self,
        symbol: impl Into<Symbol>,
        options: QueryOptions,
    ) -> Query<CompanyProfile> {
        let symbol = symbol.into();
        let active = options.active && keys::symbol_is_active(&symbol);
        let api = Arc::clone(&self.api);
        self.cache.query(
            keys::company_profile(&symbol),
            options.active(active),
            move || {
                let api = Arc::clone(&api);
                let symbol = symbol.clone();
                async move { api.company_profile(&symbol).await }
            },
        )
    }

    /// Price history for `symbol` over `range`.
    pub fn stock_price(
        &self,
        symbol: impl Into<Symbol>,
        range: PriceRange,
        options: QueryOptions,
    ) -> Query<PriceHistory> {
        let symbol = symbol.into();
        let active = options.active && keys::symbol_is_active(&symbol);
        let api = Arc::clone(&self.api);
        self.cache.query(
            keys::stock_price(&symbol, range),
            options.active(active),
            move || {
                let api = Arc::clone(&api);
                let symbol = symbol.clone();
                async move { api.stock_price(&symbol, range).await }
            },
        )
    }

    /// Market news, optionally for one category.
    pub fn market_news(
        &self,
        category: Option<&str>,
        options: QueryOptions,
    ) -> Query<Vec<NewsArticle>> {
        let category = category.map(str::to_string);
        let api = Arc::clone(&self.api);
        self.cache.query(
            keys::market_news(category.as_deref()),
            options,
            move || {
                let api = Arc::clone(&api);
                let category = category.clone();
                async move { api.market_news(category.as_deref()).await }
            },
        )
    }

    /// Latest quote for `symbol`.
    pub fn stock_quote(
        &self,
        symbol: impl Into<Symbol>,
        options: QueryOptions,
    ) -> Query<StockQuote> {
        let symbol = symbol.into();
        let active = options.active && keys::symbol_is_active(&symbol);
        let api = Arc::clone(&self.api);
        self.cache.query(
            keys::stock_quote(&symbol),
            options.active(active),
            move || {
                let api = Arc::clone(&api);
                let symbol = symbol.clone();
                async move { api.stock_quote(&symbol).await }
            },
        )
    }

    /// Symbols matching `query`.
    pub fn symbol_search(&self, query: &str, options: QueryOptions) -> Query<Vec<SymbolMatch>> {
        let query = query.trim().to_string();
        let active = options.active && keys::search_is_active(&query);
        let api = Arc::clone(&self.api);
        self.cache.query(
            keys::symbol_search(&query),
            options.active(active),
            move || {
                let api = Arc::clone(&api);
                let query = query.clone();
                async move { api.symbol_search(&query).await }
            },
        )
    }

    /// Invalidates every cached query for `symbol`.
    ///
    /// Returns the number of entries marked stale.
    pub fn invalidate_symbol(&self, symbol: &Symbol) -> usize {
        self.cache
            .invalidate_where(|key| keys::is_for_symbol(key, symbol))
    }

    /// Resolves the quote of every position and stores it as the current price.
    ///
    /// Quotes go through the cache, so fresh quotes are reused and quotes
    /// already being fetched are shared. Positions whose quote fails keep
    /// their previous price; the failures are returned by symbol. A blank
    /// symbol is never requested and fails with
    /// [`FinanceError::InvalidParameter`](finboard_core::FinanceError::InvalidParameter).
    pub async fn refresh_prices(&self, stocks: &mut [Stock]) -> Vec<(Symbol, SharedError)> {
        let symbols: Vec<Symbol> = stocks.iter().map(|stock| stock.symbol.clone()).collect();
        let lookups = symbols.into_iter().map(|symbol| {
            let api = Arc::clone(&self.api);
            let cache = self.cache.clone();
            async move {
                let key = keys::stock_quote(&symbol);
                let options = QueryOptions::new().active(keys::symbol_is_active(&symbol));
                let fetch_symbol = symbol.clone();
                let result = cache
                    .fetch_query(key, options, move || {
                        let api = Arc::clone(&api);
                        let symbol = fetch_symbol.clone();
                        async move { api.stock_quote(&symbol).await }
                    })
                    .await;
                (symbol, result)
            }
        });
        let results = join_all(lookups).await;

        let mut failures = Vec::new();
        for (stock, (symbol, result)) in stocks.iter_mut().zip(results) {
            match result {
                Ok(quote) => {
                    debug!(symbol = %symbol, price = quote.price, "refreshed position price");
                    stock.current_price = Some(quote.price);
                }
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "failed to refresh position price");
                    failures.push((symbol, err));
                }
            }
        }
        failures
    }
}
