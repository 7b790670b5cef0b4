#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/finboard/finboard/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTTP client for the finboard finance API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use finboard_client::{ClientConfig, HttpFinanceClient};
//! use finboard_core::{FinanceApi, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpFinanceClient::new(ClientConfig::new("http://localhost:5000"))?;
//!
//!     let quote = client.stock_quote(&Symbol::new("AAPL")).await?;
//!     println!("{} {}", quote.symbol, quote.price);
//!
//!     Ok(())
//! }
//! ```

/// Client configuration.
pub mod config;

pub use config::ClientConfig;

use async_trait::async_trait;
use finboard_core::{
    CashFlowStatement, CompanyProfile, FinanceApi, FinanceError, NewsArticle, PeriodType,
    PriceHistory, PriceRange, ResourceKind, Result, StockQuote, Symbol, SymbolMatch,
};
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Finance API client over HTTP.
///
/// Provides access to:
/// - Company cash flow statements and profiles
/// - Price history and latest quotes
/// - Market news
/// - Symbol search
#[derive(Clone, Debug)]
pub struct HttpFinanceClient {
    client: Client,
    base_url: String,
}

impl HttpFinanceClient {
    /// Create a new client from the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FinanceError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, config.base_url))
    }

    /// Create a client from `FINBOARD_API_URL` and `FINBOARD_API_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a new client with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the endpoint URL for a resource kind.
    fn url(&self, kind: ResourceKind) -> String {
        format!("{}{}", self.base_url, kind.path())
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url(kind);
        debug!(endpoint = %kind, ?query, "finance request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FinanceError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            warn!(endpoint = %kind, ?retry_after, "rate limited");
            return Err(FinanceError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = %kind, status = status.as_u16(), "request failed");
            return Err(FinanceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| FinanceError::Network(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| FinanceError::Parse(format!("{e}: {text}")))
    }
}

#[async_trait]
impl FinanceApi for HttpFinanceClient {
    async fn company_cash_flow(
        &self,
        symbol: &Symbol,
        period: PeriodType,
    ) -> Result<Vec<CashFlowStatement>> {
        self.get(
            ResourceKind::CompanyCashFlow,
            &[("symbol", symbol.as_str()), ("period", period.as_str())],
        )
        .await
    }

    async fn company_profile(&self, symbol: &Symbol) -> Result<CompanyProfile> {
        self.get(ResourceKind::CompanyData, &[("symbol", symbol.as_str())])
            .await
    }

    async fn stock_price(&self, symbol: &Symbol, range: PriceRange) -> Result<PriceHistory> {
        self.get(
            ResourceKind::StockPrice,
            &[("symbol", symbol.as_str()), ("range", range.as_str())],
        )
        .await
    }

    async fn market_news(&self, category: Option<&str>) -> Result<Vec<NewsArticle>> {
        match category {
            Some(category) => {
                self.get(ResourceKind::MarketNews, &[("category", category)])
                    .await
            }
            None => self.get(ResourceKind::MarketNews, &[]).await,
        }
    }

    async fn stock_quote(&self, symbol: &Symbol) -> Result<StockQuote> {
        self.get(ResourceKind::StockQuote, &[("symbol", symbol.as_str())])
            .await
    }

    async fn symbol_search(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        self.get(ResourceKind::Search, &[("query", query)]).await
    }
}
