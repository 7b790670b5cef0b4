//! Resource keys and activation rules for each finance query.

use finboard_core::{KeyParam, PeriodType, PriceRange, ResourceKey, ResourceKind, Symbol};

/// Shortest search query that triggers a request.
pub const MIN_SEARCH_LEN: usize = 2;

/// Key of a cash flow query.
#[must_use]
pub fn company_cash_flow(symbol: &Symbol, period: PeriodType) -> ResourceKey {
    ResourceKey::new(ResourceKind::CompanyCashFlow)
        .with(symbol.as_str())
        .with(period.as_str())
}

/// Key of a company profile query.
#[must_use]
pub fn company_profile(symbol: &Symbol) -> ResourceKey {
    ResourceKey::new(ResourceKind::CompanyData).with(symbol.as_str())
}

/// Key of a price history query.
#[must_use]
pub fn stock_price(symbol: &Symbol, range: PriceRange) -> ResourceKey {
    ResourceKey::new(ResourceKind::StockPrice)
        .with(symbol.as_str())
        .with(range.as_str())
}

/// Key of a market news query.
#[must_use]
pub fn market_news(category: Option<&str>) -> ResourceKey {
    ResourceKey::new(ResourceKind::MarketNews).with(category)
}

/// Key of a quote query.
#[must_use]
pub fn stock_quote(symbol: &Symbol) -> ResourceKey {
    ResourceKey::new(ResourceKind::StockQuote).with(symbol.as_str())
}

/// Key of a symbol search query. The query is trimmed.
#[must_use]
pub fn symbol_search(query: &str) -> ResourceKey {
    ResourceKey::new(ResourceKind::Search).with(query.trim())
}

/// Returns true if `key` belongs to a per-symbol query for `symbol`.
#[must_use]
pub fn is_for_symbol(key: &ResourceKey, symbol: &Symbol) -> bool {
    let per_symbol = matches!(
        key.kind(),
        ResourceKind::CompanyCashFlow
            | ResourceKind::CompanyData
            | ResourceKind::StockPrice
            | ResourceKind::StockQuote
    );
    per_symbol && matches!(key.params().first(), Some(KeyParam::Str(s)) if s == symbol.as_str())
}

/// Symbol queries fetch only once a symbol is known.
#[must_use]
pub fn symbol_is_active(symbol: &Symbol) -> bool {
    !symbol.is_empty()
}

/// Search fetches only for queries of at least [`MIN_SEARCH_LEN`] characters.
#[must_use]
pub fn search_is_active(query: &str) -> bool {
    query.trim().chars().count() >= MIN_SEARCH_LEN
}
