//! Persisted record shapes.
//!
//! These mirror the rows stored by the dashboard's persistence layer. The
//! insert shapes ([`NewUser`], [`NewPortfolio`], [`NewStock`]) omit the
//! server-assigned `id` and `createdAt`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FinanceError, Result};
use crate::types::Symbol;

/// A registered user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Row id.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Password hash.
    pub password: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns "first last", falling back to the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => self.username.clone(),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Insert shape for [`User`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Password hash.
    pub password: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
}

impl NewUser {
    /// Checks the fields the persistence layer requires.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(FinanceError::InvalidParameter("username is required".into()));
        }
        let valid_email = self
            .email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(FinanceError::InvalidParameter(format!(
                "invalid email: {}",
                self.email
            )));
        }
        if self.password.is_empty() {
            return Err(FinanceError::InvalidParameter("password is required".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// A named collection of stock positions owned by a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    /// Row id.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Portfolio name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Insert shape for [`Portfolio`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    /// Owning user.
    pub user_id: i64,
    /// Portfolio name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
}

/// A stock position inside a portfolio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    /// Row id.
    pub id: i64,
    /// Owning portfolio.
    pub portfolio_id: i64,
    /// Ticker.
    pub symbol: Symbol,
    /// Security name.
    pub name: String,
    /// Number of shares held.
    pub quantity: i64,
    /// Price paid per share.
    pub purchase_price: f64,
    /// Last known price per share.
    pub current_price: Option<f64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Stock {
    /// Quantity times purchase price.
    #[must_use]
    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.purchase_price
    }

    /// Quantity times current price, falling back to the purchase price.
    #[must_use]
    pub fn market_value(&self) -> f64 {
        self.quantity as f64 * self.current_price.unwrap_or(self.purchase_price)
    }

    /// Market value minus cost basis.
    #[must_use]
    pub fn unrealized_gain(&self) -> f64 {
        self.market_value() - self.cost_basis()
    }
}

/// Insert shape for [`Stock`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStock {
    /// Owning portfolio.
    pub portfolio_id: i64,
    /// Ticker.
    pub symbol: Symbol,
    /// Security name.
    pub name: String,
    /// Number of shares held.
    pub quantity: i64,
    /// Price paid per share.
    pub purchase_price: f64,
    /// Last known price per share.
    pub current_price: Option<f64>,
}

impl NewStock {
    /// Checks the fields the persistence layer requires.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(FinanceError::InvalidParameter("symbol is required".into()));
        }
        if self.quantity <= 0 {
            return Err(FinanceError::InvalidParameter(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if !self.purchase_price.is_finite() || self.purchase_price < 0.0 {
            return Err(FinanceError::InvalidParameter(format!(
                "invalid purchase price: {}",
                self.purchase_price
            )));
        }
        Ok(())
    }
}

/// Aggregate figures for a set of positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    /// Number of positions.
    pub positions: usize,
    /// Sum of market values.
    pub total_value: f64,
    /// Sum of cost bases.
    pub total_cost: f64,
    /// Total value minus total cost.
    pub total_gain: f64,
    /// Gain as a percentage of cost, zero when cost is zero.
    pub gain_percent: f64,
}

impl PortfolioSummary {
    /// Summarizes the given positions.
    #[must_use]
    pub fn from_stocks<'a>(stocks: impl IntoIterator<Item = &'a Stock>) -> Self {
        let mut summary = Self::default();
        for stock in stocks {
            summary.positions += 1;
            summary.total_value += stock.market_value();
            summary.total_cost += stock.cost_basis();
        }
        summary.total_gain = summary.total_value - summary.total_cost;
        if summary.total_cost != 0.0 {
            summary.gain_percent = summary.total_gain / summary.total_cost * 100.0;
        }
        summary
    }
}
