use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// User record as held by the identity provider.
///
/// Wire names are camelCase to match the provider payloads. Everything except
/// `is_admin` is read-only from this service's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Provider-side identifier. Absent in some provider payloads, in which
    /// case the store fills it from the lookup key.
    #[serde(default)]
    pub uid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub kyc_verified: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallets: Option<Wallets>,
    #[serde(default)]
    pub investments: Vec<Investment>,
    #[serde(default)]
    pub recent_transactions: Vec<Transaction>,
    #[serde(default)]
    pub trending_stocks: Vec<TrendingStock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wallets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub btc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usdt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xrp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sol: Option<String>,
}

impl Wallets {
    /// Configured (symbol, address) pairs in a fixed display order.
    pub fn configured(&self) -> Vec<(&'static str, &str)> {
        [
            ("btc", &self.btc),
            ("eth", &self.eth),
            ("usdt", &self.usdt),
            ("xrp", &self.xrp),
            ("sol", &self.sol),
        ]
        .into_iter()
        .filter_map(|(symbol, address)| {
            address
                .as_deref()
                .filter(|a| !a.trim().is_empty())
                .map(|a| (symbol, a))
        })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub plan: String,
    pub amount: f64,
    /// Percentage, e.g. `12.5` for 12.5%.
    pub roi: f64,
    pub max: f64,
}

impl Investment {
    pub fn projected_return(&self) -> f64 {
        self.amount * self.roi / 100.0
    }

    /// Share of the plan cap already used, clamped to `[0, 1]`.
    pub fn cap_utilisation(&self) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.amount / self.max).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub status: TransactionStatus,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Roi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

/// Display-only market snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingStock {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    /// Signed percentage change.
    pub change: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("name is required")]
    MissingName,

    #[error("balance must be a non-negative number, got {0}")]
    InvalidBalance(f64),

    #[error("{field} must be a finite number")]
    NonFiniteAmount { field: String },

    #[error("duplicate transaction id '{0}'")]
    DuplicateTransaction(String),
}

impl User {
    /// Minimal record, mostly for fixtures and tests.
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            phone: None,
            kyc_verified: false,
            is_admin: false,
            balance: 0.0,
            wallets: None,
            investments: Vec::new(),
            recent_transactions: Vec::new(),
            trending_stocks: Vec::new(),
        }
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    /// Check the record shape before anything downstream trusts it.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.name.trim().is_empty() {
            return Err(UserValidationError::MissingName);
        }
        if !self.balance.is_finite() || self.balance < 0.0 {
            return Err(UserValidationError::InvalidBalance(self.balance));
        }

        for (i, inv) in self.investments.iter().enumerate() {
            for (name, value) in [("amount", inv.amount), ("roi", inv.roi), ("max", inv.max)] {
                if !value.is_finite() {
                    return Err(UserValidationError::NonFiniteAmount {
                        field: format!("investments[{}].{}", i, name),
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        for (i, tx) in self.recent_transactions.iter().enumerate() {
            if !tx.amount.is_finite() {
                return Err(UserValidationError::NonFiniteAmount {
                    field: format!("recentTransactions[{}].amount", i),
                });
            }
            if !seen.insert(tx.id.as_str()) {
                return Err(UserValidationError::DuplicateTransaction(tx.id.clone()));
            }
        }

        Ok(())
    }

    pub fn total_invested(&self) -> f64 {
        self.investments.iter().map(|i| i.amount).sum()
    }

    pub fn pending_transactions(&self) -> usize {
        self.recent_transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Pending)
            .count()
    }
}
