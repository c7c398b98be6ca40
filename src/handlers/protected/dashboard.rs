// handlers/protected/dashboard.rs - GET /dashboard and GET /api/me

use axum::Extension;
use serde::Serialize;

use crate::middleware::{ApiResponse, Subject};
use crate::models::{Transaction, TrendingStock, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub name: String,
    pub kyc_verified: bool,
    pub is_admin: bool,
    pub balance: f64,
    pub total_invested: f64,
    pub projected_return: f64,
    pub pending_transactions: usize,
    pub wallets: Vec<WalletView>,
    pub investments: Vec<InvestmentView>,
    pub recent_transactions: Vec<Transaction>,
    pub trending_stocks: Vec<TrendingStock>,
}

#[derive(Debug, Serialize)]
pub struct WalletView {
    pub symbol: &'static str,
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentView {
    pub plan: String,
    pub amount: f64,
    pub roi: f64,
    pub max: f64,
    pub projected_return: f64,
    pub cap_utilisation: f64,
}

impl From<&User> for DashboardView {
    fn from(user: &User) -> Self {
        let investments: Vec<InvestmentView> = user
            .investments
            .iter()
            .map(|inv| InvestmentView {
                plan: inv.plan.clone(),
                amount: inv.amount,
                roi: inv.roi,
                max: inv.max,
                projected_return: inv.projected_return(),
                cap_utilisation: inv.cap_utilisation(),
            })
            .collect();

        let wallets = user
            .wallets
            .as_ref()
            .map(|w| {
                w.configured()
                    .into_iter()
                    .map(|(symbol, address)| WalletView {
                        symbol,
                        address: address.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: user.name.clone(),
            kyc_verified: user.kyc_verified,
            is_admin: user.is_admin,
            balance: user.balance,
            total_invested: user.total_invested(),
            projected_return: investments.iter().map(|i| i.projected_return).sum(),
            pending_transactions: user.pending_transactions(),
            wallets,
            investments,
            recent_transactions: user.recent_transactions.clone(),
            trending_stocks: user.trending_stocks.clone(),
        }
    }
}

/// GET /dashboard - Dashboard view model for the gated subject
pub async fn dashboard(Extension(Subject(user)): Extension<Subject>) -> ApiResponse<DashboardView> {
    ApiResponse::success(DashboardView::from(&user))
}

/// GET /api/me - The gated subject's record as resolved for this request
pub async fn me(Extension(Subject(user)): Extension<Subject>) -> ApiResponse<User> {
    ApiResponse::success(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Investment, Wallets};

    #[test]
    fn view_aggregates_investments_and_wallets() {
        let mut user = User::new("user-1", "Ada");
        user.balance = 900.0;
        user.investments = vec![
            Investment { plan: "Gold".into(), amount: 1000.0, roi: 12.0, max: 5000.0 },
            Investment { plan: "Gold".into(), amount: 500.0, roi: 10.0, max: 0.0 },
        ];
        user.wallets = Some(Wallets {
            eth: Some("0xabc".into()),
            ..Wallets::default()
        });

        let view = DashboardView::from(&user);
        assert_eq!(view.total_invested, 1500.0);
        assert_eq!(view.projected_return, 170.0);
        assert_eq!(view.investments[0].cap_utilisation, 0.2);
        assert_eq!(view.investments[1].cap_utilisation, 0.0);
        assert_eq!(view.wallets.len(), 1);
        assert_eq!(view.wallets[0].symbol, "eth");
    }
}
