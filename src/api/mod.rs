//! Client side of the indicators backend: the `DashboardApi` seam and its
//! reqwest implementation.

mod client;
mod error;
mod types;

pub use client::{DashboardClient, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use types::{
    AmortizationMonth, ComparisonForm, ComparisonResult, HistoryRecord, HistoryResponse,
    InvestmentMonth, Recommendation,
};

use crate::history::HistoryQuery;

#[async_trait::async_trait]
pub trait DashboardApi: Send + Sync {
    /// `GET /api/historico` for the validated query.
    async fn fetch_history(&self, query: &HistoryQuery) -> Result<HistoryResponse, ApiError>;

    /// `POST /api/comparar-aporte-mensal` with the form fields as a JSON object.
    async fn compare_monthly_contribution(
        &self,
        form: &ComparisonForm,
    ) -> Result<ComparisonResult, ApiError>;
}
