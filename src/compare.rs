//! Contribution-vs-amortization comparison: submit the form, turn the
//! server's answer into a recommendation and a monthly breakdown table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{
    AmortizationMonth, ApiError, ComparisonForm, ComparisonResult, DashboardApi, InvestmentMonth,
    Recommendation,
};
use crate::export::{export_table, ExportError, COMPARISON_FILENAME};
use crate::format::{NumberFormatter, ValueKind};
use crate::table::{Column, RenderedTable, TableRow};

pub const BREAKDOWN_EMPTY_MESSAGE: &str = "Nenhum detalhe mensal disponível.";
pub const BREAKDOWN_COLUMNS: [&str; 3] = [
    "Mês",
    "Investimento (acumulado)",
    "Amortização (economia equivalente)",
];

const UNKNOWN_ERROR: &str = "Erro desconhecido.";
const TRANSPORT_ERROR: &str = "Erro ao comunicar com o servidor. Tente novamente.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Success,
    Danger,
    Neutral,
}

impl Highlight {
    pub fn class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Danger => "danger",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationView {
    pub headline: String,
    pub sentence: String,
    pub highlight: Highlight,
}

impl RecommendationView {
    pub fn new(
        recommendation: &Recommendation,
        difference: Option<f64>,
        formatter: &NumberFormatter,
    ) -> Self {
        let amount = formatter.format(difference, ValueKind::Currency);
        match recommendation {
            Recommendation::Invest => Self {
                headline: "É melhor investir!".to_string(),
                sentence: format!("Você teria {amount} a mais investindo."),
                highlight: Highlight::Success,
            },
            Recommendation::Amortize => Self {
                headline: "É melhor amortizar!".to_string(),
                sentence: format!("Você economizaria {amount} amortizando."),
                highlight: Highlight::Danger,
            },
            Recommendation::Indifferent | Recommendation::Other(_) => Self {
                headline: "É indiferente!".to_string(),
                sentence: "Os resultados são muito próximos, considere outros fatores."
                    .to_string(),
                highlight: Highlight::Neutral,
            },
        }
    }
}

/// Index-wise join of the two monthly paths.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownJoin {
    /// `(month, accumulated investment, equivalent amortization savings)`.
    /// A month missing from the amortization path is `Some(0.0)`; a month
    /// present with a null value stays `None`.
    pub rows: Vec<(u32, Option<f64>, Option<f64>)>,
    /// `(investment len, amortization len)` when the paths differ in length.
    pub mismatch: Option<(usize, usize)>,
}

impl BreakdownJoin {
    /// Join by position. Months missing from the amortization path count as
    /// zero savings; extra amortization months are dropped.
    pub fn join(investment: &[InvestmentMonth], amortization: &[AmortizationMonth]) -> Self {
        let mismatch = (investment.len() != amortization.len())
            .then_some((investment.len(), amortization.len()));
        if let Some((invest_len, amort_len)) = mismatch {
            warn!(
                investment = invest_len,
                amortization = amort_len,
                "monthly breakdown lengths differ; missing months shown as zero"
            );
        }

        let rows = investment
            .iter()
            .enumerate()
            .map(|(index, month)| {
                let saved = match amortization.get(index) {
                    Some(m) => m.economia_acumulada_equivalente,
                    None => Some(0.0),
                };
                (month.mes, month.valor_acumulado, saved)
            })
            .collect();

        Self { rows, mismatch }
    }
}

pub fn breakdown_columns() -> Vec<Column> {
    BREAKDOWN_COLUMNS.iter().map(|t| Column::new(*t)).collect()
}

/// Monthly table for a comparison result. Both paths must be non-empty,
/// otherwise the table is the single "no details" placeholder row.
pub fn render_breakdown_table(
    result: &ComparisonResult,
    formatter: &NumberFormatter,
) -> (RenderedTable, Option<(usize, usize)>) {
    let amortization = match result.monthly_breakdown_amortizacao.as_deref() {
        Some(path) if !path.is_empty() && !result.monthly_breakdown_investimento.is_empty() => path,
        _ => {
            return (
                RenderedTable::placeholder(breakdown_columns(), BREAKDOWN_EMPTY_MESSAGE),
                None,
            )
        }
    };

    let join = BreakdownJoin::join(&result.monthly_breakdown_investimento, amortization);
    let rows = join
        .rows
        .iter()
        .map(|(month, invested, saved)| {
            TableRow::Cells(vec![
                month.to_string(),
                formatter.format(*invested, ValueKind::Currency),
                formatter.format(*saved, ValueKind::Currency),
            ])
        })
        .collect();

    (
        RenderedTable {
            columns: breakdown_columns(),
            rows,
        },
        join.mismatch,
    )
}

/// Everything the result panel shows, already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonView {
    pub invested: String,
    pub interest_saved: String,
    pub difference: String,
    pub months: Option<u32>,
    pub recommendation: RecommendationView,
    pub breakdown: RenderedTable,
    pub breakdown_mismatch: Option<(usize, usize)>,
}

impl ComparisonView {
    pub fn from_result(result: &ComparisonResult, formatter: &NumberFormatter) -> Self {
        let (breakdown, breakdown_mismatch) = render_breakdown_table(result, formatter);
        Self {
            invested: formatter.format(result.montante_investido, ValueKind::Currency),
            interest_saved: formatter
                .format(result.economia_juros_amortizacao, ValueKind::Currency),
            difference: formatter.format(result.diferenca, ValueKind::Currency),
            months: result.periodo_meses,
            recommendation: RecommendationView::new(
                &result.recomendacao,
                result.diferenca,
                formatter,
            ),
            breakdown,
            breakdown_mismatch,
        }
    }
}

#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ComparisonError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Status { message, .. }) => message
                .clone()
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            Self::Api(ApiError::Transport(_) | ApiError::Decode(_)) => TRANSPORT_ERROR.to_string(),
        }
    }
}

pub struct ComparisonController {
    api: Arc<dyn DashboardApi>,
    formatter: NumberFormatter,
}

impl ComparisonController {
    pub fn new(api: Arc<dyn DashboardApi>, formatter: NumberFormatter) -> Self {
        Self { api, formatter }
    }

    /// POST the form verbatim and build the result view.
    pub async fn submit(&self, form: &ComparisonForm) -> Result<ComparisonView, ComparisonError> {
        let result = self.api.compare_monthly_contribution(form).await?;
        info!(
            recommendation = result.recomendacao.tag(),
            months = result.monthly_breakdown_investimento.len(),
            "comparison received"
        );
        Ok(ComparisonView::from_result(&result, &self.formatter))
    }
}

/// Result panel state. A failed submission hides the previous result.
#[derive(Debug, Clone, Default)]
pub struct ComparisonPanel {
    view: Option<ComparisonView>,
    error: Option<String>,
    breakdown_visible: bool,
}

impl ComparisonPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, outcome: Result<ComparisonView, ComparisonError>) {
        match outcome {
            Ok(view) => {
                self.view = Some(view);
                self.error = None;
            }
            Err(err) => {
                warn!(error = %err, "comparison failed");
                self.view = None;
                self.error = Some(err.user_message());
            }
        }
    }

    pub fn view(&self) -> Option<&ComparisonView> {
        self.view.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn breakdown_visible(&self) -> bool {
        self.breakdown_visible
    }

    pub fn toggle_breakdown(&mut self) -> bool {
        self.breakdown_visible = !self.breakdown_visible;
        self.breakdown_visible
    }

    /// Write the monthly table to `dir` as `comparacao_aporte_mensal.csv`.
    pub fn export(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let view = self.view.as_ref().ok_or(ExportError::NothingToExport)?;
        export_table(&view.breakdown, dir, COMPARISON_FILENAME)
    }
}
