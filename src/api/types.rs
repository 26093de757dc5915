use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `GET /api/historico`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub historico: Vec<HistoryRecord>,
}

/// One row as sent by the server: a date plus one field per asset.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    pub data: String,
    #[serde(flatten)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Error body sent with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

/// Comparison form as submitted: arbitrary string fields, passed through
/// verbatim because the server parses the pt-BR number formats itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ComparisonForm {
    fields: BTreeMap<String, String>,
}

impl ComparisonForm {
    pub const MONTHLY_AMOUNT: &'static str = "valor_disponivel_mensal";
    pub const REMAINING_INSTALLMENTS: &'static str = "num_parcelas_restantes";
    pub const MONTHLY_RETURN_RATE: &'static str = "taxa_rendimento_mensal";
    pub const MONTHLY_LOAN_RATE: &'static str = "taxa_juros_financiamento_mensal";

    /// Fields of the contribution-vs-amortization form, in display order.
    pub const FIELDS: [&'static str; 4] = [
        Self::MONTHLY_AMOUNT,
        Self::REMAINING_INSTALLMENTS,
        Self::MONTHLY_RETURN_RATE,
        Self::MONTHLY_LOAN_RATE,
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ComparisonForm {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Body of a successful `POST /api/comparar-aporte-mensal`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComparisonResult {
    #[serde(default)]
    pub montante_investido: Option<f64>,
    #[serde(default)]
    pub economia_juros_amortizacao: Option<f64>,
    #[serde(default)]
    pub diferenca: Option<f64>,
    pub recomendacao: Recommendation,
    #[serde(default)]
    pub periodo_meses: Option<u32>,
    #[serde(default)]
    pub monthly_breakdown_investimento: Vec<InvestmentMonth>,
    /// May be shorter than the investment path, or absent.
    #[serde(default)]
    pub monthly_breakdown_amortizacao: Option<Vec<AmortizationMonth>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InvestmentMonth {
    pub mes: u32,
    pub valor_acumulado: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AmortizationMonth {
    pub mes: u32,
    pub economia_acumulada_equivalente: Option<f64>,
}

/// Three-way recommendation tag. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Recommendation {
    Invest,
    Amortize,
    Indifferent,
    Other(String),
}

impl From<String> for Recommendation {
    fn from(value: String) -> Self {
        match value.as_str() {
            "INVESTIR" => Self::Invest,
            "AMORTIZAR" => Self::Amortize,
            "INDIFERENTE" => Self::Indifferent,
            _ => Self::Other(value),
        }
    }
}

impl Recommendation {
    pub fn tag(&self) -> &str {
        match self {
            Self::Invest => "INVESTIR",
            Self::Amortize => "AMORTIZAR",
            Self::Indifferent => "INDIFERENTE",
            Self::Other(tag) => tag,
        }
    }
}
