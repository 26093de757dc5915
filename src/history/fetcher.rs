use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::debug;

use crate::api::{ApiError, DashboardApi};

use super::filters::HistoryQuery;
use super::series::Series;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Nenhum dado encontrado para os filtros selecionados.")]
    EmptyResult,
}

impl FetchError {
    /// Message shown to the user: status and server message when present.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Status { status, message }) => match message {
                Some(message) => format!("Erro ao carregar o histórico ({status}): {message}"),
                None => format!("Erro ao carregar o histórico ({status})."),
            },
            Self::Api(ApiError::Transport(_)) => {
                "Ocorreu um erro ao conectar-se ao servidor.".to_string()
            }
            Self::Api(ApiError::Decode(_)) => {
                "Ocorreu um erro ao processar os dados recebidos.".to_string()
            }
            Self::EmptyResult => self.to_string(),
        }
    }
}

/// Issue the history request and normalize the response.
///
/// An empty `historico` array is a failure, not an empty success.
pub async fn fetch_history(
    api: &dyn DashboardApi,
    query: &HistoryQuery,
) -> Result<Series, FetchError> {
    let response = api.fetch_history(query).await?;
    let series = Series::from_records(response.historico);
    if series.is_empty() {
        return Err(FetchError::EmptyResult);
    }
    debug!(points = series.len(), "history fetched");
    Ok(series)
}

/// Identifies one issued request; only the most recent one may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic source of [`RequestToken`]s giving last-request-wins ordering
/// for overlapping fetches that cannot be cancelled.
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: AtomicU64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True if no request has been issued after `token`.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_token_is_current() {
        let sequence = RequestSequence::new();
        let first = sequence.next();
        assert!(sequence.is_current(first));

        let second = sequence.next();
        assert!(second > first);
        assert!(!sequence.is_current(first));
        assert!(sequence.is_current(second));
    }

    #[test]
    fn status_message_includes_server_error() {
        let err = FetchError::Api(ApiError::Status {
            status: 500,
            message: Some("Erro no banco de dados.".to_string()),
        });
        assert_eq!(
            err.user_message(),
            "Erro ao carregar o histórico (500): Erro no banco de dados."
        );
        assert_eq!(
            FetchError::EmptyResult.user_message(),
            "Nenhum dado encontrado para os filtros selecionados."
        );
    }
}
