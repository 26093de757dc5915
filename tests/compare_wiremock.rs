use std::sync::Arc;

use anyhow::Result;
use painel::api::{ComparisonForm, DashboardClient};
use painel::compare::{
    ComparisonController, ComparisonPanel, Highlight, BREAKDOWN_COLUMNS, BREAKDOWN_EMPTY_MESSAGE,
};
use painel::export::COMPARISON_FILENAME;
use painel::format::NumberFormatter;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn controller(server: &MockServer) -> ComparisonController {
    ComparisonController::new(
        Arc::new(DashboardClient::new(server.uri())),
        NumberFormatter::default(),
    )
}

fn form() -> ComparisonForm {
    ComparisonForm::new()
        .with(ComparisonForm::MONTHLY_AMOUNT, "1.000,00")
        .with(ComparisonForm::REMAINING_INSTALLMENTS, "5")
        .with(ComparisonForm::MONTHLY_RETURN_RATE, "0,8")
        .with(ComparisonForm::MONTHLY_LOAN_RATE, "1,1")
}

#[tokio::test]
async fn form_is_posted_verbatim_and_amortize_is_danger() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/comparar-aporte-mensal"))
        .and(body_json(json!({
            "valor_disponivel_mensal": "1.000,00",
            "num_parcelas_restantes": "5",
            "taxa_rendimento_mensal": "0,8",
            "taxa_juros_financiamento_mensal": "1,1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "montante_investido": 5080.64,
            "economia_juros_amortizacao": 5166.75,
            "diferenca": 86.11,
            "recomendacao": "AMORTIZAR",
            "periodo_meses": 5,
            "monthly_breakdown_investimento": [
                {"mes": 1, "valor_acumulado": 1000.0},
                {"mes": 2, "valor_acumulado": 2008.0},
                {"mes": 3, "valor_acumulado": 3024.06},
                {"mes": 4, "valor_acumulado": 4048.25},
                {"mes": 5, "valor_acumulado": 5080.64}
            ],
            "monthly_breakdown_amortizacao": [
                {"mes": 1, "economia_acumulada_equivalente": 1011.0},
                {"mes": 2, "economia_acumulada_equivalente": 2033.12},
                {"mes": 3, "economia_acumulada_equivalente": 3066.49}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let view = controller(&server).submit(&form()).await?;

    assert_eq!(view.recommendation.highlight, Highlight::Danger);
    assert_eq!(view.recommendation.headline, "É melhor amortizar!");
    assert_eq!(view.recommendation.sentence, "Você economizaria R$ 86,11 amortizando.");
    assert_eq!(view.invested, "R$ 5.080,64");
    assert_eq!(view.months, Some(5));

    assert_eq!(view.breakdown.header(), BREAKDOWN_COLUMNS.to_vec());
    let rows: Vec<&[String]> = view.breakdown.data_rows().collect();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0], ["1", "R$ 1.000,00", "R$ 1.011,00"]);
    assert_eq!(rows[3][2], "R$ 0,00");
    assert_eq!(rows[4][2], "R$ 0,00");
    assert_eq!(view.breakdown_mismatch, Some((5, 3)));

    Ok(())
}

#[tokio::test]
async fn missing_amortization_path_shows_placeholder() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/comparar-aporte-mensal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "montante_investido": 100.0,
            "economia_juros_amortizacao": 100.0,
            "diferenca": 0.0,
            "recomendacao": "INDIFERENTE",
            "monthly_breakdown_investimento": [{"mes": 1, "valor_acumulado": 100.0}]
        })))
        .mount(&server)
        .await;

    let view = controller(&server).submit(&form()).await?;
    assert_eq!(view.recommendation.highlight, Highlight::Neutral);
    assert_eq!(
        view.breakdown.placeholder_message(),
        Some(BREAKDOWN_EMPTY_MESSAGE)
    );

    Ok(())
}

#[tokio::test]
async fn server_error_hides_result_with_message() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/comparar-aporte-mensal"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "Número de parcelas inválido."})),
        )
        .mount(&server)
        .await;

    let mut panel = ComparisonPanel::new();
    panel.apply(controller(&server).submit(&form()).await);
    assert!(panel.view().is_none());
    assert_eq!(panel.error(), Some("Número de parcelas inválido."));

    Ok(())
}

#[tokio::test]
async fn error_without_message_is_unknown() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/comparar-aporte-mensal"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = controller(&server).submit(&form()).await.unwrap_err();
    assert_eq!(err.user_message(), "Erro desconhecido.");

    Ok(())
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() -> Result<()> {
    // Reserve a free port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let uri = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let controller = ComparisonController::new(
        Arc::new(DashboardClient::new(uri)),
        NumberFormatter::default(),
    );
    let err = controller.submit(&form()).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Erro ao comunicar com o servidor. Tente novamente."
    );

    Ok(())
}

#[tokio::test]
async fn undecodable_success_body_reads_as_communication_failure() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/comparar-aporte-mensal"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>manutenção</html>"))
        .mount(&server)
        .await;

    let err = controller(&server).submit(&form()).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Erro ao comunicar com o servidor. Tente novamente."
    );

    Ok(())
}

#[tokio::test]
async fn breakdown_exports_to_fixed_filename() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/comparar-aporte-mensal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "montante_investido": 1010.0,
            "economia_juros_amortizacao": 1005.0,
            "diferenca": 5.0,
            "recomendacao": "INVESTIR",
            "monthly_breakdown_investimento": [{"mes": 1, "valor_acumulado": 1010.0}],
            "monthly_breakdown_amortizacao": [{"mes": 1, "economia_acumulada_equivalente": 1005.0}]
        })))
        .mount(&server)
        .await;

    let mut panel = ComparisonPanel::new();
    panel.apply(controller(&server).submit(&form()).await);
    assert_eq!(
        panel.view().unwrap().recommendation.sentence,
        "Você teria R$ 5,00 a mais investindo."
    );

    let dir = tempfile::tempdir()?;
    let path = panel.export(dir.path())?;
    assert!(path.ends_with(COMPARISON_FILENAME));
    let text = String::from_utf8(std::fs::read(&path)?)?;
    assert!(text.ends_with("\"1\";\"R$ 1.010,00\";\"R$ 1.005,00\""));

    Ok(())
}
