use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use painel::api::{ComparisonForm, DashboardApi};
use painel::catalog::{all_assets, describe_key, AssetKey};
use painel::chart::Surface;
use painel::clock::SystemClock;
use painel::compare::{ComparisonController, ComparisonPanel};
use painel::config::{default_config_path, ResolvedConfig};
use painel::duration::format_duration;
use painel::export::ExportError;
use painel::notify::{Level, Notifier};
use painel::session::DashboardSession;
use painel::table::RenderedTable;
use tabled::builder::Builder;
use tabled::settings::{object::Rows, Alignment, Modify, Style};
use tabled::{Table, Tabled};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "painel")]
#[command(about = "Central Financeira: indicator history and contribution comparisons")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and print indicator history
    History(HistoryArgs),
    /// Compare investing a monthly amount against amortizing a loan
    Compare(CompareArgs),
    /// Interactive dashboard
    Tui,
    /// List tracked assets
    Assets,
    /// Show current configuration
    Config,
}

#[derive(Args)]
struct HistoryArgs {
    /// First date (YYYY-MM-DD). Defaults to the configured span before --end.
    #[arg(long)]
    start: Option<String>,

    /// Last date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Comma-separated asset keys (e.g. selic,dolar). Defaults to the configured assets.
    #[arg(long)]
    assets: Option<String>,

    /// Also write the table as CSV to the export directory
    #[arg(long)]
    export: bool,
}

#[derive(Args)]
struct CompareArgs {
    /// Monthly amount available (e.g. 1.000,00)
    #[arg(long)]
    valor: String,

    /// Remaining loan installments
    #[arg(long)]
    parcelas: String,

    /// Monthly investment return rate, in percent
    #[arg(long)]
    taxa_rendimento: String,

    /// Monthly loan interest rate, in percent
    #[arg(long)]
    taxa_juros: String,

    /// Also write the monthly breakdown as CSV to the export directory
    #[arg(long)]
    export: bool,
}

#[derive(Tabled)]
struct AssetRow {
    #[tabled(rename = "Tecla")]
    hotkey: String,
    #[tabled(rename = "Chave")]
    key: String,
    #[tabled(rename = "Ativo")]
    label: String,
    #[tabled(rename = "Tipo")]
    kind: String,
    #[tabled(rename = "Cor")]
    color: String,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ResolvedConfig::load_or_default(&cli.config)?;

    match cli.command {
        Some(Command::History(args)) => run_history(&config, args).await,
        Some(Command::Compare(args)) => run_compare(&config, args).await,
        Some(Command::Tui) => {
            let session = new_session(&config)?;
            painel::tui::run_tui(session, &config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Assets) => {
            print_assets();
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Config) => {
            print_config(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("Painel - Central Financeira");
            println!("===========================\n");
            println!("Config: {}", config.config_path.display());
            println!("API: {}\n", config.api.base_url);
            println!("Commands:");
            println!("  history   Indicator history table");
            println!("  compare   Invest vs. amortize comparison");
            println!("  tui       Interactive dashboard");
            println!("  assets    List tracked assets");
            println!("  config    Show current configuration\n");
            println!("Run 'painel --help' for more options.");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn new_session(config: &ResolvedConfig) -> Result<DashboardSession> {
    let api: Arc<dyn DashboardApi> = Arc::new(config.client()?);
    Ok(DashboardSession::new(
        api,
        Arc::new(SystemClock),
        config.session_settings(),
    ))
}

async fn run_history(config: &ResolvedConfig, args: HistoryArgs) -> Result<ExitCode> {
    let mut session = new_session(config)?;
    let mut selection = session.default_selection();
    if args.start.is_some() {
        selection.start = args.start;
    }
    if args.end.is_some() {
        selection.end = args.end;
    }
    if let Some(assets) = args.assets.as_deref() {
        selection.assets = AssetKey::parse_list(assets);
    }

    let outcome = session.refresh(&selection).await;
    report_notification(session.notifier());
    let failed = outcome.is_error();

    if let Surface::Chart(chart) = session.canvas().surface() {
        let model = chart.model();
        let last = model.dates.len().saturating_sub(1);
        println!(
            "Gráfico: {} série(s), {} data(s) de {} a {}{}",
            model.datasets.len(),
            model.dates.len(),
            model.date_label(0).unwrap_or_default(),
            model.date_label(last).unwrap_or_default(),
            if model.is_mixed_kind() { " (unidades mistas)" } else { "" }
        );
    }
    print_rendered_table(session.table());

    if args.export && !failed {
        let result = session.export_history(&config.export_dir);
        report_notification(session.notifier());
        if let Err(err) = result {
            if !matches!(err, ExportError::NothingToExport) {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_compare(config: &ResolvedConfig, args: CompareArgs) -> Result<ExitCode> {
    let api: Arc<dyn DashboardApi> = Arc::new(config.client()?);
    let controller = ComparisonController::new(api, config.formatter());
    let form = ComparisonForm::new()
        .with(ComparisonForm::MONTHLY_AMOUNT, args.valor)
        .with(ComparisonForm::REMAINING_INSTALLMENTS, args.parcelas)
        .with(ComparisonForm::MONTHLY_RETURN_RATE, args.taxa_rendimento)
        .with(ComparisonForm::MONTHLY_LOAN_RATE, args.taxa_juros);

    let mut panel = ComparisonPanel::new();
    panel.apply(controller.submit(&form).await);
    if let Some(message) = panel.error() {
        eprintln!("erro: {message}");
        return Ok(ExitCode::FAILURE);
    }
    let Some(view) = panel.view() else {
        return Ok(ExitCode::FAILURE);
    };

    println!("{}", view.recommendation.headline);
    println!("{}", view.recommendation.sentence);
    println!();
    println!("Montante investido:        {}", view.invested);
    println!("Economia de juros:         {}", view.interest_saved);
    println!("Diferença:                 {}", view.difference);
    if let Some(months) = view.months {
        println!("Período:                   {months} meses");
    }
    println!();
    print_rendered_table(&view.breakdown);
    if let Some((invested, amortized)) = view.breakdown_mismatch {
        eprintln!(
            "aviso: detalhamento com tamanhos diferentes ({invested} meses de investimento, \
             {amortized} de amortização); meses ausentes exibidos como R$ 0,00"
        );
    }

    if args.export {
        match panel.export(&config.export_dir) {
            Ok(path) => println!("\nCSV exportado para {}", path.display()),
            Err(err @ ExportError::NothingToExport) => eprintln!("aviso: {err}"),
            Err(err) => {
                eprintln!("erro: {err}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report_notification(notifier: &Notifier) {
    let Some(notice) = notifier.current() else {
        return;
    };
    match notice.level {
        Level::Info | Level::Success => println!("{}", notice.message),
        Level::Warning | Level::Error => eprintln!("{}: {}", notice.level.label(), notice.message),
    }
}

fn print_rendered_table(table: &RenderedTable) {
    if let Some(message) = table.placeholder_message() {
        println!("{message}");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(table.header().into_iter().map(str::to_string));
    for row in table.data_rows() {
        builder.push_record(row.iter().cloned());
    }
    let table = builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn print_assets() {
    let rows: Vec<AssetRow> = all_assets()
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let descriptor = describe_key(key);
            AssetRow {
                hotkey: ((i + 1) % 10).to_string(),
                key: key.to_string(),
                label: descriptor.label,
                kind: descriptor.kind.label().to_string(),
                color: descriptor.color.hex(),
            }
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_config(config: &ResolvedConfig) -> Result<()> {
    let default_assets: Vec<String> = config
        .history
        .default_assets()
        .iter()
        .map(ToString::to_string)
        .collect();
    let output = serde_json::json!({
        "config_file": config.config_path.display().to_string(),
        "export_dir": config.export_dir.display().to_string(),
        "api": {
            "base_url": config.api.base_url,
            "timeout": config.api.timeout.map(format_duration),
        },
        "history": {
            "default_span_days": config.history.default_span_days,
            "default_assets": default_assets,
            "max_span_months": config.history.max_span_months,
        },
        "notifications": {
            "dismiss_after": format_duration(config.notifications.dismiss_after),
        },
        "display": {
            "decimal_places": config.display.decimal_places,
            "point_unit": config.display.point_unit,
        },
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
