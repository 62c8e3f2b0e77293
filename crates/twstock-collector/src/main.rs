//! 대만 주식 피드 수집기 CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use twstock_collector::modules::{self, Collector, SinkProvider};
use twstock_collector::{CollectorConfig, RunStats};
use twstock_core::{init_logging, Feed, LogConfig, LogFormat};
use twstock_data::{
    connect_pool, CmoneyTableAdapter, DatabaseConfig, FeedRouter, HttpPageRenderer, MemoryCatalog,
    MemorySink, PgStockCatalog, StockCatalog, TwseClient,
};

#[derive(Parser)]
#[command(name = "twstock-collector")]
#[command(about = "Taiwan stock feed collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// 피드 수집 및 적재
    Run {
        /// 특정 종목만 수집 (예: "2330")
        #[arg(long)]
        stock: Option<String>,

        /// 수집할 피드 (쉼표로 구분, 예: "dividend,revenue")
        #[arg(long, value_delimiter = ',')]
        feeds: Vec<Feed>,

        /// 저장하지 않고 인메모리 싱크로 실행
        #[arg(long)]
        dry_run: bool,

        /// 동시에 처리할 종목 수 (기본: CONCURRENCY 환경변수)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// 종목 CSV를 카탈로그에 가져오기
    ImportCatalog {
        /// CSV 경로 (기본: CATALOG_CSV 환경변수)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// 활성 종목 목록 출력
    ListStocks,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(
        LogConfig::new(format!(
            "twstock_collector={0},twstock_data={0}",
            cli.log_level
        ))
        .with_format(cli.log_format),
    )?;

    tracing::info!("TwStock Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(windows = ?config.windows, "설정 로드 완료");

    let exit = match cli.command {
        Commands::Run {
            stock,
            feeds,
            dry_run,
            concurrency,
        } => {
            let stats = if dry_run {
                run_dry(&config, stock.as_deref(), feeds, concurrency).await?
            } else {
                run_with_database(&config, stock.as_deref(), feeds, concurrency).await?
            };
            stats.log_summary(if dry_run { "피드 수집 (dry-run)" } else { "피드 수집" });

            if stats.has_failures() {
                tracing::warn!(failed = stats.failed, "실패한 파이프라인이 있습니다");
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Commands::ImportCatalog { csv } => {
            let pool = connect(&config).await?;
            let catalog = PgStockCatalog::new(pool.clone());
            let path = csv.unwrap_or_else(|| config.driver.catalog_csv.clone());
            let report = modules::import_catalog(&catalog, &path).await?;
            pool.close().await;

            if report.failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Commands::ListStocks => {
            let pool = connect(&config).await?;
            let catalog = PgStockCatalog::new(pool.clone());
            for stock in catalog.list_stocks().await? {
                println!("{}\t{}", stock.internal_id, stock.public_code);
            }
            pool.close().await;
            ExitCode::SUCCESS
        }
    };

    tracing::info!("TwStock Collector 종료");
    Ok(exit)
}

async fn connect(config: &CollectorConfig) -> Result<sqlx::PgPool, Box<dyn std::error::Error>> {
    let url = config.require_database_url()?;
    let pool = connect_pool(&DatabaseConfig::new(url, config.db_max_connections)).await?;
    Ok(pool)
}

fn build_router(config: &CollectorConfig) -> Result<FeedRouter, Box<dyn std::error::Error>> {
    let sources = &config.sources;
    let quotes = TwseClient::new(sources.twse_base_url.clone(), sources.http_timeout())?;
    let renderer = HttpPageRenderer::new(sources.render_endpoint.clone(), sources.http_timeout())?;
    let statements = CmoneyTableAdapter::new(renderer, sources.cmoney_base_url.clone());

    Ok(FeedRouter::new(Arc::new(quotes), Arc::new(statements)))
}

/// Ctrl-C를 받으면 켜지는 중단 플래그.
fn stop_on_ctrl_c() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("종료 신호 수신, 새 종목은 시작하지 않습니다");
            flag.store(true, Ordering::SeqCst);
        }
    });
    stop
}

fn build_collector(
    config: &CollectorConfig,
    sinks: SinkProvider,
    feeds: Vec<Feed>,
    concurrency: Option<usize>,
) -> Result<Collector, Box<dyn std::error::Error>> {
    let mut collector = Collector::new(
        Arc::new(build_router(config)?),
        sinks,
        config.windows.clone(),
        &config.driver,
    )
    .with_feeds(feeds);

    if let Some(concurrency) = concurrency {
        collector = collector.with_concurrency(concurrency);
    }
    Ok(collector)
}

async fn run_with_database(
    config: &CollectorConfig,
    stock: Option<&str>,
    feeds: Vec<Feed>,
    concurrency: Option<usize>,
) -> Result<RunStats, Box<dyn std::error::Error>> {
    let pool = connect(config).await?;
    let catalog = PgStockCatalog::new(pool.clone());

    modules::ensure_catalog(&catalog, &config.driver.catalog_csv).await?;
    let stocks = modules::select_stocks(&catalog, stock).await?;

    let collector = build_collector(config, SinkProvider::Postgres(pool.clone()), feeds, concurrency)?;
    let stats = collector.run(stocks, stop_on_ctrl_c()).await;

    pool.close().await;
    Ok(stats)
}

async fn run_dry(
    config: &CollectorConfig,
    stock: Option<&str>,
    feeds: Vec<Feed>,
    concurrency: Option<usize>,
) -> Result<RunStats, Box<dyn std::error::Error>> {
    let catalog = MemoryCatalog::new();
    modules::import_catalog(&catalog, &config.driver.catalog_csv).await?;
    let stocks = modules::select_stocks(&catalog, stock).await?;

    let sink = Arc::new(MemorySink::new());
    let collector = build_collector(config, SinkProvider::Memory(sink), feeds, concurrency)?;
    Ok(collector.run(stocks, stop_on_ctrl_c()).await)
}
