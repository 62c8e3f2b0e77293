//! 수집 드라이버.
//!
//! 선택된 종목마다 선택된 피드 파이프라인을 순서대로 실행합니다.
//! 한 실행의 실패는 기록만 하고 다음 피드, 다음 종목으로 진행합니다.
//! 중단 신호를 받으면 새 종목은 시작하지 않고, 진행 중인 종목은 끝까지 처리합니다.

use crate::config::{DriverConfig, WindowConfig};
use crate::modules::daily_quote::{current_month, DailyQuotePipeline};
use crate::modules::dividend::DividendPipeline;
use crate::modules::monthly_revenue::MonthlyRevenuePipeline;
use crate::modules::pipeline::{run_pipeline, FeedRun, PipelineContext, PipelineOutcome, Stage};
use crate::modules::quarterly_balance::QuarterlyBalancePipeline;
use crate::modules::quarterly_income::QuarterlyIncomePipeline;
use crate::stats::RunStats;
use futures::stream::{self, StreamExt};
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use twstock_core::{Feed, StockIdentity, YearMonth};
use twstock_data::{ExtractionAdapter, MemorySink, PgRowSink, RowSink};

/// 실행마다 싱크를 내주는 공급자.
#[derive(Clone)]
pub enum SinkProvider {
    /// 실행마다 풀에서 연결 하나를 획득하고, 실행이 끝나면 반환합니다.
    Postgres(PgPool),
    /// 모든 실행이 공유하는 인메모리 싱크 (`--dry-run`, 테스트).
    Memory(Arc<MemorySink>),
}

impl SinkProvider {
    async fn acquire(&self) -> twstock_data::Result<Arc<dyn RowSink>> {
        match self {
            Self::Postgres(pool) => Ok(Arc::new(PgRowSink::acquire(pool).await?)),
            Self::Memory(sink) => Ok(sink.clone()),
        }
    }
}

/// 수집 드라이버.
pub struct Collector {
    adapter: Arc<dyn ExtractionAdapter>,
    sinks: SinkProvider,
    windows: WindowConfig,
    feeds: Vec<Feed>,
    concurrency: usize,
    request_delay: Duration,
    current_month: YearMonth,
}

impl Collector {
    pub fn new(
        adapter: Arc<dyn ExtractionAdapter>,
        sinks: SinkProvider,
        windows: WindowConfig,
        driver: &DriverConfig,
    ) -> Self {
        Self {
            adapter,
            sinks,
            windows,
            feeds: Feed::ALL.to_vec(),
            concurrency: driver.concurrency.max(1),
            request_delay: driver.request_delay(),
            current_month: current_month(),
        }
    }

    /// 실행할 피드를 제한합니다. 순서는 [`Feed::ALL`]을 따르고, 빈 목록이면 전체 피드를 실행합니다.
    pub fn with_feeds(mut self, feeds: Vec<Feed>) -> Self {
        if !feeds.is_empty() {
            self.feeds = Feed::ALL
                .iter()
                .copied()
                .filter(|feed| feeds.contains(feed))
                .collect();
        }
        self
    }

    /// 일시세 요청의 기준 월을 고정합니다.
    pub fn with_current_month(mut self, month: YearMonth) -> Self {
        self.current_month = month;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    /// 피드 하나를 실행합니다. 싱크는 이 실행 동안만 보유합니다.
    pub async fn run_feed(&self, stock: &StockIdentity, feed: Feed) -> FeedRun {
        let sink = match self.sinks.acquire().await {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!(stock = %stock.public_code, feed = %feed, error = %e, "싱크 획득 실패");
                return FeedRun {
                    stock: stock.clone(),
                    feed,
                    outcome: PipelineOutcome::Failed {
                        stage: Stage::Loaded,
                        error: e.to_string(),
                    },
                    elapsed: Duration::ZERO,
                };
            }
        };

        let ctx = PipelineContext {
            adapter: self.adapter.as_ref(),
            sink: sink.as_ref(),
            windows: &self.windows,
        };

        match feed {
            Feed::DailyQuote => {
                run_pipeline(&DailyQuotePipeline::new(self.current_month), &ctx, stock).await
            }
            Feed::Dividend => run_pipeline(&DividendPipeline, &ctx, stock).await,
            Feed::MonthlyRevenue => run_pipeline(&MonthlyRevenuePipeline, &ctx, stock).await,
            Feed::QuarterlyBalance => run_pipeline(&QuarterlyBalancePipeline, &ctx, stock).await,
            Feed::QuarterlyIncome => run_pipeline(&QuarterlyIncomePipeline, &ctx, stock).await,
        }
    }

    /// 한 종목의 피드를 모두 실행합니다.
    pub async fn run_stock(&self, stock: &StockIdentity) -> Vec<FeedRun> {
        let mut runs = Vec::with_capacity(self.feeds.len());
        for &feed in &self.feeds {
            runs.push(self.run_feed(stock, feed).await);
        }
        runs
    }

    /// 종목 목록 전체를 실행합니다.
    ///
    /// `stop`이 켜지면 아직 시작하지 않은 종목은 건너뜁니다.
    pub async fn run(&self, stocks: Vec<StockIdentity>, stop: Arc<AtomicBool>) -> RunStats {
        let start = Instant::now();
        let mut stats = RunStats::new();
        let total = stocks.len();

        if stocks.is_empty() {
            tracing::warn!("수집할 종목이 없습니다");
            return stats;
        }

        tracing::info!(
            stocks = total,
            feeds = ?self.feeds,
            concurrency = self.concurrency,
            "수집 시작"
        );

        let mut results = stream::iter(stocks.into_iter().enumerate())
            .map(|(idx, stock)| {
                let stop = Arc::clone(&stop);
                async move {
                    if stop.load(Ordering::SeqCst) {
                        tracing::debug!(stock = %stock.public_code, "중단 신호, 종목 건너뜀");
                        return None;
                    }

                    tracing::debug!(
                        stock = %stock.public_code,
                        progress = format!("{}/{}", idx + 1, total),
                        "종목 수집 시작"
                    );
                    let runs = self.run_stock(&stock).await;

                    // Rate limiting
                    if !self.request_delay.is_zero() {
                        tokio::time::sleep(self.request_delay).await;
                    }
                    Some(runs)
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some(result) = results.next().await {
            match result {
                Some(runs) => {
                    stats.stocks += 1;
                    for run in &runs {
                        stats.record(run);
                    }
                }
                None => stats.stocks_skipped += 1,
            }
        }

        stats.elapsed = start.elapsed();
        stats
    }
}
