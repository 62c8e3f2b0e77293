//! 피드 파이프라인 공통 실행기.
//!
//! 모든 피드는 같은 순서를 따릅니다:
//!
//! ```text
//! FETCHED → FLATTENED → NORMALIZED → MERGED → SCALED → LOADED → DONE
//! ```
//!
//! 어느 단계에서든 에러가 나면 실행은 `FAILED(stage)`로 끝나고,
//! 드라이버는 결과를 기록한 뒤 다음 종목으로 넘어갑니다.
//! 적재 단계의 행 단위 실패는 실행을 실패시키지 않고 [`LoadReport`]에 집계됩니다.
//! 단계 안에서 난 패닉도 그 단계의 실패로 기록되며 다른 실행으로 번지지 않습니다.

use crate::config::WindowConfig;
use chrono::NaiveDate;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{error, info, Instrument};
use twstock_core::{
    feed_span, Feed, FiscalQuarter, FormatError, FormatResult, PeriodKey, StockIdentity, YearMonth,
};
use twstock_data::transform::{merge, FieldRule, PeriodKeySpec, Row};
use twstock_data::{
    load, DataError, ExtractionAdapter, FetchRequest, LoadReport, RawFragment, RowSink,
    StorableRecord,
};

/// 파이프라인 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Fetched,
    Flattened,
    Normalized,
    Merged,
    Scaled,
    Loaded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetched => "FETCHED",
            Self::Flattened => "FLATTENED",
            Self::Normalized => "NORMALIZED",
            Self::Merged => "MERGED",
            Self::Scaled => "SCALED",
            Self::Loaded => "LOADED",
        };
        write!(f, "{}", name)
    }
}

/// 실행 종료 상태.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PipelineOutcome {
    Done(LoadReport),
    Failed { stage: Stage, error: String },
}

impl PipelineOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// 적재 결과 (실패한 실행은 없음).
    pub fn report(&self) -> Option<&LoadReport> {
        match self {
            Self::Done(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(report) => write!(f, "DONE ({})", report),
            Self::Failed { stage, error } => write!(f, "FAILED({}): {}", stage, error),
        }
    }
}

/// (종목, 피드) 실행 한 건의 결과.
#[derive(Debug, Clone, Serialize)]
pub struct FeedRun {
    pub stock: StockIdentity,
    pub feed: Feed,
    pub outcome: PipelineOutcome,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// 단계 정보가 붙은 에러.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: DataError,
}

/// `Result`에 실패 단계를 붙입니다.
pub trait StageResultExt<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T, E: Into<DataError>> StageResultExt<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError {
            stage,
            error: e.into(),
        })
    }
}

/// 파이프라인 실행에 필요한 협력자.
///
/// 싱크는 호출자가 실행 단위로 만들어 넘기며, 실행이 끝나면 호출자가 해제합니다.
pub struct PipelineContext<'a> {
    pub adapter: &'a dyn ExtractionAdapter,
    pub sink: &'a dyn RowSink,
    pub windows: &'a WindowConfig,
}

/// 피드별 파이프라인 정의.
///
/// 실행 순서는 [`run_pipeline`]이 고정하고, 각 피드는 단계별 변환만 제공합니다.
pub trait FeedPipeline: Send + Sync {
    type Record: StorableRecord;

    fn feed(&self) -> Feed;

    /// 어댑터에 보낼 요청.
    fn request(&self, windows: &WindowConfig) -> FetchRequest;

    /// 열 투영, 기간 범위 필터, 패딩 (NORMALIZED).
    fn normalize(
        &self,
        tables: Vec<RawFragment>,
        windows: &WindowConfig,
    ) -> twstock_data::Result<Vec<RawFragment>>;

    /// 병합 키 (MERGED).
    fn join_key(&self) -> PeriodKeySpec;

    /// 병합된 행을 타입 있는 레코드로 변환 (SCALED).
    fn to_record(&self, stock: &StockIdentity, row: &Row) -> twstock_data::Result<Self::Record>;
}

/// 표 개수를 검증합니다.
pub fn expect_tables(tables: &[RawFragment], expected: usize, feed: Feed) -> twstock_data::Result<()> {
    if tables.len() == expected {
        Ok(())
    } else {
        Err(DataError::Markup(format!(
            "{}: 표 {}개를 기대했지만 {}개를 받았습니다",
            feed,
            expected,
            tables.len()
        )))
    }
}

/// 기간 열과 필드 표로 열 투영 목록을 만듭니다.
pub fn projection(
    period: (&'static str, &'static str),
    fields: &[FieldRule],
) -> Vec<(&'static str, &'static str)> {
    std::iter::once(period)
        .chain(fields.iter().map(|rule| (rule.source, rule.field)))
        .collect()
}

/// `column` 값이 조건을 만족하는 행만 남깁니다. 조건 해석 실패는 에러입니다.
pub fn filter_rows<F>(fragment: RawFragment, column: &str, mut keep: F) -> twstock_data::Result<RawFragment>
where
    F: FnMut(&str) -> FormatResult<bool>,
{
    let col = fragment.require_column(column)?;
    let mut kept = RawFragment::empty(fragment.header().clone());
    for row in fragment.rows() {
        if keep(&row[col])? {
            kept.push_row(row.clone());
        }
    }
    Ok(kept)
}

/// 연도 셀 (`2025`).
pub fn parse_year(raw: &str) -> FormatResult<i32> {
    let trimmed = raw.trim();
    if trimmed.len() != 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FormatError::period(raw, "연도는 4자리 숫자여야 합니다"));
    }
    trimmed
        .parse()
        .map_err(|_| FormatError::period(raw, "연도는 4자리 숫자여야 합니다"))
}

fn key_mismatch(row: &Row, expected: &str) -> DataError {
    DataError::Markup(format!("기간 키 {}는 {} 형식이 아닙니다", row.key, expected))
}

pub fn date_key(row: &Row) -> twstock_data::Result<NaiveDate> {
    match row.key {
        PeriodKey::Date(date) => Ok(date),
        _ => Err(key_mismatch(row, "날짜")),
    }
}

pub fn month_key(row: &Row) -> twstock_data::Result<YearMonth> {
    match row.key {
        PeriodKey::Month(month) => Ok(month),
        _ => Err(key_mismatch(row, "연-월")),
    }
}

pub fn quarter_key(row: &Row) -> twstock_data::Result<FiscalQuarter> {
    match row.key {
        PeriodKey::Quarter(quarter) => Ok(quarter),
        _ => Err(key_mismatch(row, "분기")),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "알 수 없는 패닉".to_string())
}

fn panicked(stage: Stage, payload: &(dyn Any + Send)) -> StageError {
    StageError {
        stage,
        error: DataError::Internal(format!("패닉: {}", panic_message(payload))),
    }
}

/// 동기 단계를 실행합니다. 패닉은 `stage`의 실패가 됩니다.
fn guarded<T>(stage: Stage, step: impl FnOnce() -> twstock_data::Result<T>) -> Result<T, StageError> {
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(result) => result.at(stage),
        Err(payload) => Err(panicked(stage, payload.as_ref())),
    }
}

async fn guarded_async<T>(
    stage: Stage,
    step: impl Future<Output = twstock_data::Result<T>>,
) -> Result<T, StageError> {
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(result) => result.at(stage),
        Err(payload) => Err(panicked(stage, payload.as_ref())),
    }
}

async fn execute<P: FeedPipeline>(
    pipeline: &P,
    ctx: &PipelineContext<'_>,
    stock: &StockIdentity,
) -> Result<LoadReport, StageError> {
    let request = pipeline.request(ctx.windows);
    let fetched = guarded_async(Stage::Fetched, ctx.adapter.fetch(stock, &request)).await?;

    let flattened = guarded(Stage::Flattened, || {
        Ok(fetched
            .into_iter()
            .map(RawFragment::flatten)
            .collect::<Vec<_>>())
    })?;

    let normalized = guarded(Stage::Normalized, || pipeline.normalize(flattened, ctx.windows))?;

    let rows = guarded(Stage::Merged, || merge(&normalized, &pipeline.join_key()))?;

    let records = guarded(Stage::Scaled, || {
        rows.iter()
            .map(|row| pipeline.to_record(stock, row))
            .collect::<twstock_data::Result<Vec<_>>>()
    })?;

    guarded_async(Stage::Loaded, async { Ok(load(ctx.sink, stock, &records).await) }).await
}

/// 한 종목에 대해 파이프라인을 실행합니다. 에러는 결과에 담기며 전파되지 않습니다.
pub async fn run_pipeline<P: FeedPipeline>(
    pipeline: &P,
    ctx: &PipelineContext<'_>,
    stock: &StockIdentity,
) -> FeedRun {
    let feed = pipeline.feed();
    let span = feed_span!("feed_run", feed, stock.public_code);

    async move {
        let start = Instant::now();

        let outcome = match execute(pipeline, ctx, stock).await {
            Ok(report) => {
                info!(
                    inserted = report.inserted,
                    skipped_duplicate = report.skipped_duplicate,
                    failed = report.failed,
                    "피드 적재 완료"
                );
                PipelineOutcome::Done(report)
            }
            Err(StageError { stage, error }) => {
                error!(stage = %stage, error = %error, "피드 실행 실패");
                PipelineOutcome::Failed {
                    stage,
                    error: error.to_string(),
                }
            }
        };

        FeedRun {
            stock: stock.clone(),
            feed,
            outcome,
            elapsed: start.elapsed(),
        }
    }
    .instrument(span)
    .await
}
