//! 실행 통계 구조체.

use crate::modules::pipeline::{FeedRun, PipelineOutcome};
use serde::Serialize;
use std::time::Duration;

/// 드라이버 실행 통계
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// 처리한 종목 수
    pub stocks: usize,
    /// 중단 신호로 건너뛴 종목 수
    pub stocks_skipped: usize,
    /// (종목, 피드) 실행 수
    pub runs: usize,
    /// DONE으로 끝난 실행 수
    pub done: usize,
    /// FAILED로 끝난 실행 수
    pub failed: usize,
    /// 삽입된 행 수
    pub inserted: usize,
    /// 중복으로 건너뛴 행 수
    pub skipped_duplicate: usize,
    /// 적재 실패한 행 수
    pub failed_rows: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 실행 결과 한 건을 반영합니다.
    pub fn record(&mut self, run: &FeedRun) {
        self.runs += 1;
        match &run.outcome {
            PipelineOutcome::Done(report) => {
                self.done += 1;
                self.inserted += report.inserted;
                self.skipped_duplicate += report.skipped_duplicate;
                self.failed_rows += report.failed;
            }
            PipelineOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// FAILED 실행이 하나라도 있는지.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            stocks = self.stocks,
            stocks_skipped = self.stocks_skipped,
            runs = self.runs,
            done = self.done,
            failed = self.failed,
            inserted = self.inserted,
            skipped_duplicate = self.skipped_duplicate,
            failed_rows = self.failed_rows,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}
