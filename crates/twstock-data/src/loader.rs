//! 멱등 적재기.
//!
//! 각 행은 독립적인 작업 단위입니다. 유일성 충돌은 정상적인 건너뜀이고,
//! 그 외 저장 실패는 해당 행만 실패로 집계한 뒤 다음 행으로 진행합니다.
//! 같은 행 집합으로 다시 호출하면 새로 저장되는 행은 없습니다.

use crate::storage::{RowSink, StorableRecord};
use serde::Serialize;
use std::fmt;
use std::ops::AddAssign;
use tracing::{debug, error};
use twstock_core::StockIdentity;

/// 적재 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub inserted: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
}

impl LoadReport {
    /// 처리한 전체 행 수.
    pub fn total(&self) -> usize {
        self.inserted + self.skipped_duplicate + self.failed
    }
}

impl AddAssign for LoadReport {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.skipped_duplicate += other.skipped_duplicate;
        self.failed += other.failed;
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted={}, skipped_duplicate={}, failed={}",
            self.inserted, self.skipped_duplicate, self.failed
        )
    }
}

/// 정규화된 레코드를 싱크에 적재합니다.
///
/// 다른 종목 소유의 레코드는 저장하지 않고 실패로 집계합니다.
pub async fn load<R: StorableRecord>(
    sink: &dyn RowSink,
    stock: &StockIdentity,
    rows: &[R],
) -> LoadReport {
    let table = R::table();
    let mut report = LoadReport::default();

    for row in rows {
        let period = row.period_key();

        if row.stock_id() != stock.internal_id {
            error!(
                stock = %stock,
                table = table.name,
                period = %period,
                owner = row.stock_id(),
                "다른 종목의 레코드"
            );
            report.failed += 1;
            continue;
        }

        match sink.insert_row(table, &row.columns()).await {
            Ok(()) => report.inserted += 1,
            Err(e) if e.is_duplicate() => {
                debug!(stock = %stock, table = table.name, period = %period, "이미 저장된 행 건너뜀");
                report.skipped_duplicate += 1;
            }
            Err(e) => {
                error!(stock = %stock, table = table.name, period = %period, error = %e, "행 저장 실패");
                report.failed += 1;
            }
        }
    }

    report
}
