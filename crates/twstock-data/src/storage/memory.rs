//! 인메모리 싱크.
//!
//! 키 열 기준 유일성을 PostgreSQL 제약과 같은 방식으로 강제합니다.
//! 테스트와 `--dry-run` 실행에 사용합니다.

use crate::error::{DataError, Result};
use crate::storage::{ColumnValue, RowSink, TableSpec};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

type StoredRow = Vec<(&'static str, ColumnValue)>;

#[derive(Default)]
struct Tables {
    keys: HashSet<(&'static str, Vec<ColumnValue>)>,
    rows: HashMap<&'static str, Vec<StoredRow>>,
}

/// 인메모리 행 싱크.
#[derive(Default)]
pub struct MemorySink {
    tables: Mutex<Tables>,
    /// 이 값을 가진 행은 영속성 오류로 거부 (장애 주입)
    rejected: Vec<(&'static str, ColumnValue)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지정한 열 값을 가진 행을 `Persistence` 오류로 거부하도록 설정합니다.
    pub fn fail_on(mut self, column: &'static str, value: ColumnValue) -> Self {
        self.rejected.push((column, value));
        self
    }

    /// 테이블에 저장된 행 수.
    pub async fn count(&self, table: &TableSpec) -> usize {
        let tables = self.tables.lock().await;
        tables.rows.get(table.name).map_or(0, Vec::len)
    }

    /// 테이블에 저장된 행 (삽입 순서).
    pub async fn rows(&self, table: &TableSpec) -> Vec<StoredRow> {
        let tables = self.tables.lock().await;
        tables.rows.get(table.name).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RowSink for MemorySink {
    async fn insert_row(&self, table: &TableSpec, columns: &[(&'static str, ColumnValue)]) -> Result<()> {
        if let Some((column, value)) = self
            .rejected
            .iter()
            .find(|rejected| columns.contains(rejected))
        {
            return Err(DataError::Persistence(format!(
                "{}: {} = {} 거부됨",
                table.name, column, value
            )));
        }

        let key = table
            .key_columns
            .iter()
            .map(|key_column| {
                columns
                    .iter()
                    .find(|(name, _)| name == key_column)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| DataError::MissingColumn(key_column.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut tables = self.tables.lock().await;
        if !tables.keys.insert((table.name, key.clone())) {
            let key_text = key.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
            return Err(DataError::DuplicateKey(format!("{} ({})", table.name, key_text)));
        }

        tables
            .rows
            .entry(table.name)
            .or_default()
            .push(columns.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DIVIDEND_TABLE, MONTHLY_REVENUE_TABLE};

    fn revenue_row(month: i64) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("stock_id", ColumnValue::Int(1)),
            ("year", ColumnValue::Int(2025)),
            ("month", ColumnValue::Int(month)),
            ("revenue_current", ColumnValue::Decimal(None)),
        ]
    }

    #[tokio::test]
    async fn test_unique_key_enforced() {
        let sink = MemorySink::new();

        sink.insert_row(&MONTHLY_REVENUE_TABLE, &revenue_row(9)).await.unwrap();
        sink.insert_row(&MONTHLY_REVENUE_TABLE, &revenue_row(8)).await.unwrap();
        let err = sink
            .insert_row(&MONTHLY_REVENUE_TABLE, &revenue_row(9))
            .await
            .unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(sink.count(&MONTHLY_REVENUE_TABLE).await, 2);
        assert_eq!(sink.count(&DIVIDEND_TABLE).await, 0);
    }

    #[tokio::test]
    async fn test_missing_key_column() {
        let sink = MemorySink::new();
        let err = sink
            .insert_row(&DIVIDEND_TABLE, &[("stock_id", ColumnValue::Int(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(_)));
    }

    #[tokio::test]
    async fn test_fail_on_injection() {
        let sink = MemorySink::new().fail_on("month", ColumnValue::Int(8));

        assert!(sink.insert_row(&MONTHLY_REVENUE_TABLE, &revenue_row(9)).await.is_ok());
        let err = sink
            .insert_row(&MONTHLY_REVENUE_TABLE, &revenue_row(8))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Persistence(_)));
    }
}
