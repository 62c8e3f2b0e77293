//! 기간 키 기반 병합.
//!
//! 따로 추출된 여러 표(예: 자산/부채/자본 탭)를 기간 키로 내부 조인합니다.
//! 한 표라도 빠진 기간은 결과에 나타나지 않습니다. 부분 데이터가 필요한 호출자는
//! [`pad_missing_periods`]로 센티널 행을 미리 채워야 합니다.

use crate::error::{DataError, Result};
use crate::fragment::RawFragment;
use crate::transform::normalize::{parse_date, FieldRule};
use crate::transform::scale::scale;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use twstock_core::{Calendar, FiscalQuarter, FormatResult, PeriodKey, YearMonth};

/// 기간 키의 원시 표기 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    /// `Y/M/D` 날짜
    Date(Calendar),
    /// `YYYY/MM`
    Month,
    /// `YYYY/QN`
    Quarter,
}

/// 조인 키 명세: 어느 열을 어떤 형식으로 해석할지.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodKeySpec {
    pub column: String,
    pub kind: PeriodKind,
}

impl PeriodKeySpec {
    pub fn new(column: impl Into<String>, kind: PeriodKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }

    /// 원시 셀에서 기간 키를 도출합니다.
    pub fn derive(&self, raw: &str) -> FormatResult<PeriodKey> {
        match self.kind {
            PeriodKind::Date(calendar) => parse_date(raw, calendar).map(PeriodKey::Date),
            PeriodKind::Month => YearMonth::parse(raw).map(PeriodKey::Month),
            PeriodKind::Quarter => FiscalQuarter::parse(raw).map(PeriodKey::Quarter),
        }
    }
}

/// 병합 결과 행.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: PeriodKey,
    cells: Vec<(String, String)>,
}

impl Row {
    /// 열 값을 조회합니다.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// 열 값을 조회하고, 없으면 [`DataError::MissingColumn`]을 반환합니다.
    pub fn require(&self, column: &str) -> Result<&str> {
        self.get(column)
            .ok_or_else(|| DataError::MissingColumn(column.to_string()))
    }

    /// 필드 규칙으로 해석하고 환산한 값.
    pub fn scaled(&self, rule: &FieldRule) -> Result<Option<Decimal>> {
        let raw = self.require(rule.field)?;
        let value = rule.parse(raw)?;
        Ok(scale(value, rule.scale)?)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }
}

/// 한 표를 기간 키 순서대로 인덱싱합니다. 같은 기간이 반복되면 첫 행을 씁니다.
fn index_table(
    table: &RawFragment,
    spec: &PeriodKeySpec,
) -> Result<(Vec<PeriodKey>, HashMap<PeriodKey, usize>)> {
    let key_col = table.require_column(&spec.column)?;
    let mut order = Vec::with_capacity(table.len());
    let mut positions = HashMap::with_capacity(table.len());

    for (i, row) in table.rows().iter().enumerate() {
        let key = spec.derive(&row[key_col])?;
        if positions.contains_key(&key) {
            debug!(period = %key, "중복 기간 행 무시");
            continue;
        }
        positions.insert(key, i);
        order.push(key);
    }

    Ok((order, positions))
}

/// 여러 표를 기간 키로 내부 조인합니다.
///
/// 결과 순서는 첫 번째 표의 행 순서를 따릅니다. 키 열은 한 번만 포함되고,
/// 이름이 겹치는 나머지 열은 앞선 표의 값을 씁니다.
pub fn merge(tables: &[RawFragment], join_key: &PeriodKeySpec) -> Result<Vec<Row>> {
    let Some((first, rest)) = tables.split_first() else {
        return Ok(Vec::new());
    };

    let (order, first_positions) = index_table(first, join_key)?;
    let others = rest
        .iter()
        .map(|table| index_table(table, join_key).map(|(_, positions)| positions))
        .collect::<Result<Vec<_>>>()?;

    let names: Vec<Vec<String>> = tables.iter().map(|t| t.header().flat_names()).collect();

    let mut merged = Vec::new();
    for key in order {
        if !others.iter().all(|positions| positions.contains_key(&key)) {
            continue;
        }

        let mut cells: Vec<(String, String)> = Vec::new();
        let row_indices = std::iter::once(first_positions[&key])
            .chain(others.iter().map(|positions| positions[&key]));

        for ((table, table_names), row_idx) in tables.iter().zip(&names).zip(row_indices) {
            let row = &table.rows()[row_idx];
            for (name, value) in table_names.iter().zip(row) {
                let name = name.trim();
                if cells.iter().any(|(existing, _)| existing == name) {
                    continue;
                }
                cells.push((name.to_string(), value.clone()));
            }
        }

        merged.push(Row { key, cells });
    }

    Ok(merged)
}

/// `reference`에는 있지만 `target`에 없는 기간을 센티널 행으로 채웁니다.
///
/// 추가되는 행의 키 셀은 `reference`의 원시 값을 그대로 쓰고 나머지 셀은 비워둡니다.
/// 빈 셀은 정규화 단계에서 부재로 해석됩니다. 추가된 행 수를 반환합니다.
pub fn pad_missing_periods(
    target: &mut RawFragment,
    reference: &RawFragment,
    join_key: &PeriodKeySpec,
) -> Result<usize> {
    let target_col = target.require_column(&join_key.column)?;
    let reference_col = reference.require_column(&join_key.column)?;

    let mut present: HashSet<PeriodKey> = target
        .rows()
        .iter()
        .map(|row| join_key.derive(&row[target_col]))
        .collect::<FormatResult<_>>()?;

    let width = target.header().len();
    let mut padded = 0;
    for row in reference.rows() {
        let raw_key = &row[reference_col];
        let key = join_key.derive(raw_key)?;
        if present.insert(key) {
            let mut sentinel = vec![String::new(); width];
            sentinel[target_col] = raw_key.clone();
            target.push_row(sentinel);
            padded += 1;
        }
    }

    Ok(padded)
}
