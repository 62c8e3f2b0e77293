//! 분기 재무상태표 파이프라인.
//!
//! 자산, 부채, 자본 탭을 각각 가져와 분기 키로 병합합니다.
//! 탭마다 연간 합계 열(기간에 `/`가 없음)이 섞여 있어 NORMALIZED에서 걸러냅니다.

use crate::config::WindowConfig;
use crate::modules::pipeline::{expect_tables, filter_rows, projection, quarter_key, FeedPipeline};
use twstock_core::{Feed, FiscalQuarter, QuarterlyBalance, StockIdentity};
use twstock_data::transform::{FieldRule, PeriodKeySpec, PeriodKind, Row, ScaleSpec};
use twstock_data::{FetchRequest, RawFragment};

pub(crate) const PERIOD_COLUMN: (&str, &str) = ("日期", "period");

const ASSETS: FieldRule =
    FieldRule::number("總資產", "total_assets").scaled(ScaleSpec::QuarterlyStatement);
const LIABILITIES: FieldRule =
    FieldRule::number("總負債", "total_liabilities").scaled(ScaleSpec::QuarterlyStatement);
const EQUITY: FieldRule =
    FieldRule::number("股東權益(淨值)", "total_equity").scaled(ScaleSpec::QuarterlyStatement);

/// 탭 순서와 같은 순서의 필드.
const TAB_FIELDS: [FieldRule; 3] = [ASSETS, LIABILITIES, EQUITY];

/// 분기 행만 남기고 최소 회계연도 이전은 제외합니다.
pub(crate) fn quarters_since(
    mut fragment: RawFragment,
    column: &str,
    min_year: i32,
) -> twstock_data::Result<RawFragment> {
    let col = fragment.require_column(column)?;
    fragment.retain_rows(|row| row[col].contains('/'));

    filter_rows(fragment, column, |raw| {
        Ok(FiscalQuarter::parse(raw)?.year >= min_year)
    })
}

#[derive(Debug, Clone, Default)]
pub struct QuarterlyBalancePipeline;

impl FeedPipeline for QuarterlyBalancePipeline {
    type Record = QuarterlyBalance;

    fn feed(&self) -> Feed {
        Feed::QuarterlyBalance
    }

    fn request(&self, _windows: &WindowConfig) -> FetchRequest {
        FetchRequest::QuarterlyBalance
    }

    fn normalize(
        &self,
        tables: Vec<RawFragment>,
        windows: &WindowConfig,
    ) -> twstock_data::Result<Vec<RawFragment>> {
        expect_tables(&tables, TAB_FIELDS.len(), self.feed())?;

        tables
            .iter()
            .zip(TAB_FIELDS)
            .map(|(table, rule)| {
                let projected = table.project(&projection(PERIOD_COLUMN, &[rule]))?;
                quarters_since(projected, PERIOD_COLUMN.1, windows.statement_min_year)
            })
            .collect()
    }

    fn join_key(&self) -> PeriodKeySpec {
        PeriodKeySpec::new(PERIOD_COLUMN.1, PeriodKind::Quarter)
    }

    fn to_record(&self, stock: &StockIdentity, row: &Row) -> twstock_data::Result<QuarterlyBalance> {
        Ok(QuarterlyBalance {
            stock_id: stock.internal_id,
            period: quarter_key(row)?,
            total_assets: row.scaled(&ASSETS)?,
            total_equity: row.scaled(&EQUITY)?,
            total_liabilities: row.scaled(&LIABILITIES)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use twstock_data::transform::merge;

    fn tab(value_column: &str, rows: &[[&str; 2]]) -> RawFragment {
        RawFragment::single(
            ["日期", value_column],
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn run(tables: Vec<RawFragment>) -> twstock_data::Result<Vec<QuarterlyBalance>> {
        let pipeline = QuarterlyBalancePipeline;
        let stock = StockIdentity::new(9, "2330");
        let normalized = pipeline.normalize(tables, &WindowConfig::default())?;
        let rows = merge(&normalized, &pipeline.join_key())?;
        rows.iter().map(|row| pipeline.to_record(&stock, row)).collect()
    }

    #[test]
    fn test_three_tabs_merge() {
        let records = run(vec![
            tab("總資產", &[["2025/Q2", "6,000,000,000"], ["2025/Q1", "5,900,000,000"], ["2024", "5,800,000,000"]]),
            tab("總負債", &[["2025/Q1", "2,000,000,000"], ["2025/Q2", "2,100,000,000"]]),
            tab("股東權益(淨值)", &[["2025/Q2", "3,900,000,000"], ["2025/Q1", "--"], ["2021/Q4", "1"]]),
        ])
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].period, FiscalQuarter::new(2025, 2).unwrap());
        assert_eq!(records[0].total_assets, Some(dec!(600000)));
        assert_eq!(records[0].total_liabilities, Some(dec!(210000)));
        assert_eq!(records[0].total_equity, Some(dec!(390000)));
        assert_eq!(records[1].total_equity, None);
    }

    #[test]
    fn test_malformed_quarter_fails() {
        let err = run(vec![
            tab("總資產", &[["2025/Q5", "1"]]),
            tab("總負債", &[["2025/Q1", "1"]]),
            tab("股東權益(淨值)", &[["2025/Q1", "1"]]),
        ])
        .unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_missing_tab() {
        let err = run(vec![tab("總資產", &[])]).unwrap_err();
        assert!(matches!(err, twstock_data::DataError::Markup(_)));
    }

    #[test]
    fn test_quarters_since() {
        let fragment = tab("v", &[["2022/Q1", "1"], ["2021/Q4", "2"], ["2023", "3"]]);
        let kept = quarters_since(fragment, "日期", 2022).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.rows()[0][0], "2022/Q1");
    }
}
