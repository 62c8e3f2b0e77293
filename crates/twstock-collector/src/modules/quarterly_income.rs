//! 분기 손익계산서 파이프라인.
//!
//! 손익계산서 표와 EPS 표를 분기 키로 병합합니다. EPS 공시는 손익계산서보다
//! 늦게 올라오는 경우가 있어, 손익계산서에만 있는 분기는 EPS 표에 빈 행을 채워
//! `eps_basic`이 부재인 채로 적재되게 합니다.

use crate::config::WindowConfig;
use crate::modules::pipeline::{expect_tables, projection, quarter_key, FeedPipeline};
use crate::modules::quarterly_balance::{quarters_since, PERIOD_COLUMN};
use tracing::debug;
use twstock_core::{Feed, QuarterlyIncome, StockIdentity};
use twstock_data::transform::{pad_missing_periods, FieldRule, PeriodKeySpec, PeriodKind, Row, ScaleSpec};
use twstock_data::{FetchRequest, RawFragment};

const EPS_PERIOD_COLUMN: (&str, &str) = ("年度/季別", "period");

const REVENUE: FieldRule =
    FieldRule::number("營收", "revenue").scaled(ScaleSpec::QuarterlyStatement);
const GROSS_PROFIT: FieldRule =
    FieldRule::number("毛利", "gross_profit").scaled(ScaleSpec::QuarterlyStatement);
const OPERATING_INCOME: FieldRule =
    FieldRule::number("營業利益", "operating_income").scaled(ScaleSpec::QuarterlyStatement);
const NET_INCOME: FieldRule =
    FieldRule::number("稅後淨利", "net_income").scaled(ScaleSpec::QuarterlyStatement);
const EPS: FieldRule = FieldRule::number("每股盈餘", "eps_basic");

const INCOME_FIELDS: [FieldRule; 4] = [REVENUE, GROSS_PROFIT, OPERATING_INCOME, NET_INCOME];

#[derive(Debug, Clone, Default)]
pub struct QuarterlyIncomePipeline;

impl FeedPipeline for QuarterlyIncomePipeline {
    type Record = QuarterlyIncome;

    fn feed(&self) -> Feed {
        Feed::QuarterlyIncome
    }

    fn request(&self, _windows: &WindowConfig) -> FetchRequest {
        FetchRequest::QuarterlyIncome
    }

    fn normalize(
        &self,
        tables: Vec<RawFragment>,
        windows: &WindowConfig,
    ) -> twstock_data::Result<Vec<RawFragment>> {
        expect_tables(&tables, 2, self.feed())?;
        let min_year = windows.statement_min_year;

        let income = quarters_since(
            tables[0].project(&projection(PERIOD_COLUMN, &INCOME_FIELDS))?,
            PERIOD_COLUMN.1,
            min_year,
        )?;
        let mut eps = quarters_since(
            tables[1].project(&projection(EPS_PERIOD_COLUMN, &[EPS]))?,
            EPS_PERIOD_COLUMN.1,
            min_year,
        )?;

        let padded = pad_missing_periods(&mut eps, &income, &self.join_key())?;
        if padded > 0 {
            debug!(padded, "EPS 미공시 분기 채움");
        }

        Ok(vec![income, eps])
    }

    fn join_key(&self) -> PeriodKeySpec {
        PeriodKeySpec::new(PERIOD_COLUMN.1, PeriodKind::Quarter)
    }

    fn to_record(&self, stock: &StockIdentity, row: &Row) -> twstock_data::Result<QuarterlyIncome> {
        Ok(QuarterlyIncome {
            stock_id: stock.internal_id,
            period: quarter_key(row)?,
            revenue: row.scaled(&REVENUE)?,
            gross_profit: row.scaled(&GROSS_PROFIT)?,
            operating_income: row.scaled(&OPERATING_INCOME)?,
            net_income: row.scaled(&NET_INCOME)?,
            eps_basic: row.scaled(&EPS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use twstock_core::FiscalQuarter;
    use twstock_data::transform::merge;

    fn income_table(rows: &[[&str; 5]]) -> RawFragment {
        RawFragment::single(
            ["日期", "營收", "毛利", "營業利益", "稅後淨利"],
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn eps_table(rows: &[[&str; 2]]) -> RawFragment {
        RawFragment::single(
            ["年度/季別", "每股盈餘"],
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn run(tables: Vec<RawFragment>) -> twstock_data::Result<Vec<QuarterlyIncome>> {
        let pipeline = QuarterlyIncomePipeline;
        let stock = StockIdentity::new(5, "2330");
        let normalized = pipeline.normalize(tables, &WindowConfig::default())?;
        let rows = merge(&normalized, &pipeline.join_key())?;
        rows.iter().map(|row| pipeline.to_record(&stock, row)).collect()
    }

    #[test]
    fn test_income_with_eps() {
        let records = run(vec![
            income_table(&[
                ["2025/Q2", "933,792,000", "549,027,000", "455,110,000", "398,272,000"],
                ["2025", "1,773,000,000", "1", "1", "1"],
            ]),
            eps_table(&[["2025/Q2", "15.36"]]),
        ])
        .unwrap();

        assert_eq!(records.len(), 1);
        let q2 = &records[0];
        assert_eq!(q2.period, FiscalQuarter::new(2025, 2).unwrap());
        assert_eq!(q2.revenue, Some(dec!(93379.2)));
        assert_eq!(q2.net_income, Some(dec!(39827.2)));
        assert_eq!(q2.eps_basic, Some(dec!(15.36)));
    }

    #[test]
    fn test_missing_eps_is_absent() {
        let records = run(vec![
            income_table(&[
                ["2025/Q3", "1,000,000", "1", "1", "1"],
                ["2025/Q2", "1,000,000", "1", "1", "1"],
            ]),
            eps_table(&[["2025/Q2", "15.36"]]),
        ])
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].period, FiscalQuarter::new(2025, 3).unwrap());
        assert_eq!(records[0].revenue, Some(dec!(100)));
        assert_eq!(records[0].eps_basic, None);
        assert_eq!(records[1].eps_basic, Some(dec!(15.36)));
    }

    #[test]
    fn test_old_quarters_excluded() {
        let records = run(vec![
            income_table(&[["2021/Q4", "1", "1", "1", "1"], ["2022/Q1", "1", "1", "1", "1"]]),
            eps_table(&[["2021/Q4", "1"], ["2022/Q1", "2"]]),
        ])
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].period, FiscalQuarter::new(2022, 1).unwrap());
    }

    #[test]
    fn test_missing_eps_column() {
        let err = run(vec![
            income_table(&[["2025/Q2", "1", "1", "1", "1"]]),
            RawFragment::single(["年度/季別"], vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, twstock_data::DataError::MissingColumn(_)));
    }
}
