//! 배당 파이프라인.
//!
//! CMoney 배당 표(2단 헤더)에서 현금배당만 골라 배당락일 기준으로 적재합니다.
//! 배당락일이 없는 행(예정 공시)은 키가 없으므로 적재하지 않습니다.

use crate::config::WindowConfig;
use crate::modules::pipeline::{date_key, expect_tables, filter_rows, parse_year, projection, FeedPipeline};
use tracing::warn;
use twstock_core::{Calendar, Dividend, Feed, StockIdentity};
use twstock_data::transform::{parse_optional_date, FieldRule, PeriodKeySpec, PeriodKind, Row};
use twstock_data::{FetchRequest, RawFragment};

const EX_DATE_COLUMN: (&str, &str) = ("現金股利(元)_除息日", "ex_dividend_date");
const YEAR_COLUMN: (&str, &str) = ("除權息年度_除權息年度", "fiscal_year");
const PAY_DATE_COLUMN: (&str, &str) = ("現金股利(元)_發放日", "pay_date");

const CASH: FieldRule = FieldRule::number("現金股利(元)_股利", "cash_dividend");

fn is_blank_date(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.chars().all(|c| c == '-')
}

#[derive(Debug, Clone, Default)]
pub struct DividendPipeline;

impl FeedPipeline for DividendPipeline {
    type Record = Dividend;

    fn feed(&self) -> Feed {
        Feed::Dividend
    }

    fn request(&self, _windows: &WindowConfig) -> FetchRequest {
        FetchRequest::Dividends
    }

    fn normalize(
        &self,
        tables: Vec<RawFragment>,
        windows: &WindowConfig,
    ) -> twstock_data::Result<Vec<RawFragment>> {
        expect_tables(&tables, 1, self.feed())?;

        let mut mapping = projection(EX_DATE_COLUMN, &[CASH]);
        mapping.push(YEAR_COLUMN);
        mapping.push(PAY_DATE_COLUMN);

        let mut projected = tables[0].project(&mapping)?;

        let before = projected.len();
        projected.retain_rows(|row| !is_blank_date(&row[0]));
        let dropped = before - projected.len();
        if dropped > 0 {
            warn!(dropped, "배당락일 없는 배당 행 제외");
        }

        let min_year = windows.dividend_min_year;
        let kept = filter_rows(projected, YEAR_COLUMN.1, |raw| {
            Ok(parse_year(raw)? >= min_year)
        })?;
        Ok(vec![kept])
    }

    fn join_key(&self) -> PeriodKeySpec {
        PeriodKeySpec::new(EX_DATE_COLUMN.1, PeriodKind::Date(Calendar::Gregorian))
    }

    fn to_record(&self, stock: &StockIdentity, row: &Row) -> twstock_data::Result<Dividend> {
        Ok(Dividend {
            stock_id: stock.internal_id,
            ex_dividend_date: date_key(row)?,
            fiscal_year: parse_year(row.require(YEAR_COLUMN.1)?)?,
            cash_dividend: row.scaled(&CASH)?,
            pay_date: parse_optional_date(row.require(PAY_DATE_COLUMN.1)?, Calendar::Gregorian)?,
        })
    }
}
