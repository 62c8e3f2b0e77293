//! 월매출 파이프라인.
//!
//! 금액은 천 원 단위로 보고되며 억 원으로 환산해 적재합니다.

use crate::config::WindowConfig;
use crate::modules::pipeline::{expect_tables, filter_rows, month_key, projection, FeedPipeline};
use twstock_core::{Feed, MonthlyRevenue, StockIdentity, YearMonth};
use twstock_data::transform::{FieldRule, PeriodKeySpec, PeriodKind, Row, ScaleSpec};
use twstock_data::{FetchRequest, RawFragment};

const PERIOD_COLUMN: (&str, &str) = ("年度/月份_年度/月份", "period");

const CURRENT: FieldRule =
    FieldRule::number("營業收入_當月營收", "revenue_current").scaled(ScaleSpec::MonthlyRevenue);
const PREV_YEAR_MONTH: FieldRule = FieldRule::number("營業收入_去年同月營收", "revenue_prev_year_month")
    .scaled(ScaleSpec::MonthlyRevenue);
const YTD: FieldRule =
    FieldRule::number("累積營業收入_當月累計營收", "revenue_ytd").scaled(ScaleSpec::MonthlyRevenue);
const YTD_PREV_YEAR: FieldRule = FieldRule::number("累積營業收入_去年累計營收", "revenue_ytd_prev_year")
    .scaled(ScaleSpec::MonthlyRevenue);

const FIELDS: [FieldRule; 4] = [CURRENT, PREV_YEAR_MONTH, YTD, YTD_PREV_YEAR];

#[derive(Debug, Clone, Default)]
pub struct MonthlyRevenuePipeline;

impl FeedPipeline for MonthlyRevenuePipeline {
    type Record = MonthlyRevenue;

    fn feed(&self) -> Feed {
        Feed::MonthlyRevenue
    }

    fn request(&self, _windows: &WindowConfig) -> FetchRequest {
        FetchRequest::MonthlyRevenue
    }

    fn normalize(
        &self,
        tables: Vec<RawFragment>,
        windows: &WindowConfig,
    ) -> twstock_data::Result<Vec<RawFragment>> {
        expect_tables(&tables, 1, self.feed())?;

        let projected = tables[0].project(&projection(PERIOD_COLUMN, &FIELDS))?;
        let kept = filter_rows(projected, PERIOD_COLUMN.1, |raw| {
            Ok(windows.revenue_in_range(&YearMonth::parse(raw)?))
        })?;
        Ok(vec![kept])
    }

    fn join_key(&self) -> PeriodKeySpec {
        PeriodKeySpec::new(PERIOD_COLUMN.1, PeriodKind::Month)
    }

    fn to_record(&self, stock: &StockIdentity, row: &Row) -> twstock_data::Result<MonthlyRevenue> {
        Ok(MonthlyRevenue {
            stock_id: stock.internal_id,
            period: month_key(row)?,
            revenue_current: row.scaled(&CURRENT)?,
            revenue_prev_year_month: row.scaled(&PREV_YEAR_MONTH)?,
            revenue_ytd: row.scaled(&YTD)?,
            revenue_ytd_prev_year: row.scaled(&YTD_PREV_YEAR)?,
        })
    }
}
