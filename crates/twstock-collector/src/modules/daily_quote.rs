//! 일시세 파이프라인.
//!
//! TWSE `STOCK_DAY` 월별 표를 이어 붙여 거래일별 시세로 적재합니다.
//! 날짜는 민국 달력이고, 전일 종가는 `종가 - 등락`으로 계산합니다.

use crate::config::WindowConfig;
use crate::modules::pipeline::{date_key, projection, FeedPipeline};
use chrono::{Datelike, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use twstock_core::{Calendar, DailyQuote, Feed, FormatError, StockIdentity, YearMonth};
use twstock_data::transform::{shares_to_lots, FieldRule, PeriodKeySpec, PeriodKind, Row};
use twstock_data::{FetchRequest, RawFragment};

const DATE_COLUMN: (&str, &str) = ("日期", "trade_date");

const VOLUME: FieldRule = FieldRule::volume("成交股數", "volume_shares");
const OPEN: FieldRule = FieldRule::number("開盤價", "open_price");
const HIGH: FieldRule = FieldRule::number("最高價", "high_price");
const LOW: FieldRule = FieldRule::number("最低價", "low_price");
const LAST: FieldRule = FieldRule::number("收盤價", "last_price");
const CHANGE: FieldRule = FieldRule::number("漲跌價差", "change_price");

const FIELDS: [FieldRule; 6] = [VOLUME, OPEN, HIGH, LOW, LAST, CHANGE];

/// 기준 월을 포함한 최근 `count`개월 (오래된 순).
pub fn recent_months(current: YearMonth, count: u32) -> Vec<YearMonth> {
    let mut months: Vec<YearMonth> = std::iter::successors(Some(current), |m| Some(m.pred()))
        .take(count as usize)
        .collect();
    months.reverse();
    months
}

/// 대만 시간 기준 이번 달.
pub fn current_month() -> YearMonth {
    let now = Utc::now().with_timezone(&chrono_tz::Asia::Taipei);
    YearMonth {
        year: now.year(),
        month: now.month() as u8,
    }
}

/// 정수 건수로 변환합니다. 소수부가 있으면 형식 에러입니다.
fn to_count(value: Option<Decimal>, raw: &str) -> Result<i64, FormatError> {
    let value = value.unwrap_or(Decimal::ZERO);
    if !value.fract().is_zero() {
        return Err(FormatError::number(raw));
    }
    value.to_i64().ok_or_else(|| FormatError::number(raw))
}

/// 일시세 파이프라인.
#[derive(Debug, Clone)]
pub struct DailyQuotePipeline {
    /// 요청 기준 월
    pub current: YearMonth,
}

impl DailyQuotePipeline {
    pub fn new(current: YearMonth) -> Self {
        Self { current }
    }
}

impl Default for DailyQuotePipeline {
    fn default() -> Self {
        Self::new(current_month())
    }
}

impl FeedPipeline for DailyQuotePipeline {
    type Record = DailyQuote;

    fn feed(&self) -> Feed {
        Feed::DailyQuote
    }

    fn request(&self, windows: &WindowConfig) -> FetchRequest {
        FetchRequest::DailyQuotes {
            months: recent_months(self.current, windows.quote_months),
        }
    }

    fn normalize(
        &self,
        tables: Vec<RawFragment>,
        _windows: &WindowConfig,
    ) -> twstock_data::Result<Vec<RawFragment>> {
        let mapping = projection(DATE_COLUMN, &FIELDS);
        let projected = tables
            .iter()
            .map(|table| table.project(&mapping))
            .collect::<twstock_data::Result<Vec<_>>>()?;

        let combined = RawFragment::concat(projected)?.unwrap_or_else(|| {
            RawFragment::single(mapping.iter().map(|(_, target)| *target), Vec::new())
        });
        Ok(vec![combined])
    }

    fn join_key(&self) -> PeriodKeySpec {
        PeriodKeySpec::new(DATE_COLUMN.1, PeriodKind::Date(Calendar::RocOffset))
    }

    fn to_record(&self, stock: &StockIdentity, row: &Row) -> twstock_data::Result<DailyQuote> {
        let volume_shares = to_count(row.scaled(&VOLUME)?, row.require(VOLUME.field)?)?;
        let last_price = row.scaled(&LAST)?;
        let change = row.scaled(&CHANGE)?;
        let prev_close = last_price
            .zip(change)
            .map(|(last, change)| {
                last.checked_sub(change)
                    .ok_or_else(|| FormatError::number(&format!("{} - {}", last, change)))
            })
            .transpose()?;

        Ok(DailyQuote {
            stock_id: stock.internal_id,
            trade_date: date_key(row)?,
            last_price,
            open_price: row.scaled(&OPEN)?,
            high_price: row.scaled(&HIGH)?,
            low_price: row.scaled(&LOW)?,
            prev_close,
            volume_lots: shares_to_lots(volume_shares),
            volume_shares,
        })
    }
}
