//! 피드별 정규화 레코드.
//!
//! 모든 수치 필드는 유한한 값(`Some`)이거나 명시적인 부재(`None`)입니다.
//! 원시 문자열은 이 단계까지 오지 않습니다.

use crate::types::{FiscalQuarter, PeriodKey, YearMonth};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 일별 시세.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyQuote {
    pub stock_id: i64,
    pub trade_date: NaiveDate,
    pub last_price: Option<Decimal>,
    pub open_price: Option<Decimal>,
    pub high_price: Option<Decimal>,
    pub low_price: Option<Decimal>,
    /// 종가 - 등락폭. 둘 중 하나라도 없으면 `None`
    pub prev_close: Option<Decimal>,
    /// 거래량 (1,000주 단위 lot)
    pub volume_lots: i64,
    /// 거래량 (주)
    pub volume_shares: i64,
}

/// 현금 배당.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub stock_id: i64,
    /// 배당락일 (기간 키)
    pub ex_dividend_date: NaiveDate,
    /// 배당 귀속 연도
    pub fiscal_year: i32,
    /// 주당 현금 배당 (원 단위 그대로)
    pub cash_dividend: Option<Decimal>,
    pub pay_date: Option<NaiveDate>,
}

/// 월 매출 (억 원 단위).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub stock_id: i64,
    pub period: YearMonth,
    pub revenue_current: Option<Decimal>,
    pub revenue_prev_year_month: Option<Decimal>,
    pub revenue_ytd: Option<Decimal>,
    pub revenue_ytd_prev_year: Option<Decimal>,
}

/// 분기 재무상태표 (천만 원 단위).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyBalance {
    pub stock_id: i64,
    pub period: FiscalQuarter,
    pub total_assets: Option<Decimal>,
    pub total_equity: Option<Decimal>,
    pub total_liabilities: Option<Decimal>,
}

/// 분기 손익계산서.
///
/// 금액 필드는 천만 원 단위, `eps_basic`은 원 단위 그대로입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyIncome {
    pub stock_id: i64,
    pub period: FiscalQuarter,
    pub revenue: Option<Decimal>,
    pub gross_profit: Option<Decimal>,
    pub operating_income: Option<Decimal>,
    pub net_income: Option<Decimal>,
    pub eps_basic: Option<Decimal>,
}

/// 기간 키와 소유 종목을 노출하는 레코드.
pub trait PeriodRecord {
    /// 소유 종목의 내부 ID.
    fn stock_id(&self) -> i64;

    /// 유일성 제약의 기간 부분.
    fn period_key(&self) -> PeriodKey;
}

impl PeriodRecord for DailyQuote {
    fn stock_id(&self) -> i64 {
        self.stock_id
    }

    fn period_key(&self) -> PeriodKey {
        PeriodKey::Date(self.trade_date)
    }
}

impl PeriodRecord for Dividend {
    fn stock_id(&self) -> i64 {
        self.stock_id
    }

    fn period_key(&self) -> PeriodKey {
        PeriodKey::Date(self.ex_dividend_date)
    }
}

impl PeriodRecord for MonthlyRevenue {
    fn stock_id(&self) -> i64 {
        self.stock_id
    }

    fn period_key(&self) -> PeriodKey {
        PeriodKey::Month(self.period)
    }
}

impl PeriodRecord for QuarterlyBalance {
    fn stock_id(&self) -> i64 {
        self.stock_id
    }

    fn period_key(&self) -> PeriodKey {
        PeriodKey::Quarter(self.period)
    }
}

impl PeriodRecord for QuarterlyIncome {
    fn stock_id(&self) -> i64 {
        self.stock_id
    }

    fn period_key(&self) -> PeriodKey {
        PeriodKey::Quarter(self.period)
    }
}
