//! 데이터 피드 구분.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 수집 대상 데이터 범주.
///
/// 피드마다 스키마와 기간 키 단위가 다릅니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    /// 일별 시세 (거래일)
    DailyQuote,
    /// 현금 배당 (배당락일)
    Dividend,
    /// 월 매출 (연-월)
    MonthlyRevenue,
    /// 분기 재무상태표 (회계 분기)
    QuarterlyBalance,
    /// 분기 손익계산서 + EPS (회계 분기)
    QuarterlyIncome,
}

impl Feed {
    /// 전체 피드 (실행 순서).
    pub const ALL: [Feed; 5] = [
        Feed::Dividend,
        Feed::MonthlyRevenue,
        Feed::DailyQuote,
        Feed::QuarterlyBalance,
        Feed::QuarterlyIncome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyQuote => "daily_quote",
            Self::Dividend => "dividend",
            Self::MonthlyRevenue => "monthly_revenue",
            Self::QuarterlyBalance => "quarterly_balance",
            Self::QuarterlyIncome => "quarterly_income",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "daily_quote" | "quote" | "quotes" => Ok(Self::DailyQuote),
            "dividend" | "dividends" => Ok(Self::Dividend),
            "monthly_revenue" | "revenue" => Ok(Self::MonthlyRevenue),
            "quarterly_balance" | "balance" => Ok(Self::QuarterlyBalance),
            "quarterly_income" | "income" => Ok(Self::QuarterlyIncome),
            _ => Err(format!("Unknown feed: {}", s)),
        }
    }
}
