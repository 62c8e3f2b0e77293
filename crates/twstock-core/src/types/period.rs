//! 기간 키 정의.
//!
//! 피드마다 레코드를 구분하는 시간 단위가 다릅니다:
//! - 일별 시세, 배당: 날짜
//! - 월 매출: (연도, 월)
//! - 분기 재무제표: (회계연도, 분기)
//!
//! 세 가지 모두 한 종목 안에서 전순서를 가지며, "가장 최근" 조회가 이 순서에 의존합니다.

use crate::error::{FormatError, FormatResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 민국(ROC) 연호와 서기 연도의 차이.
pub const ROC_YEAR_OFFSET: i32 = 1911;

/// 서기 연도를 민국 연도로 변환합니다.
pub fn to_roc_year(year: i32) -> i32 {
    year - ROC_YEAR_OFFSET
}

/// 날짜 문자열의 달력 체계.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Calendar {
    /// 서기 `YYYY/MM/DD`
    Gregorian,
    /// 민국 연호 `Y/MM/DD` (Y + 1911 = 서기)
    RocOffset,
}

impl Calendar {
    /// 원시 연도 값에 더할 오프셋.
    pub fn year_offset(&self) -> i32 {
        match self {
            Self::Gregorian => 0,
            Self::RocOffset => ROC_YEAR_OFFSET,
        }
    }
}

/// 회계 분기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FiscalQuarter {
    pub year: i32,
    pub quarter: u8,
}

impl FiscalQuarter {
    pub fn new(year: i32, quarter: u8) -> FormatResult<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(FormatError::period(
                &format!("{}/Q{}", year, quarter),
                "분기는 1~4 범위여야 합니다",
            ));
        }
        Ok(Self { year, quarter })
    }

    /// `YYYY/QN` 형식을 해석합니다.
    ///
    /// 연도 토큰은 정확히 4자리 숫자, 분기 토큰은 `Q` 뒤에 1~4 사이 정수여야 합니다.
    pub fn parse(raw: &str) -> FormatResult<Self> {
        let trimmed = raw.trim();
        let (year_tok, quarter_tok) = trimmed
            .split_once('/')
            .ok_or_else(|| FormatError::period(raw, "'/' 구분자가 없습니다"))?;

        let year = parse_year_token(raw, year_tok)?;

        let digits = quarter_tok
            .strip_prefix('Q')
            .or_else(|| quarter_tok.strip_prefix('q'))
            .ok_or_else(|| FormatError::period(raw, "분기 토큰은 'Q'로 시작해야 합니다"))?;

        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormatError::period(raw, "분기 번호가 숫자가 아닙니다"));
        }

        let quarter: u8 = digits
            .parse()
            .map_err(|_| FormatError::period(raw, "분기 번호가 숫자가 아닙니다"))?;

        if !(1..=4).contains(&quarter) {
            return Err(FormatError::period(raw, "분기는 1~4 범위여야 합니다"));
        }

        Ok(Self { year, quarter })
    }

    /// 민국 연도.
    pub fn roc_year(&self) -> i32 {
        to_roc_year(self.year)
    }
}

impl fmt::Display for FiscalQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/Q{}", self.year, self.quarter)
    }
}

/// 연-월.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u8,
}

impl YearMonth {
    pub fn new(year: i32, month: u8) -> FormatResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(FormatError::period(
                &format!("{}/{:02}", year, month),
                "월은 1~12 범위여야 합니다",
            ));
        }
        Ok(Self { year, month })
    }

    /// `YYYY/MM` 형식을 해석합니다. 한 자리 월(`2025/9`)도 허용합니다.
    pub fn parse(raw: &str) -> FormatResult<Self> {
        let trimmed = raw.trim();
        let (year_tok, month_tok) = trimmed
            .split_once('/')
            .ok_or_else(|| FormatError::period(raw, "'/' 구분자가 없습니다"))?;

        let year = parse_year_token(raw, year_tok)?;

        if month_tok.is_empty()
            || month_tok.len() > 2
            || !month_tok.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(FormatError::period(raw, "월 토큰이 숫자가 아닙니다"));
        }

        let month: u8 = month_tok
            .parse()
            .map_err(|_| FormatError::period(raw, "월 토큰이 숫자가 아닙니다"))?;

        Self::new(year, month).map_err(|_| FormatError::period(raw, "월은 1~12 범위여야 합니다"))
    }

    /// 민국 연도.
    pub fn roc_year(&self) -> i32 {
        to_roc_year(self.year)
    }

    /// 해당 월의 1일.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month as u32, 1)
    }

    /// 직전 월.
    pub fn pred(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.year, self.month)
    }
}

/// 레코드의 기간 키.
///
/// 병합 조인 키이자 저장소 유일성 제약 `(stock, period)`의 절반입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PeriodKey {
    Date(NaiveDate),
    Month(YearMonth),
    Quarter(FiscalQuarter),
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{}", d),
            Self::Month(m) => write!(f, "{}", m),
            Self::Quarter(q) => write!(f, "{}", q),
        }
    }
}

fn parse_year_token(raw: &str, token: &str) -> FormatResult<i32> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FormatError::period(raw, "연도 토큰은 4자리 숫자여야 합니다"));
    }
    token
        .parse()
        .map_err(|_| FormatError::period(raw, "연도 토큰은 4자리 숫자여야 합니다"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quarter() {
        let q = FiscalQuarter::parse("2025/Q3").unwrap();
        assert_eq!(q.year, 2025);
        assert_eq!(q.quarter, 3);
        assert_eq!(q.roc_year(), 114);
        assert_eq!(q.to_string(), "2025/Q3");
    }

    #[test]
    fn test_parse_quarter_rejects_malformed() {
        assert!(FiscalQuarter::parse("2025/Q5").is_err());
        assert!(FiscalQuarter::parse("2025/Q0").is_err());
        assert!(FiscalQuarter::parse("25/Q3").is_err());
        assert!(FiscalQuarter::parse("2025Q3").is_err());
        assert!(FiscalQuarter::parse("2025/3").is_err());
        assert!(FiscalQuarter::parse("2025/QX").is_err());
        assert!(FiscalQuarter::parse("2025合計").is_err());
    }

    #[test]
    fn test_parse_year_month() {
        let ym = YearMonth::parse(" 2025/09 ").unwrap();
        assert_eq!(ym, YearMonth { year: 2025, month: 9 });
        assert_eq!(ym.roc_year(), 114);
        assert_eq!(YearMonth::parse("2025/9").unwrap().month, 9);

        assert!(YearMonth::parse("2025/13").is_err());
        assert!(YearMonth::parse("2025/00").is_err());
        assert!(YearMonth::parse("114/09").is_err());
    }

    #[test]
    fn test_year_month_pred() {
        let jan = YearMonth::new(2025, 1).unwrap();
        assert_eq!(jan.pred(), YearMonth::new(2024, 12).unwrap());
        assert_eq!(YearMonth::new(2025, 7).unwrap().pred().month, 6);
    }

    #[test]
    fn test_period_key_order() {
        let q2 = PeriodKey::Quarter(FiscalQuarter::new(2024, 4).unwrap());
        let q3 = PeriodKey::Quarter(FiscalQuarter::new(2025, 1).unwrap());
        assert!(q2 < q3);

        let d1 = PeriodKey::Date(NaiveDate::from_ymd_opt(2025, 3, 17).unwrap());
        let d2 = PeriodKey::Date(NaiveDate::from_ymd_opt(2025, 3, 18).unwrap());
        assert!(d1 < d2);
    }

    proptest::proptest! {
        #[test]
        fn prop_quarter_display_parses_back(year in 1000i32..=9999, quarter in 1u8..=4) {
            let q = FiscalQuarter::new(year, quarter).unwrap();
            proptest::prop_assert_eq!(FiscalQuarter::parse(&q.to_string()).unwrap(), q);
            proptest::prop_assert_eq!(q.roc_year(), year - 1911);
        }

        #[test]
        fn prop_year_month_display_parses_back(year in 1000i32..=9999, month in 1u8..=12) {
            let ym = YearMonth::new(year, month).unwrap();
            proptest::prop_assert_eq!(YearMonth::parse(&ym.to_string()).unwrap(), ym);
        }
    }
}
