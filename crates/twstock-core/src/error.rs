//! 원시 셀 해석 에러.
//!
//! 날짜, 숫자, 기간 토큰을 해석하지 못했을 때 발생합니다.
//! 해당 피드 실행만 실패시키며 다른 종목이나 피드에는 영향을 주지 않습니다.

use thiserror::Error;

/// 형식 해석 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// 날짜 문자열을 해석할 수 없음
    #[error("날짜 형식 오류: {raw:?} ({reason})")]
    Date { raw: String, reason: String },

    /// 구분자/센티널을 제거한 뒤에도 숫자가 아닌 내용이 남음
    #[error("숫자 형식 오류: {raw:?}")]
    Number { raw: String },

    /// 기간 토큰(YYYY/QN, YYYY/MM)을 해석할 수 없음
    #[error("기간 형식 오류: {raw:?} ({reason})")]
    Period { raw: String, reason: String },
}

impl FormatError {
    pub fn date(raw: &str, reason: impl Into<String>) -> Self {
        Self::Date {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }

    pub fn period(raw: &str, reason: impl Into<String>) -> Self {
        Self::Period {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }

    /// 숫자 형식 에러를 생성합니다.
    pub fn number(raw: &str) -> Self {
        Self::Number {
            raw: raw.to_string(),
        }
    }
}

pub type FormatResult<T> = std::result::Result<T, FormatError>;
