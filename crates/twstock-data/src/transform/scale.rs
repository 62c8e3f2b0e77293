//! 단위 환산.
//!
//! 두 상위 소스는 금액을 천 원(仟元) 단위로 보고하지만 적재 단위가 다릅니다:
//! - 월 매출: 천 원 → 억 원 (`× 1000 / 100,000,000`)
//! - 분기 재무제표: 천 원 → 천만 원 (`× 1000 / 10,000,000`)
//!
//! 부재 값은 그대로 전파되며 0으로 바뀌지 않습니다.
//! 환산 결과가 `Decimal` 범위를 넘으면 숫자 형식 오류입니다.

use rust_decimal::Decimal;
use twstock_core::{FormatError, FormatResult};

/// 1 lot(張)당 주식 수.
pub const SHARES_PER_LOT: i64 = 1000;

/// 피드별 환산 규칙.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleSpec {
    /// 환산 없음
    Identity,
    /// 월 매출 (천 원 → 억 원)
    MonthlyRevenue,
    /// 분기 재무제표 (천 원 → 천만 원)
    QuarterlyStatement,
}

impl ScaleSpec {
    /// `(분자, 분모)` 배율.
    pub fn factor(&self) -> (Decimal, Decimal) {
        match self {
            Self::Identity => (Decimal::ONE, Decimal::ONE),
            Self::MonthlyRevenue => (Decimal::from(1_000), Decimal::from(100_000_000)),
            Self::QuarterlyStatement => (Decimal::from(1_000), Decimal::from(10_000_000)),
        }
    }
}

/// 값을 환산합니다. `None`은 그대로 `None`입니다.
pub fn scale(value: Option<Decimal>, spec: ScaleSpec) -> FormatResult<Option<Decimal>> {
    let (numerator, denominator) = spec.factor();
    value
        .map(|v| {
            v.checked_mul(numerator)
                .and_then(|scaled| scaled.checked_div(denominator))
                .map(|scaled| scaled.normalize())
                .ok_or_else(|| FormatError::number(&v.to_string()))
        })
        .transpose()
}

/// 주식 수를 lot 수로 바꿉니다 (내림).
pub fn shares_to_lots(shares: i64) -> i64 {
    shares.div_euclid(SHARES_PER_LOT)
}
