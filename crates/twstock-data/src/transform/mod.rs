//! 원시 표 → 정규 행 변환.
//!
//! - [`normalize`]: 날짜/숫자 셀 해석과 필드별 센티널 정책
//! - [`merge`]: 기간 키 내부 조인
//! - [`scale`]: 피드별 단위 환산

pub mod merge;
pub mod normalize;
pub mod scale;

pub use merge::{merge, pad_missing_periods, PeriodKeySpec, PeriodKind, Row};
pub use normalize::{
    format_grouped, parse_date, parse_number, parse_number_with, parse_optional_date, FieldRule,
    NumberPolicy,
};
pub use scale::{scale, shares_to_lots, ScaleSpec, SHARES_PER_LOT};
