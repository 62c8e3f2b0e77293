//! 날짜/숫자 정규화.
//!
//! 소스마다 달력(서기/민국), 천 단위 구분자, 결측 표기가 다릅니다.
//! 여기의 함수들은 모두 순수 함수이며 원시 셀을 정규 값으로 바꿉니다.
//!
//! ## 결측 센티널
//! - 빈 문자열
//! - 자리표시자: `-`, `--` 처럼 대시로만 이루어진 셀, 단독 `0`
//! - 거래정지 표식: 숫자 앞에 영문자가 붙은 셀 (예: `X0.00`)
//!
//! 센티널을 부재로 볼지 0으로 볼지는 필드마다 다르며,
//! 각 피드의 [`FieldRule`] 표에 명시합니다.

use crate::transform::scale::ScaleSpec;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use twstock_core::{Calendar, FormatError, FormatResult};

/// 센티널 셀 처리 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberPolicy {
    /// 센티널은 부재 (가격, 재무 수치)
    AbsentOnSentinel,
    /// 센티널은 실제 0 (거래량)
    ZeroOnSentinel,
}

/// 피드별 필드 표의 한 항목.
///
/// 원시 열 이름, 정규 필드 이름, 센티널 정책, 단위 환산을 함께 기록합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// 평탄화된 원시 열 이름
    pub source: &'static str,
    /// 정규 필드 이름 (저장 열 이름과 같음)
    pub field: &'static str,
    pub policy: NumberPolicy,
    pub scale: ScaleSpec,
}

impl FieldRule {
    /// 센티널을 부재로 보는 수치 필드.
    pub const fn number(source: &'static str, field: &'static str) -> Self {
        Self {
            source,
            field,
            policy: NumberPolicy::AbsentOnSentinel,
            scale: ScaleSpec::Identity,
        }
    }

    /// 센티널을 0으로 보는 거래량 필드.
    pub const fn volume(source: &'static str, field: &'static str) -> Self {
        Self {
            source,
            field,
            policy: NumberPolicy::ZeroOnSentinel,
            scale: ScaleSpec::Identity,
        }
    }

    /// 단위 환산을 지정합니다.
    pub const fn scaled(mut self, scale: ScaleSpec) -> Self {
        self.scale = scale;
        self
    }

    /// 원시 셀을 이 규칙으로 해석합니다 (환산 전).
    pub fn parse(&self, raw: &str) -> FormatResult<Option<Decimal>> {
        parse_number_with(raw, self.policy)
    }
}

/// 날짜 문자열을 해석합니다.
///
/// `Y/M/D` 세 개의 숫자 토큰이어야 하며, 민국 달력이면 `Y`에 1911을 더합니다.
/// `-` 구분자도 허용합니다.
pub fn parse_date(raw: &str, calendar: Calendar) -> FormatResult<NaiveDate> {
    let trimmed = raw.trim();
    let separator = if trimmed.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = trimmed.split(separator).collect();

    if parts.len() != 3 {
        return Err(FormatError::date(raw, "Y/M/D 세 토큰이 아닙니다"));
    }

    let mut numbers = [0u32; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormatError::date(raw, "숫자가 아닌 토큰이 있습니다"));
        }
        *slot = part
            .parse()
            .map_err(|_| FormatError::date(raw, "숫자 범위를 벗어났습니다"))?;
    }

    let [y, m, d] = numbers;
    let year = i32::try_from(y)
        .ok()
        .and_then(|y| y.checked_add(calendar.year_offset()))
        .ok_or_else(|| FormatError::date(raw, "연도 범위를 벗어났습니다"))?;

    NaiveDate::from_ymd_opt(year, m, d)
        .ok_or_else(|| FormatError::date(raw, "존재하지 않는 날짜입니다"))
}

/// 선택적 날짜 셀을 해석합니다. 빈 셀과 대시 자리표시자는 `None`입니다.
pub fn parse_optional_date(raw: &str, calendar: Calendar) -> FormatResult<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_dash_placeholder(trimmed) {
        return Ok(None);
    }
    parse_date(trimmed, calendar).map(Some)
}

/// 숫자 셀을 해석합니다. 센티널은 부재(`None`)입니다.
pub fn parse_number(raw: &str) -> FormatResult<Option<Decimal>> {
    parse_number_with(raw, NumberPolicy::AbsentOnSentinel)
}

/// 정책을 지정해 숫자 셀을 해석합니다.
///
/// 쉼표와 `%` 접미사를 제거한 뒤에도 숫자가 아닌 내용이 남으면
/// [`FormatError::Number`]를 반환합니다.
pub fn parse_number_with(raw: &str, policy: NumberPolicy) -> FormatResult<Option<Decimal>> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();

    if is_sentinel(&cleaned) {
        return Ok(match policy {
            NumberPolicy::AbsentOnSentinel => None,
            NumberPolicy::ZeroOnSentinel => Some(Decimal::ZERO),
        });
    }

    let body = cleaned.strip_suffix('%').unwrap_or(&cleaned).trim_end();
    let body = body.strip_prefix('+').unwrap_or(body);

    if !looks_numeric(body) {
        return Err(FormatError::number(raw));
    }

    Decimal::from_str(body)
        .map(Some)
        .map_err(|_| FormatError::number(raw))
}

/// 정수를 천 단위 쉼표로 표기합니다. 소수부는 그대로 둡니다.
///
/// `parse_number(&format_grouped(n)) == Some(n)` (센티널 제외).
pub fn format_grouped(value: Decimal) -> String {
    let text = value.to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

fn is_sentinel(cleaned: &str) -> bool {
    cleaned.is_empty() || cleaned == "0" || is_dash_placeholder(cleaned) || is_halted_marker(cleaned)
}

fn is_dash_placeholder(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c == '-')
}

/// 영문자 접두 + 숫자 (`X0.00`, `X12.50`).
fn is_halted_marker(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            let rest = chars.as_str();
            !rest.is_empty() && looks_numeric(rest.strip_prefix('+').unwrap_or(rest))
        }
        _ => false,
    }
}

fn looks_numeric(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
}
