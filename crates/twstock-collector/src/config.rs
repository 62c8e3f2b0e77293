//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;
use twstock_core::YearMonth;
use twstock_data::{DEFAULT_CMONEY_BASE_URL, DEFAULT_TWSE_BASE_URL};

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL (`--dry-run`이면 없어도 됨)
    pub database_url: Option<String>,
    /// 풀의 최대 연결 수
    pub db_max_connections: u32,
    /// 외부 소스 설정
    pub sources: SourceConfig,
    /// 피드별 기간 범위
    pub windows: WindowConfig,
    /// 드라이버 설정
    pub driver: DriverConfig,
}

/// 외부 소스 설정
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// TWSE 일시세 JSON 기본 URL
    pub twse_base_url: String,
    /// CMoney 종목 페이지 기본 URL
    pub cmoney_base_url: String,
    /// 렌더링 프록시 (없으면 페이지를 직접 요청)
    pub render_endpoint: Option<String>,
    /// HTTP 타임아웃 (초)
    pub http_timeout_secs: u64,
}

/// 피드별 기간 범위
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// 최근 몇 개월의 일시세를 가져올지
    pub quote_months: u32,
    /// 이 연도 이전 배당은 제외
    pub dividend_min_year: i32,
    /// 월매출 시작 월 (포함)
    pub revenue_from: Option<YearMonth>,
    /// 월매출 종료 월 (포함)
    pub revenue_to: Option<YearMonth>,
    /// 이 연도 이전 분기 재무제표는 제외
    pub statement_min_year: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            quote_months: 3,
            dividend_min_year: 2020,
            revenue_from: None,
            revenue_to: None,
            statement_min_year: 2022,
        }
    }
}

impl WindowConfig {
    /// 월매출 범위 포함 여부.
    pub fn revenue_in_range(&self, month: &YearMonth) -> bool {
        self.revenue_from.map_or(true, |from| *month >= from)
            && self.revenue_to.map_or(true, |to| *month <= to)
    }
}

/// 드라이버 설정
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// 종목 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 동시에 처리할 종목 수
    pub concurrency: usize,
    /// 카탈로그 CSV 경로
    pub catalog_csv: PathBuf,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정을 만듭니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = WindowConfig::default();

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            db_max_connections: var_parse(&lookup, "DB_MAX_CONNECTIONS", 5),
            sources: SourceConfig {
                twse_base_url: lookup("TWSE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TWSE_BASE_URL.to_string()),
                cmoney_base_url: lookup("CMONEY_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_CMONEY_BASE_URL.to_string()),
                render_endpoint: lookup("RENDER_ENDPOINT").filter(|s| !s.is_empty()),
                http_timeout_secs: var_parse(&lookup, "HTTP_TIMEOUT_SECS", 30),
            },
            windows: WindowConfig {
                quote_months: var_parse(&lookup, "QUOTE_MONTHS", defaults.quote_months),
                dividend_min_year: var_parse(&lookup, "DIVIDEND_MIN_YEAR", defaults.dividend_min_year),
                revenue_from: var_month(&lookup, "REVENUE_FROM")?,
                revenue_to: var_month(&lookup, "REVENUE_TO")?,
                statement_min_year: var_parse(&lookup, "STATEMENT_MIN_YEAR", defaults.statement_min_year),
            },
            driver: DriverConfig {
                request_delay_ms: var_parse(&lookup, "REQUEST_DELAY_MS", 500),
                concurrency: var_parse(&lookup, "CONCURRENCY", 1usize).max(1),
                catalog_csv: lookup("CATALOG_CSV")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("StockList.csv")),
            },
        })
    }

    /// 데이터베이스 URL을 요구합니다.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })
    }
}

impl SourceConfig {
    /// HTTP 타임아웃을 Duration으로 반환
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl DriverConfig {
    /// 종목 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// 값을 파싱 (실패 시 기본값 사용)
fn var_parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// `YYYY/MM` 값 파싱. 형식이 틀리면 설정 에러입니다.
fn var_month<F>(lookup: &F, key: &str) -> Result<Option<YearMonth>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => YearMonth::parse(&raw)
            .map(Some)
            .map_err(|e| CollectorError::Config(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}
