//! 대만 주식 피드 수집기.
//!
//! 이 crate는 종목별 피드를 정규화해 적재하는 바이너리를 제공합니다:
//! - 일시세 (TWSE `STOCK_DAY`)
//! - 배당, 월매출 (CMoney)
//! - 분기 재무상태표, 손익계산서 + EPS (CMoney)
//! - 종목 카탈로그 CSV 가져오기

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{CollectorConfig, DriverConfig, SourceConfig, WindowConfig};
pub use error::{CollectorError, Result};
pub use stats::RunStats;
