//! # TwStock Core
//!
//! 대만 주식 피드 적재 파이프라인의 핵심 도메인 모델을 제공합니다:
//! - 종목 식별자와 기간 키 (날짜, 연-월, 회계 분기)
//! - 피드 구분과 피드별 정규화 레코드
//! - 원시 셀 해석 에러
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
