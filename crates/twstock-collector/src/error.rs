//! 에러 타입 정의.

use std::fmt;
use twstock_data::DataError;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 데이터베이스 에러
    Database(sqlx::Error),
    /// 설정 에러
    Config(String),
    /// 데이터 소스 에러 (TWSE, CMoney 등)
    DataSource(String),
    /// 종목 카탈로그 에러
    Catalog(String),
    /// 일반 에러
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl CollectorError {
    /// 카탈로그 작업 에러로 감쌉니다.
    pub fn catalog(err: impl fmt::Display) -> Self {
        Self::Catalog(err.to_string())
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Database error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::DataSource(msg) => write!(f, "Data source error: {}", msg),
            Self::Catalog(msg) => write!(f, "Catalog error: {}", msg),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {}

impl From<sqlx::Error> for CollectorError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Config(msg) => Self::Config(msg),
            DataError::Retrieval(_) | DataError::Markup(_) => Self::DataSource(err.to_string()),
            other => Self::Other(Box::new(other)),
        }
    }
}

impl From<std::env::VarError> for CollectorError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CollectorError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
