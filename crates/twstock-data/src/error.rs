//! 데이터 모듈 오류 타입.

use thiserror::Error;
use twstock_core::FormatError;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 외부 소스에서 원시 데이터를 가져오지 못함
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// HTML/JSON 구조를 표로 해석하지 못함
    #[error("Markup error: {0}")]
    Markup(String),

    /// 날짜/숫자/기간 셀 해석 실패
    #[error(transparent)]
    Format(#[from] FormatError),

    /// 필요한 열이 원시 표에 없음
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// 유일성 제약 위반 (재실행 시 정상)
    #[error("Duplicate record: {0}")]
    DuplicateKey(String),

    /// 그 외 저장소 오류
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    Config(String),

    /// 단계 실행 중 패닉
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DataError {
    /// 유일성 충돌 여부.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey(_))
    }

    /// 형식 해석 실패 여부.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                if code == "23505" {
                    // PostgreSQL 고유 제약 조건 위반
                    DataError::DuplicateKey(db_err.message().to_string())
                } else {
                    DataError::Persistence(db_err.message().to_string())
                }
            }
            _ => DataError::Persistence(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        DataError::Retrieval(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
