//! 종목 식별자.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 카탈로그에 등록된 종목.
///
/// 카탈로그 적재 시점에 한 번 생성되며 이후 변경되지 않습니다.
/// 하위 레코드는 `internal_id`만 참조합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockIdentity {
    /// 카탈로그 테이블의 기본 키
    pub internal_id: i64,
    /// 거래소 종목 코드 (예: "2330", "2882A")
    pub public_code: String,
}

impl StockIdentity {
    pub fn new(internal_id: i64, public_code: impl Into<String>) -> Self {
        Self {
            internal_id,
            public_code: public_code.into(),
        }
    }
}

impl fmt::Display for StockIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id={})", self.public_code, self.internal_id)
    }
}
