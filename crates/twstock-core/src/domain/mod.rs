//! 피드와 정규화 레코드 도메인 모델.

mod feed;
mod records;

pub use feed::*;
pub use records::*;
