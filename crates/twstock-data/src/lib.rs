//! 피드 정규화 및 적재.
//!
//! 이 crate는 다음을 제공합니다:
//! - 원시 표 조각과 2단 헤더 평탄화
//! - 날짜/숫자 정규화, 기간 키 병합, 단위 환산
//! - 추출 어댑터 (TWSE JSON, CMoney 렌더링 표)
//! - 행 싱크 (PostgreSQL, 인메모리)와 멱등 적재기
//! - 종목 카탈로그

pub mod error;
pub mod fragment;
pub mod loader;
pub mod provider;
pub mod storage;
pub mod transform;

pub use error::{DataError, Result};
pub use fragment::{Header, RawFragment, HEADER_SEPARATOR};
pub use loader::{load, LoadReport};

// 추출 어댑터 재내보내기
pub use provider::{
    CmoneyTableAdapter, ExtractionAdapter, FeedRouter, FetchRequest, HttpPageRenderer,
    PageRenderer, TwseClient,
};
pub use provider::cmoney::DEFAULT_CMONEY_BASE_URL;
pub use provider::twse::DEFAULT_TWSE_BASE_URL;

// 저장소 타입 재내보내기
pub use storage::catalog::{read_catalog_csv, read_catalog_file};
pub use storage::postgres::{connect_pool, DatabaseConfig};
pub use storage::{
    CatalogEntry, ColumnValue, MemoryCatalog, MemorySink, PgRowSink, PgStockCatalog, RowSink,
    StockCatalog, StorableRecord, TableSpec,
};
