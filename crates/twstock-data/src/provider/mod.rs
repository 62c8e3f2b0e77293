//! 추출 어댑터 모듈.
//!
//! 외부 소스에서 원시 표([`RawFragment`])를 가져옵니다.
//! 네트워크 I/O는 이 모듈에만 있습니다.
//!
//! ## TWSE (臺灣證券交易所)
//! - `TwseClient`: `STOCK_DAY` JSON 월별 일시세
//!
//! ## CMoney
//! - `CmoneyTableAdapter`: 렌더링된 종목 페이지의 `<table>` (배당, 월매출, 재무제표, EPS)
//! - `PageRenderer`: 렌더링된 HTML을 돌려주는 외부 협력자
//!
//! ## 라우팅
//! - `FeedRouter`: 요청 종류별로 어댑터를 선택

pub mod cmoney;
pub mod html_table;
pub mod twse;

pub use cmoney::{CmoneyTableAdapter, HttpPageRenderer, PageRenderer};
pub use html_table::{parse_first_table, parse_tables};
pub use twse::TwseClient;

use crate::error::{DataError, Result};
use crate::fragment::RawFragment;
use async_trait::async_trait;
use std::sync::Arc;
use twstock_core::{Feed, StockIdentity, YearMonth};

/// 어댑터에 전달하는 추출 요청.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    /// 월 단위 일시세. 월마다 한 표씩 반환합니다.
    DailyQuotes { months: Vec<YearMonth> },
    Dividends,
    MonthlyRevenue,
    /// `[자산, 부채, 자본]` 세 표를 반환합니다.
    QuarterlyBalance,
    /// `[손익계산서, EPS]` 두 표를 반환합니다.
    QuarterlyIncome,
}

impl FetchRequest {
    pub fn feed(&self) -> Feed {
        match self {
            Self::DailyQuotes { .. } => Feed::DailyQuote,
            Self::Dividends => Feed::Dividend,
            Self::MonthlyRevenue => Feed::MonthlyRevenue,
            Self::QuarterlyBalance => Feed::QuarterlyBalance,
            Self::QuarterlyIncome => Feed::QuarterlyIncome,
        }
    }
}

/// 원시 표를 가져오는 어댑터.
#[async_trait]
pub trait ExtractionAdapter: Send + Sync {
    /// 어댑터 이름 (로깅용).
    fn name(&self) -> &str;

    /// 요청에 해당하는 원시 표들을 가져옵니다.
    ///
    /// 지원하지 않는 요청이나 소스 오류는 [`DataError::Retrieval`]입니다.
    async fn fetch(&self, stock: &StockIdentity, request: &FetchRequest) -> Result<Vec<RawFragment>>;
}

/// 지원하지 않는 요청에 대한 오류.
pub(crate) fn unsupported(adapter: &str, request: &FetchRequest) -> DataError {
    DataError::Retrieval(format!("{}: {} 피드를 지원하지 않습니다", adapter, request.feed()))
}

/// 피드별 어댑터 라우터.
///
/// 일시세는 `quotes`, 나머지 피드는 `statements` 어댑터로 보냅니다.
#[derive(Clone)]
pub struct FeedRouter {
    quotes: Arc<dyn ExtractionAdapter>,
    statements: Arc<dyn ExtractionAdapter>,
}

impl FeedRouter {
    pub fn new(quotes: Arc<dyn ExtractionAdapter>, statements: Arc<dyn ExtractionAdapter>) -> Self {
        Self { quotes, statements }
    }

    fn route(&self, request: &FetchRequest) -> &Arc<dyn ExtractionAdapter> {
        match request {
            FetchRequest::DailyQuotes { .. } => &self.quotes,
            _ => &self.statements,
        }
    }
}

#[async_trait]
impl ExtractionAdapter for FeedRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn fetch(&self, stock: &StockIdentity, request: &FetchRequest) -> Result<Vec<RawFragment>> {
        self.route(request).fetch(stock, request).await
    }
}
