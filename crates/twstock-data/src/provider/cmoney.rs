//! CMoney 종목 페이지 표 어댑터.
//!
//! 종목 페이지(`/forum/stock/{code}?s=<view>`)는 스크립트로 표를 그리므로
//! 렌더링된 HTML은 [`PageRenderer`]가 제공합니다. 어댑터는 렌더링 결과에서
//! 첫 번째 `<table>`을 [`RawFragment`]로 변환하기만 합니다.
//!
//! | 요청 | view | 탭 |
//! |---|---|---|
//! | 배당 | `dividend` | - |
//! | 월매출 | `revenue` | - |
//! | 분기 재무상태표 | `balance-sheet` | `assets`, `liabilities`, `equity` |
//! | 분기 손익계산서 | `income-statement`, `eps` | - |

use crate::error::{DataError, Result};
use crate::fragment::RawFragment;
use crate::provider::html_table::parse_first_table;
use crate::provider::{unsupported, ExtractionAdapter, FetchRequest};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use twstock_core::StockIdentity;

pub const DEFAULT_CMONEY_BASE_URL: &str = "https://www.cmoney.tw";

/// 재무상태표 탭 순서 (자산, 부채, 자본).
pub const BALANCE_TABS: [&str; 3] = ["assets", "liabilities", "equity"];

/// 렌더링된 HTML을 돌려주는 외부 협력자.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// `url`을 렌더링합니다. `tab`이 있으면 해당 탭을 선택한 상태의 HTML입니다.
    async fn render(&self, url: &str, tab: Option<&str>) -> Result<String>;
}

/// HTTP 렌더러.
///
/// `endpoint`가 있으면 렌더링 프록시에 `?url=..&tab=..`로 요청하고,
/// 없으면 페이지를 직접 가져옵니다. 프록시 없이는 탭을 선택할 수 없으므로
/// 탭 요청은 [`DataError::Retrieval`]입니다.
pub struct HttpPageRenderer {
    client: Client,
    endpoint: Option<String>,
}

impl HttpPageRenderer {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PageRenderer for HttpPageRenderer {
    async fn render(&self, url: &str, tab: Option<&str>) -> Result<String> {
        let request = match &self.endpoint {
            Some(endpoint) => {
                let mut query = vec![("url", url)];
                if let Some(tab) = tab {
                    query.push(("tab", tab));
                }
                self.client.get(endpoint).query(&query)
            }
            None => {
                if let Some(tab) = tab {
                    return Err(DataError::Retrieval(format!(
                        "{} 탭을 선택하려면 렌더링 프록시(RENDER_ENDPOINT)가 필요합니다: {}",
                        tab, url
                    )));
                }
                self.client.get(url)
            }
        };

        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// CMoney 표 어댑터.
pub struct CmoneyTableAdapter<R: PageRenderer> {
    renderer: R,
    base_url: String,
}

impl<R: PageRenderer> CmoneyTableAdapter<R> {
    pub fn new(renderer: R, base_url: impl Into<String>) -> Self {
        Self {
            renderer,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// 종목 페이지 URL.
    pub fn page_url(&self, code: &str, view: &str) -> String {
        format!("{}/forum/stock/{}?s={}", self.base_url, code, view)
    }

    /// 페이지(및 탭)를 렌더링해 첫 번째 표를 가져옵니다.
    #[instrument(skip(self, stock), fields(stock = %stock.public_code))]
    async fn fetch_table(&self, stock: &StockIdentity, view: &str, tab: Option<&str>) -> Result<RawFragment> {
        let url = self.page_url(&stock.public_code, view);
        let html = self.renderer.render(&url, tab).await?;

        let fragment = parse_first_table(&html).map_err(|e| match e {
            DataError::Markup(msg) => DataError::Markup(format!("{} ({}): {}", view, tab.unwrap_or("-"), msg)),
            other => other,
        })?;

        debug!(rows = fragment.len(), "CMoney 표 수신");
        Ok(fragment)
    }
}

#[async_trait]
impl<R: PageRenderer> ExtractionAdapter for CmoneyTableAdapter<R> {
    fn name(&self) -> &str {
        "cmoney"
    }

    async fn fetch(&self, stock: &StockIdentity, request: &FetchRequest) -> Result<Vec<RawFragment>> {
        match request {
            FetchRequest::Dividends => Ok(vec![self.fetch_table(stock, "dividend", None).await?]),
            FetchRequest::MonthlyRevenue => Ok(vec![self.fetch_table(stock, "revenue", None).await?]),
            FetchRequest::QuarterlyBalance => {
                let mut tables = Vec::with_capacity(BALANCE_TABS.len());
                for tab in BALANCE_TABS {
                    tables.push(self.fetch_table(stock, "balance-sheet", Some(tab)).await?);
                }
                Ok(tables)
            }
            FetchRequest::QuarterlyIncome => {
                let income = self.fetch_table(stock, "income-statement", None).await?;
                let eps = self.fetch_table(stock, "eps", None).await?;
                Ok(vec![income, eps])
            }
            FetchRequest::DailyQuotes { .. } => Err(unsupported(self.name(), request)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::sync::Mutex;

    /// 요청을 기록하고 view/탭 이름을 헤더로 가진 표를 돌려주는 렌더러.
    #[derive(Default)]
    struct EchoRenderer {
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl PageRenderer for EchoRenderer {
        async fn render(&self, url: &str, tab: Option<&str>) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), tab.map(str::to_string)));

            let view = url.rsplit("s=").next().unwrap_or_default();
            Ok(format!(
                "<table><tr><th>{}</th><th>{}</th></tr><tr><td>1</td><td>2</td></tr></table>",
                view,
                tab.unwrap_or("-")
            ))
        }
    }

    fn stock() -> StockIdentity {
        StockIdentity::new(1, "2330")
    }

    #[test]
    fn test_page_url() {
        let adapter = CmoneyTableAdapter::new(EchoRenderer::default(), "https://www.cmoney.tw/");
        assert_eq!(
            adapter.page_url("2330", "revenue"),
            "https://www.cmoney.tw/forum/stock/2330?s=revenue"
        );
    }

    #[tokio::test]
    async fn test_balance_fetches_three_tabs_in_order() {
        let adapter = CmoneyTableAdapter::new(EchoRenderer::default(), DEFAULT_CMONEY_BASE_URL);
        let tables = adapter.fetch(&stock(), &FetchRequest::QuarterlyBalance).await.unwrap();

        let tabs: Vec<String> = tables.iter().map(|t| t.header().flat_names()[1].clone()).collect();
        assert_eq!(tabs, vec!["assets", "liabilities", "equity"]);
        assert_eq!(adapter.renderer.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_income_fetches_income_then_eps() {
        let adapter = CmoneyTableAdapter::new(EchoRenderer::default(), DEFAULT_CMONEY_BASE_URL);
        let tables = adapter.fetch(&stock(), &FetchRequest::QuarterlyIncome).await.unwrap();

        let views: Vec<String> = tables.iter().map(|t| t.header().flat_names()[0].clone()).collect();
        assert_eq!(views, vec!["income-statement", "eps"]);
    }

    #[tokio::test]
    async fn test_page_without_table_is_markup_error() {
        struct Blank;

        #[async_trait]
        impl PageRenderer for Blank {
            async fn render(&self, _url: &str, _tab: Option<&str>) -> Result<String> {
                Ok("<div>loading...</div>".to_string())
            }
        }

        let adapter = CmoneyTableAdapter::new(Blank, DEFAULT_CMONEY_BASE_URL);
        let err = adapter.fetch(&stock(), &FetchRequest::Dividends).await.unwrap_err();
        assert!(matches!(err, DataError::Markup(_)));
    }

    #[tokio::test]
    async fn test_http_renderer_uses_proxy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/render")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "url".into(),
                    "https://www.cmoney.tw/forum/stock/2330?s=balance-sheet".into(),
                ),
                Matcher::UrlEncoded("tab".into(), "equity".into()),
            ]))
            .with_status(200)
            .with_body("<table></table>")
            .create_async()
            .await;

        let renderer =
            HttpPageRenderer::new(Some(format!("{}/render", server.url())), Duration::from_secs(5)).unwrap();
        let html = renderer
            .render("https://www.cmoney.tw/forum/stock/2330?s=balance-sheet", Some("equity"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(html, "<table></table>");
    }

    #[tokio::test]
    async fn test_http_renderer_without_proxy_rejects_tab() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/forum/stock/2330")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<table><tr><th>日期</th></tr><tr><td>2025/09/16</td></tr></table>")
            .expect(1)
            .create_async()
            .await;

        let renderer = HttpPageRenderer::new(None, Duration::from_secs(5)).unwrap();
        let adapter = CmoneyTableAdapter::new(renderer, server.url());

        let err = adapter.fetch(&stock(), &FetchRequest::QuarterlyBalance).await.unwrap_err();
        assert!(matches!(err, DataError::Retrieval(ref msg) if msg.contains("assets")));

        // 탭이 없는 페이지는 직접 가져옴
        let tables = adapter.fetch(&stock(), &FetchRequest::Dividends).await.unwrap();
        assert_eq!(tables.len(), 1);
        page.assert_async().await;
    }
}
