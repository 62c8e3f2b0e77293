//! 臺灣證券交易所 `STOCK_DAY` 클라이언트.
//!
//! 종목별 월간 일시세를 JSON으로 가져옵니다.
//!
//! ```text
//! GET {base}/exchangeReport/STOCK_DAY?response=json&date=20250901&stockNo=2330
//! {"stat":"OK","fields":["日期","成交股數",...],"data":[["114/09/01","25,431,000",...]]}
//! ```
//!
//! `stat`이 `OK`가 아니면 추출 실패입니다.

use crate::error::{DataError, Result};
use crate::fragment::RawFragment;
use crate::provider::{unsupported, ExtractionAdapter, FetchRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use twstock_core::{StockIdentity, YearMonth};

pub const DEFAULT_TWSE_BASE_URL: &str = "https://www.twse.com.tw";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct StockDayResponse {
    stat: String,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl StockDayResponse {
    fn into_fragment(self) -> Result<RawFragment> {
        if self.stat != "OK" {
            return Err(DataError::Retrieval(format!("TWSE stat: {}", self.stat)));
        }

        let rows = self
            .data
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        Ok(RawFragment::single(self.fields, rows))
    }
}

/// 요청 날짜 파라미터 (`YYYYMM01`).
fn month_param(month: &YearMonth) -> String {
    format!("{:04}{:02}01", month.year, month.month)
}

/// TWSE 일시세 클라이언트.
pub struct TwseClient {
    client: Client,
    base_url: String,
}

impl TwseClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 한 달치 일시세 표를 가져옵니다.
    #[instrument(skip(self, stock), fields(stock = %stock.public_code))]
    pub async fn fetch_month(&self, stock: &StockIdentity, month: &YearMonth) -> Result<RawFragment> {
        let url = format!("{}/exchangeReport/STOCK_DAY", self.base_url);
        let date = month_param(month);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("response", "json"),
                ("date", date.as_str()),
                ("stockNo", stock.public_code.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: StockDayResponse = serde_json::from_str(&response.text().await?)?;
        let fragment = body.into_fragment()?;

        debug!(rows = fragment.len(), "TWSE 월 시세 수신");
        Ok(fragment)
    }
}

#[async_trait]
impl ExtractionAdapter for TwseClient {
    fn name(&self) -> &str {
        "twse"
    }

    async fn fetch(&self, stock: &StockIdentity, request: &FetchRequest) -> Result<Vec<RawFragment>> {
        let FetchRequest::DailyQuotes { months } = request else {
            return Err(unsupported(self.name(), request));
        };

        let mut fragments = Vec::with_capacity(months.len());
        for month in months {
            fragments.push(self.fetch_month(stock, month).await?);
        }
        Ok(fragments)
    }
}
