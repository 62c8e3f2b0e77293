//! 종목 카탈로그.
//!
//! 드라이버가 처리할 종목 목록(`stocks` 테이블)을 조회하고,
//! 거래소 종목 CSV를 읽어 카탈로그를 채웁니다.
//!
//! CSV 열: `代號`, `名稱`, `市場`, `市值(億)`, `產業別`

use crate::error::{DataError, Result};
use crate::transform::parse_number;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::postgres::PgPool;
use std::io::Read;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use twstock_core::StockIdentity;

/// 카탈로그에 넣을 종목 한 건.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub stock_no: String,
    pub name: String,
    /// `TSE`, `OTC` 또는 원본 표기
    pub market: String,
    /// 시가총액 (억)
    pub market_cap: Option<Decimal>,
    pub industry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "代號")]
    code: Option<String>,
    #[serde(rename = "名稱")]
    name: Option<String>,
    #[serde(rename = "市場")]
    market: Option<String>,
    #[serde(rename = "市值(億)")]
    market_cap: Option<String>,
    #[serde(rename = "產業別")]
    industry: Option<String>,
}

/// 엑셀식 문자열 표기(`="2330"`)를 벗겨냅니다. `2882A` 같은 영문 코드는 유지합니다.
pub fn clean_stock_no(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let code = trimmed
        .strip_prefix("=\"")
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim();

    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// 시장 표기를 정규화합니다. `市` → `TSE`, `櫃` → `OTC`.
pub fn map_market(raw: &str) -> String {
    match raw.trim() {
        "市" => "TSE".to_string(),
        "櫃" => "OTC".to_string(),
        other => other.to_string(),
    }
}

/// 카탈로그 CSV를 읽습니다. 코드가 빈 행은 건너뜁니다.
pub fn read_catalog_csv<R: Read>(reader: R) -> Result<Vec<CatalogEntry>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (line, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = record?;

        let Some(stock_no) = row.code.as_deref().and_then(clean_stock_no) else {
            debug!(line = line + 2, "종목 코드가 없는 행 건너뜀");
            continue;
        };

        let market_cap = match row.market_cap.as_deref() {
            Some(raw) => parse_number(raw).unwrap_or_else(|_| {
                warn!(stock = %stock_no, raw, "시가총액 해석 실패, 부재로 처리");
                None
            }),
            None => None,
        };

        entries.push(CatalogEntry {
            name: row.name.unwrap_or_default(),
            market: row.market.as_deref().map(map_market).unwrap_or_default(),
            market_cap,
            industry: row.industry.filter(|s| !s.is_empty()),
            stock_no,
        });
    }

    Ok(entries)
}

/// 파일 경로에서 카탈로그 CSV를 읽습니다.
pub fn read_catalog_file(path: impl AsRef<Path>) -> Result<Vec<CatalogEntry>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| DataError::Config(format!("{}: {}", path.display(), e)))?;
    read_catalog_csv(file)
}

/// 종목 카탈로그 저장소.
#[async_trait]
pub trait StockCatalog: Send + Sync {
    /// 활성 종목 목록 (내부 ID 순).
    async fn list_stocks(&self) -> Result<Vec<StockIdentity>>;

    /// 공개 코드로 종목을 찾습니다.
    async fn find_stock(&self, code: &str) -> Result<Option<StockIdentity>>;

    /// 카탈로그 행 수.
    async fn count(&self) -> Result<i64>;

    /// 활성 상태로 종목을 추가합니다.
    async fn insert_entry(&self, entry: &CatalogEntry) -> Result<()>;
}

/// PostgreSQL `stocks` 테이블 카탈로그.
#[derive(Clone)]
pub struct PgStockCatalog {
    pool: PgPool,
}

impl PgStockCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StockCatalog for PgStockCatalog {
    #[instrument(skip(self))]
    async fn list_stocks(&self) -> Result<Vec<StockIdentity>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT id::BIGINT, stock_no
            FROM stocks
            WHERE is_active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, code)| StockIdentity::new(id, code.trim()))
            .collect())
    }

    #[instrument(skip(self))]
    async fn find_stock(&self, code: &str) -> Result<Option<StockIdentity>> {
        let row: Option<(i64, String)> = sqlx::query_as(
            r#"
            SELECT id::BIGINT, stock_no
            FROM stocks
            WHERE stock_no = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, code)| StockIdentity::new(id, code.trim())))
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_entry(&self, entry: &CatalogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stocks (stock_no, name, market, market_cap, industry, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            "#,
        )
        .bind(&entry.stock_no)
        .bind(&entry.name)
        .bind(&entry.market)
        .bind(entry.market_cap)
        .bind(&entry.industry)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// 인메모리 카탈로그. ID는 삽입 순서대로 1부터 부여됩니다.
#[derive(Default)]
pub struct MemoryCatalog {
    entries: Mutex<Vec<(StockIdentity, CatalogEntry)>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 코드 목록으로 카탈로그를 만듭니다.
    pub fn with_codes<S: AsRef<str>>(codes: impl IntoIterator<Item = S>) -> Self {
        let entries = codes
            .into_iter()
            .enumerate()
            .map(|(i, code)| {
                let code = code.as_ref().to_string();
                (
                    StockIdentity::new(i as i64 + 1, code.clone()),
                    CatalogEntry {
                        stock_no: code,
                        name: String::new(),
                        market: String::new(),
                        market_cap: None,
                        industry: None,
                    },
                )
            })
            .collect();

        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl StockCatalog for MemoryCatalog {
    async fn list_stocks(&self) -> Result<Vec<StockIdentity>> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().map(|(identity, _)| identity.clone()).collect())
    }

    async fn find_stock(&self, code: &str) -> Result<Option<StockIdentity>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .find(|(identity, _)| identity.public_code == code)
            .map(|(identity, _)| identity.clone()))
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.entries.lock().await.len() as i64)
    }

    async fn insert_entry(&self, entry: &CatalogEntry) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|(_, e)| e.stock_no == entry.stock_no) {
            return Err(DataError::DuplicateKey(format!("stocks ({})", entry.stock_no)));
        }

        let id = entries.len() as i64 + 1;
        entries.push((StockIdentity::new(id, entry.stock_no.clone()), entry.clone()));
        Ok(())
    }
}
