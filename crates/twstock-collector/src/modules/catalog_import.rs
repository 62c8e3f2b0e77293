//! 종목 카탈로그 가져오기.

use crate::{CollectorError, Result};
use std::path::Path;
use std::time::Instant;
use twstock_core::StockIdentity;
use twstock_data::{read_catalog_file, CatalogEntry, LoadReport, StockCatalog};

/// 카탈로그 항목을 하나씩 추가합니다. 이미 있는 종목은 건너뜁니다.
pub async fn import_entries(catalog: &dyn StockCatalog, entries: &[CatalogEntry]) -> LoadReport {
    let start = Instant::now();
    let mut report = LoadReport::default();

    for entry in entries {
        match catalog.insert_entry(entry).await {
            Ok(()) => report.inserted += 1,
            Err(e) if e.is_duplicate() => {
                tracing::debug!(stock_no = %entry.stock_no, "이미 등록된 종목");
                report.skipped_duplicate += 1;
            }
            Err(e) => {
                tracing::error!(stock_no = %entry.stock_no, error = %e, "종목 등록 실패");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        inserted = report.inserted,
        skipped_duplicate = report.skipped_duplicate,
        failed = report.failed,
        elapsed = format!("{:.1}s", start.elapsed().as_secs_f64()),
        "카탈로그 가져오기 완료"
    );
    report
}

/// CSV 파일에서 카탈로그를 가져옵니다.
pub async fn import_catalog(catalog: &dyn StockCatalog, csv_path: &Path) -> Result<LoadReport> {
    let entries = read_catalog_file(csv_path).map_err(CollectorError::catalog)?;
    tracing::info!(path = %csv_path.display(), count = entries.len(), "카탈로그 CSV 로드");
    Ok(import_entries(catalog, &entries).await)
}

/// 카탈로그가 비어 있으면 CSV에서 가져옵니다.
pub async fn ensure_catalog(catalog: &dyn StockCatalog, csv_path: &Path) -> Result<Option<LoadReport>> {
    let count = catalog.count().await.map_err(CollectorError::catalog)?;
    if count > 0 {
        tracing::debug!(count, "카탈로그 존재, 가져오기 건너뛰기");
        return Ok(None);
    }

    tracing::info!("카탈로그가 비어 있음, CSV에서 가져오기");
    import_catalog(catalog, csv_path).await.map(Some)
}

/// 처리할 종목을 고릅니다. `code`가 있으면 해당 종목만 반환합니다.
pub async fn select_stocks(catalog: &dyn StockCatalog, code: Option<&str>) -> Result<Vec<StockIdentity>> {
    match code {
        Some(code) => catalog
            .find_stock(code.trim())
            .await
            .map_err(CollectorError::catalog)?
            .map(|stock| vec![stock])
            .ok_or_else(|| CollectorError::Catalog(format!("카탈로그에 없는 종목: {}", code))),
        None => catalog.list_stocks().await.map_err(CollectorError::catalog),
    }
}
