//! 영속 저장소 모듈.
//!
//! 적재기는 [`RowSink`] 트레이트만 알며, 실제 저장소는 호출자가 명시적으로 넘깁니다.
//! - [`PgRowSink`]: PostgreSQL 연결 하나를 파이프라인 실행 동안 보유
//! - [`MemorySink`]: 테스트와 `--dry-run`용 인메모리 구현
//!
//! 피드별 테이블 이름과 열 구성은 [`StorableRecord`] 구현에 고정되어 있습니다.

pub mod catalog;
pub mod memory;
pub mod postgres;

pub use catalog::{CatalogEntry, MemoryCatalog, PgStockCatalog, StockCatalog};
pub use memory::MemorySink;
pub use postgres::PgRowSink;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use twstock_core::{
    DailyQuote, Dividend, MonthlyRevenue, PeriodRecord, QuarterlyBalance, QuarterlyIncome,
};

/// 저장 열 값. `None`은 SQL `NULL`로 기록됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnValue {
    Int(i64),
    Decimal(Option<Decimal>),
    Date(Option<NaiveDate>),
    Text(Option<String>),
    Bool(bool),
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Decimal(Some(v)) => write!(f, "{}", v),
            Self::Date(Some(v)) => write!(f, "{}", v),
            Self::Text(Some(v)) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Decimal(None) | Self::Date(None) | Self::Text(None) => write!(f, "NULL"),
        }
    }
}

/// 피드 테이블 정의.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    /// 유일성 제약을 이루는 열 (종목 + 기간)
    pub key_columns: &'static [&'static str],
}

pub const DAILY_QUOTE_TABLE: TableSpec = TableSpec {
    name: "stock_daily_quotes",
    key_columns: &["stock_id", "trade_date"],
};

pub const DIVIDEND_TABLE: TableSpec = TableSpec {
    name: "stock_dividend",
    key_columns: &["stock_id", "ex_dividend_date"],
};

pub const MONTHLY_REVENUE_TABLE: TableSpec = TableSpec {
    name: "stock_monthly_revenue",
    key_columns: &["stock_id", "year", "month"],
};

pub const QUARTERLY_BALANCE_TABLE: TableSpec = TableSpec {
    name: "stock_quarterly_balance",
    key_columns: &["stock_id", "fiscal_year", "fiscal_quarter"],
};

pub const QUARTERLY_INCOME_TABLE: TableSpec = TableSpec {
    name: "stock_quarterly_income",
    key_columns: &["stock_id", "fiscal_year", "fiscal_quarter"],
};

/// 행 단위 저장소.
///
/// 각 호출은 독립적인 작업 단위입니다. 유일성 위반은
/// [`DataError::DuplicateKey`](crate::DataError::DuplicateKey)로 보고해야 합니다.
#[async_trait]
pub trait RowSink: Send + Sync {
    async fn insert_row(&self, table: &TableSpec, columns: &[(&'static str, ColumnValue)]) -> Result<()>;
}

/// 피드 테이블에 저장 가능한 레코드.
pub trait StorableRecord: PeriodRecord + Send + Sync {
    fn table() -> &'static TableSpec;

    /// `(열 이름, 값)` 목록. 키 열을 먼저 둡니다.
    fn columns(&self) -> Vec<(&'static str, ColumnValue)>;
}

impl StorableRecord for DailyQuote {
    fn table() -> &'static TableSpec {
        &DAILY_QUOTE_TABLE
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("stock_id", ColumnValue::Int(self.stock_id)),
            ("trade_date", ColumnValue::Date(Some(self.trade_date))),
            ("last_price", ColumnValue::Decimal(self.last_price)),
            ("open_price", ColumnValue::Decimal(self.open_price)),
            ("high_price", ColumnValue::Decimal(self.high_price)),
            ("low_price", ColumnValue::Decimal(self.low_price)),
            ("prev_close", ColumnValue::Decimal(self.prev_close)),
            ("volume_lots", ColumnValue::Int(self.volume_lots)),
            ("volume_shares", ColumnValue::Int(self.volume_shares)),
        ]
    }
}

impl StorableRecord for Dividend {
    fn table() -> &'static TableSpec {
        &DIVIDEND_TABLE
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("stock_id", ColumnValue::Int(self.stock_id)),
            ("ex_dividend_date", ColumnValue::Date(Some(self.ex_dividend_date))),
            ("fiscal_year", ColumnValue::Int(i64::from(self.fiscal_year))),
            ("cash_dividend", ColumnValue::Decimal(self.cash_dividend)),
            ("pay_date", ColumnValue::Date(self.pay_date)),
        ]
    }
}

impl StorableRecord for MonthlyRevenue {
    fn table() -> &'static TableSpec {
        &MONTHLY_REVENUE_TABLE
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("stock_id", ColumnValue::Int(self.stock_id)),
            ("year", ColumnValue::Int(i64::from(self.period.year))),
            ("month", ColumnValue::Int(i64::from(self.period.month))),
            ("roc_year", ColumnValue::Int(i64::from(self.period.roc_year()))),
            ("revenue_current", ColumnValue::Decimal(self.revenue_current)),
            ("revenue_prev_year_month", ColumnValue::Decimal(self.revenue_prev_year_month)),
            ("revenue_ytd", ColumnValue::Decimal(self.revenue_ytd)),
            ("revenue_ytd_prev_year", ColumnValue::Decimal(self.revenue_ytd_prev_year)),
        ]
    }
}

impl StorableRecord for QuarterlyBalance {
    fn table() -> &'static TableSpec {
        &QUARTERLY_BALANCE_TABLE
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("stock_id", ColumnValue::Int(self.stock_id)),
            ("fiscal_year", ColumnValue::Int(i64::from(self.period.year))),
            ("fiscal_quarter", ColumnValue::Int(i64::from(self.period.quarter))),
            ("roc_year", ColumnValue::Int(i64::from(self.period.roc_year()))),
            ("total_assets", ColumnValue::Decimal(self.total_assets)),
            ("total_equity", ColumnValue::Decimal(self.total_equity)),
            ("total_liabilities", ColumnValue::Decimal(self.total_liabilities)),
        ]
    }
}

impl StorableRecord for QuarterlyIncome {
    fn table() -> &'static TableSpec {
        &QUARTERLY_INCOME_TABLE
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("stock_id", ColumnValue::Int(self.stock_id)),
            ("fiscal_year", ColumnValue::Int(i64::from(self.period.year))),
            ("fiscal_quarter", ColumnValue::Int(i64::from(self.period.quarter))),
            ("roc_year", ColumnValue::Int(i64::from(self.period.roc_year()))),
            ("revenue", ColumnValue::Decimal(self.revenue)),
            ("gross_profit", ColumnValue::Decimal(self.gross_profit)),
            ("operating_income", ColumnValue::Decimal(self.operating_income)),
            ("net_income", ColumnValue::Decimal(self.net_income)),
            ("eps_basic", ColumnValue::Decimal(self.eps_basic)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use twstock_core::FiscalQuarter;

    #[test]
    fn test_key_columns_lead_every_record() {
        let income = QuarterlyIncome {
            stock_id: 7,
            period: FiscalQuarter::new(2025, 3).unwrap(),
            revenue: Some(dec!(100)),
            gross_profit: None,
            operating_income: None,
            net_income: None,
            eps_basic: Some(dec!(1.5)),
        };

        let columns = income.columns();
        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        assert_eq!(&names[..3], QuarterlyIncome::table().key_columns);
        assert!(columns.contains(&("roc_year", ColumnValue::Int(114))));
        assert!(columns.contains(&("gross_profit", ColumnValue::Decimal(None))));
    }

    #[test]
    fn test_dividend_columns() {
        let dividend = Dividend {
            stock_id: 1,
            ex_dividend_date: NaiveDate::from_ymd_opt(2025, 3, 17).unwrap(),
            fiscal_year: 2025,
            cash_dividend: Some(dec!(4.5)),
            pay_date: None,
        };

        assert_eq!(Dividend::table().name, "stock_dividend");
        assert_eq!(dividend.columns()[1].1.to_string(), "2025-03-17");
        assert_eq!(dividend.columns()[4].1.to_string(), "NULL");
    }
}
