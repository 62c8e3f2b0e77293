//! 전체 파이프라인 통합 테스트 (스텁 어댑터 + 인메모리 싱크).

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use twstock_collector::modules::{
    run_pipeline, Collector, DailyQuotePipeline, MonthlyRevenuePipeline, PipelineContext, PipelineOutcome,
    QuarterlyBalancePipeline, SinkProvider, Stage,
};
use twstock_collector::{DriverConfig, WindowConfig};
use twstock_core::{Feed, StockIdentity, YearMonth};
use twstock_data::storage::{
    DAILY_QUOTE_TABLE, DIVIDEND_TABLE, MONTHLY_REVENUE_TABLE, QUARTERLY_BALANCE_TABLE,
    QUARTERLY_INCOME_TABLE,
};
use twstock_data::{
    ColumnValue, DataError, ExtractionAdapter, FetchRequest, Header, MemorySink, RawFragment,
};

/// 피드별 고정 표를 돌려주는 어댑터.
#[derive(Default)]
struct CannedAdapter {
    tables: HashMap<Feed, Vec<RawFragment>>,
    offline: HashSet<String>,
}

impl CannedAdapter {
    fn with(mut self, feed: Feed, tables: Vec<RawFragment>) -> Self {
        self.tables.insert(feed, tables);
        self
    }

    fn offline_for(mut self, code: &str) -> Self {
        self.offline.insert(code.to_string());
        self
    }
}

#[async_trait]
impl ExtractionAdapter for CannedAdapter {
    fn name(&self) -> &str {
        "canned"
    }

    async fn fetch(
        &self,
        stock: &StockIdentity,
        request: &FetchRequest,
    ) -> twstock_data::Result<Vec<RawFragment>> {
        if self.offline.contains(&stock.public_code) {
            return Err(DataError::Retrieval(format!("{} unreachable", stock.public_code)));
        }
        self.tables
            .get(&request.feed())
            .cloned()
            .ok_or_else(|| DataError::Retrieval(format!("no table for {}", request.feed())))
    }
}

fn rows<const N: usize>(rows: &[[&str; N]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

fn two_level(columns: &[(&str, &str)], data: Vec<Vec<String>>) -> RawFragment {
    let header = Header::TwoLevel(
        columns
            .iter()
            .map(|(upper, lower)| (upper.to_string(), lower.to_string()))
            .collect(),
    );
    RawFragment::new(header, data)
}

fn quote_month(data: &[[&str; 9]]) -> RawFragment {
    RawFragment::single(
        ["日期", "成交股數", "成交金額", "開盤價", "最高價", "最低價", "收盤價", "漲跌價差", "成交筆數"],
        rows(data),
    )
}

fn quote_tables() -> Vec<RawFragment> {
    vec![
        quote_month(&[
            ["114/09/30", "30,000,000", "1", "1,300.00", "1,310.00", "1,290.00", "1,305.00", "+5.00", "1"],
        ]),
        quote_month(&[
            ["114/10/01", "25,431,999", "1", "1,310.00", "1,320.00", "1,300.00", "1,315.00", "+10.00", "1"],
            ["114/10/02", "0", "0", "--", "--", "--", "--", "X0.00", "0"],
        ]),
    ]
}

fn dividend_tables() -> Vec<RawFragment> {
    vec![two_level(
        &[
            ("除權息年度", "除權息年度"),
            ("現金股利(元)", "股利"),
            ("現金股利(元)", "除息日"),
            ("現金股利(元)", "發放日"),
        ],
        rows(&[
            ["2026", "6.00", "", ""],
            ["2025", "5.00", "2025/09/16", "2025/10/09"],
            ["2025", "4.50", "2025/06/12", "2025/07/10"],
            ["2019", "2.50", "2019/06/20", "2019/07/18"],
        ]),
    )]
}

fn revenue_tables() -> Vec<RawFragment> {
    vec![two_level(
        &[
            ("年度/月份", "年度/月份"),
            ("營業收入", "當月營收"),
            ("營業收入", "去年同月營收"),
            ("累積營業收入", "當月累計營收"),
            ("累積營業收入", "去年累計營收"),
        ],
        rows(&[
            ["2025/09", "330,980,190", "251,872,717", "2,762,963,412", "2,025,845,729"],
            ["2025/08", "335,772,471", "250,866,271", "2,431,983,222", "1,773,973,012"],
        ]),
    )]
}

fn balance_tables(assets_period: &str) -> Vec<RawFragment> {
    vec![
        RawFragment::single(
            ["日期", "總資產"],
            rows(&[[assets_period, "6,000,000,000"], ["2025/Q1", "5,900,000,000"]]),
        ),
        RawFragment::single(["日期", "總負債"], rows(&[["2025/Q2", "2,100,000,000"], ["2025/Q1", "2,000,000,000"]])),
        RawFragment::single(
            ["日期", "股東權益(淨值)"],
            rows(&[["2025/Q2", "3,900,000,000"], ["2025/Q1", "3,900,000,000"], ["2024", "1"]]),
        ),
    ]
}

fn income_tables() -> Vec<RawFragment> {
    vec![
        RawFragment::single(
            ["日期", "營收", "毛利", "營業利益", "稅後淨利"],
            rows(&[
                ["2025/Q3", "989,918,000", "588,532,000", "500,000,000", "452,302,000"],
                ["2025/Q2", "933,792,000", "549,027,000", "455,110,000", "398,272,000"],
            ]),
        ),
        RawFragment::single(["年度/季別", "每股盈餘"], rows(&[["2025/Q2", "15.36"]])),
    ]
}

fn full_adapter() -> CannedAdapter {
    CannedAdapter::default()
        .with(Feed::DailyQuote, quote_tables())
        .with(Feed::Dividend, dividend_tables())
        .with(Feed::MonthlyRevenue, revenue_tables())
        .with(Feed::QuarterlyBalance, balance_tables("2025/Q2"))
        .with(Feed::QuarterlyIncome, income_tables())
}

fn collector(adapter: CannedAdapter, sink: Arc<MemorySink>) -> Collector {
    let driver = DriverConfig {
        request_delay_ms: 0,
        concurrency: 2,
        catalog_csv: "StockList.csv".into(),
    };
    Collector::new(Arc::new(adapter), SinkProvider::Memory(sink), WindowConfig::default(), &driver)
        .with_current_month(YearMonth::new(2025, 10).unwrap())
}

fn not_stopped() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[tokio::test]
async fn test_all_feeds_load() {
    let sink = Arc::new(MemorySink::new());
    let stats = collector(full_adapter(), sink.clone())
        .run(vec![StockIdentity::new(1, "2330")], not_stopped())
        .await;

    assert_eq!(stats.runs, 5);
    assert_eq!(stats.done, 5);
    assert!(!stats.has_failures());

    assert_eq!(sink.count(&DAILY_QUOTE_TABLE).await, 3);
    assert_eq!(sink.count(&DIVIDEND_TABLE).await, 2);
    assert_eq!(sink.count(&MONTHLY_REVENUE_TABLE).await, 2);
    assert_eq!(sink.count(&QUARTERLY_BALANCE_TABLE).await, 2);
    assert_eq!(sink.count(&QUARTERLY_INCOME_TABLE).await, 2);
    assert_eq!(stats.inserted, 11);

    let incomes = sink.rows(&QUARTERLY_INCOME_TABLE).await;
    let q3 = &incomes[0];
    assert!(q3.contains(&("fiscal_quarter", ColumnValue::Int(3))));
    assert!(q3.contains(&("roc_year", ColumnValue::Int(114))));
    assert!(q3.contains(&("eps_basic", ColumnValue::Decimal(None))));
    assert!(incomes[1].contains(&("eps_basic", ColumnValue::Decimal(Some(dec!(15.36))))));

    let revenues = sink.rows(&MONTHLY_REVENUE_TABLE).await;
    assert!(revenues[0].contains(&("revenue_current", ColumnValue::Decimal(Some(dec!(3309.8019))))));

    let quotes = sink.rows(&DAILY_QUOTE_TABLE).await;
    assert!(quotes[2].contains(&("volume_shares", ColumnValue::Int(0))));
    assert!(quotes[2].contains(&("last_price", ColumnValue::Decimal(None))));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let sink = Arc::new(MemorySink::new());
    let stocks = vec![StockIdentity::new(1, "2330")];

    let first = collector(full_adapter(), sink.clone()).run(stocks.clone(), not_stopped()).await;
    let second = collector(full_adapter(), sink.clone()).run(stocks, not_stopped()).await;

    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped_duplicate, first.inserted);
    assert_eq!(second.failed_rows, 0);
    assert_eq!(sink.count(&DAILY_QUOTE_TABLE).await, 3);
}

#[tokio::test]
async fn test_retrieval_failure_does_not_block_other_stocks() {
    let sink = Arc::new(MemorySink::new());
    let adapter = full_adapter().offline_for("2317");
    let stats = collector(adapter, sink.clone())
        .with_feeds(vec![Feed::Dividend])
        .run(
            vec![StockIdentity::new(1, "2330"), StockIdentity::new(2, "2317")],
            not_stopped(),
        )
        .await;

    assert_eq!(stats.stocks, 2);
    assert_eq!(stats.runs, 2);
    assert_eq!(stats.done, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(sink.count(&DIVIDEND_TABLE).await, 2);
}

#[tokio::test]
async fn test_failed_stages() {
    let sink = MemorySink::new();
    let windows = WindowConfig::default();
    let stock = StockIdentity::new(1, "2330");

    // 존재하지 않는 달 → 병합 단계에서 날짜 해석 실패
    let bad_date = CannedAdapter::default().with(
        Feed::DailyQuote,
        vec![quote_month(&[["114/13/01", "1", "1", "1", "1", "1", "1", "1", "1"]])],
    );
    let ctx = PipelineContext {
        adapter: &bad_date,
        sink: &sink,
        windows: &windows,
    };
    let run = run_pipeline(&DailyQuotePipeline::new(YearMonth::new(2025, 10).unwrap()), &ctx, &stock).await;
    assert!(matches!(run.outcome, PipelineOutcome::Failed { stage: Stage::Merged, .. }));

    // 5분기 → 정규화 단계의 기간 필터에서 실패
    let bad_quarter = CannedAdapter::default().with(Feed::QuarterlyBalance, balance_tables("2025/Q5"));
    let ctx = PipelineContext {
        adapter: &bad_quarter,
        sink: &sink,
        windows: &windows,
    };
    let run = run_pipeline(&QuarterlyBalancePipeline, &ctx, &stock).await;
    assert!(matches!(run.outcome, PipelineOutcome::Failed { stage: Stage::Normalized, .. }));

    // 필요한 열 없음
    let missing = CannedAdapter::default().with(
        Feed::QuarterlyBalance,
        vec![
            RawFragment::single(["日期"], vec![]),
            RawFragment::single(["日期", "總負債"], vec![]),
            RawFragment::single(["日期", "股東權益(淨值)"], vec![]),
        ],
    );
    let ctx = PipelineContext {
        adapter: &missing,
        sink: &sink,
        windows: &windows,
    };
    let run = run_pipeline(&QuarterlyBalancePipeline, &ctx, &stock).await;
    assert!(matches!(run.outcome, PipelineOutcome::Failed { stage: Stage::Normalized, .. }));
    assert!(run.outcome.to_string().contains("總資產"));

    assert_eq!(sink.count(&DAILY_QUOTE_TABLE).await, 0);
    assert_eq!(sink.count(&QUARTERLY_BALANCE_TABLE).await, 0);
}

#[tokio::test]
async fn test_row_failure_keeps_run_done() {
    let sink = Arc::new(
        MemorySink::new().fail_on("month", ColumnValue::Int(8)),
    );
    let stats = collector(full_adapter(), sink.clone())
        .with_feeds(vec![Feed::MonthlyRevenue])
        .run(vec![StockIdentity::new(1, "2330")], not_stopped())
        .await;

    assert_eq!(stats.done, 1);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.failed_rows, 1);
    assert!(!stats.has_failures());
}

fn revenue_with_current(current: &str) -> Vec<RawFragment> {
    vec![two_level(
        &[
            ("年度/月份", "年度/月份"),
            ("營業收入", "當月營收"),
            ("營業收入", "去年同月營收"),
            ("累積營業收入", "當月累計營收"),
            ("累積營業收入", "去年累計營收"),
        ],
        rows(&[["2025/09", current, "251,872,717", "2,762,963,412", "2,025,845,729"]]),
    )]
}

#[tokio::test]
async fn test_unrepresentable_cells_fail_only_their_run() {
    let sink = Arc::new(MemorySink::new());
    let adapter = full_adapter()
        .with(
            Feed::MonthlyRevenue,
            revenue_with_current("79,228,162,514,264,337,593,543,950,335"),
        )
        .with(
            Feed::DailyQuote,
            vec![quote_month(&[["2147483647/01/01", "1", "1", "1", "1", "1", "1", "1", "1"]])],
        );
    let driver = collector(adapter, sink.clone())
        .with_feeds(vec![Feed::DailyQuote, Feed::Dividend, Feed::MonthlyRevenue])
        .with_concurrency(1);

    let stock = StockIdentity::new(1, "2330");
    let revenue = driver.run_feed(&stock, Feed::MonthlyRevenue).await;
    assert!(matches!(revenue.outcome, PipelineOutcome::Failed { stage: Stage::Scaled, .. }));
    let quote = driver.run_feed(&stock, Feed::DailyQuote).await;
    assert!(matches!(quote.outcome, PipelineOutcome::Failed { stage: Stage::Merged, .. }));

    let stats = driver
        .run(vec![stock, StockIdentity::new(2, "2317")], not_stopped())
        .await;

    assert_eq!(stats.stocks, 2);
    assert_eq!(stats.runs, 6);
    assert_eq!(stats.done, 2);
    assert_eq!(stats.failed, 4);
    assert_eq!(sink.count(&DIVIDEND_TABLE).await, 4);
    assert_eq!(sink.count(&MONTHLY_REVENUE_TABLE).await, 0);
    assert_eq!(sink.count(&DAILY_QUOTE_TABLE).await, 0);
}

#[tokio::test]
async fn test_malformed_number_fails_at_scaled() {
    let sink = MemorySink::new();
    let windows = WindowConfig::default();
    let adapter = CannedAdapter::default().with(Feed::MonthlyRevenue, revenue_with_current("N/A"));
    let ctx = PipelineContext {
        adapter: &adapter,
        sink: &sink,
        windows: &windows,
    };

    let run = run_pipeline(&MonthlyRevenuePipeline, &ctx, &StockIdentity::new(1, "2330")).await;
    assert!(matches!(run.outcome, PipelineOutcome::Failed { stage: Stage::Scaled, .. }));
    assert!(run.outcome.to_string().contains("N/A"));
    assert_eq!(sink.count(&MONTHLY_REVENUE_TABLE).await, 0);
}
