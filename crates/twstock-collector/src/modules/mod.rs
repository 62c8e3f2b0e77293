//! 피드 파이프라인과 수집 드라이버.

pub mod catalog_import;
pub mod daily_quote;
pub mod dividend;
pub mod driver;
pub mod monthly_revenue;
pub mod pipeline;
pub mod quarterly_balance;
pub mod quarterly_income;

pub use catalog_import::{ensure_catalog, import_catalog, import_entries, select_stocks};
pub use daily_quote::{current_month, recent_months, DailyQuotePipeline};
pub use dividend::DividendPipeline;
pub use driver::{Collector, SinkProvider};
pub use monthly_revenue::MonthlyRevenuePipeline;
pub use pipeline::{
    run_pipeline, FeedPipeline, FeedRun, PipelineContext, PipelineOutcome, Stage,
};
pub use quarterly_balance::QuarterlyBalancePipeline;
pub use quarterly_income::QuarterlyIncomePipeline;
