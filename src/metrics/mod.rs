//! 运行指标：JSONL 追加持久化与趋势统计

pub mod store;

pub use store::{
    format_summary, infer_goal_type, MetricEntry, MetricsStore, MetricsSummary, Trend,
    TREND_WINDOW,
};
