//! 指标存储
//!
//! 每次运行追加一条 MetricEntry（单行 JSON）到 JSONL 文件：只追加、不改写、不删除。
//! stats 每次查询重读全量日志并计算完成率、三维均分、平均耗时、目标类型直方图与趋势；
//! 任一行解析失败会使整次读取失败（当前基线行为）。

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 趋势窗口：比较最近 window 条与其前 window 条的 success 均分
pub const TREND_WINDOW: usize = 5;

/// 单次运行的不可变指标记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    /// ISO-8601 时间戳
    pub timestamp: String,
    pub goal: String,
    /// 推断的目标类型：weather / search / github / other
    pub goal_type: String,
    pub success_score: i64,
    pub plan_score: i64,
    pub reasoning_score: i64,
    pub execution_time_seconds: f64,
    pub completed: bool,
    pub errors: Vec<String>,
    /// 计划中出现的工具名，去重
    pub tools_used: Vec<String>,
}

/// 三分类趋势（外加样本不足）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        };
        write!(f, "{}", s)
    }
}

/// 聚合统计结果
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_runs: usize,
    /// 完成率（百分比）
    pub success_rate: f64,
    pub avg_success_score: f64,
    pub avg_plan_score: f64,
    pub avg_reasoning_score: f64,
    pub avg_execution_time: f64,
    pub goal_type_breakdown: BTreeMap<String, usize>,
    pub recent_trend: Trend,
}

/// 指标存储：JSONL 文件，追加写入
pub struct MetricsStore {
    storage_path: PathBuf,
}

impl MetricsStore {
    pub fn new(storage_path: impl AsRef<Path>) -> Self {
        Self {
            storage_path: storage_path.as_ref().to_path_buf(),
        }
    }

    /// 追加一条记录（单行 JSON + 换行）；父目录不存在时自动创建
    pub fn log(&self, entry: &MetricEntry) -> anyhow::Result<()> {
        if let Some(parent) = self.storage_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.storage_path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// 读取全部记录（追加顺序）；文件不存在时返回空；任一行损坏则整次读取失败
    pub fn load_all(&self) -> anyhow::Result<Vec<MetricEntry>> {
        if !self.storage_path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.storage_path)?;
        let mut entries = Vec::new();
        for line in data.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str::<MetricEntry>(line)?);
        }
        Ok(entries)
    }

    /// 聚合统计；last_n 限定只看最近 N 条；无记录时返回 None
    pub fn stats(&self, last_n: Option<usize>) -> anyhow::Result<Option<MetricsSummary>> {
        let mut entries = self.load_all()?;
        if let Some(n) = last_n {
            if entries.len() > n {
                entries.drain(..entries.len() - n);
            }
        }
        if entries.is_empty() {
            return Ok(None);
        }

        let total = entries.len();
        let completed = entries.iter().filter(|e| e.completed).count();
        let mut breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for e in &entries {
            *breakdown.entry(e.goal_type.clone()).or_insert(0) += 1;
        }

        Ok(Some(MetricsSummary {
            total_runs: total,
            success_rate: completed as f64 / total as f64 * 100.0,
            avg_success_score: mean(entries.iter().map(|e| e.success_score as f64)),
            avg_plan_score: mean(entries.iter().map(|e| e.plan_score as f64)),
            avg_reasoning_score: mean(entries.iter().map(|e| e.reasoning_score as f64)),
            avg_execution_time: mean(entries.iter().map(|e| e.execution_time_seconds)),
            goal_type_breakdown: breakdown,
            recent_trend: calculate_trend(&entries, TREND_WINDOW),
        }))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// 趋势计算：最近 window 条 vs 其前 window 条的 success 均分之差，
/// > 0.5 改善、< -0.5 恶化、否则稳定；不足 2×window 条则样本不足
fn calculate_trend(entries: &[MetricEntry], window: usize) -> Trend {
    if entries.len() < window * 2 {
        return Trend::InsufficientData;
    }

    let recent = &entries[entries.len() - window..];
    let previous = &entries[entries.len() - window * 2..entries.len() - window];

    let recent_avg = mean(recent.iter().map(|e| e.success_score as f64));
    let previous_avg = mean(previous.iter().map(|e| e.success_score as f64));

    let diff = recent_avg - previous_avg;
    if diff > 0.5 {
        Trend::Improving
    } else if diff < -0.5 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// 目标类型推断：固定关键词顺序，先命中先得，每条目标只归一类
pub fn infer_goal_type(goal: &str) -> &'static str {
    let goal_lower = goal.to_lowercase();

    if ["weather", "temperature", "forecast"]
        .iter()
        .any(|w| goal_lower.contains(w))
    {
        "weather"
    } else if ["search", "find", "look"].iter().any(|w| goal_lower.contains(w)) {
        "search"
    } else if ["issue", "repo", "github", "pull"]
        .iter()
        .any(|w| goal_lower.contains(w))
    {
        "github"
    } else {
        "other"
    }
}

/// 人类可读的统计摘要（CLI `metrics` 命令输出）
pub fn format_summary(summary: &MetricsSummary) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(60));
    out.push_str("\nMETRICS SUMMARY\n");
    out.push_str(&"=".repeat(60));
    out.push_str(&format!("\nTotal Runs:          {}", summary.total_runs));
    out.push_str(&format!("\nSuccess Rate:        {:.1}%", summary.success_rate));
    out.push_str(&format!("\nAvg Success Score:   {:.2}/5", summary.avg_success_score));
    out.push_str(&format!("\nAvg Plan Score:      {:.2}/5", summary.avg_plan_score));
    out.push_str(&format!("\nAvg Reasoning Score: {:.2}/5", summary.avg_reasoning_score));
    out.push_str(&format!("\nAvg Execution Time:  {:.2}s", summary.avg_execution_time));
    out.push_str(&format!(
        "\nPerformance Trend:   {}",
        summary.recent_trend.to_string().to_uppercase()
    ));
    out.push_str("\n\nGoal Type Breakdown:\n");
    for (goal_type, count) in &summary.goal_type_breakdown {
        out.push_str(&format!("  - {}: {}\n", goal_type, count));
    }
    out.push_str(&"=".repeat(60));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(success_score: i64, goal_type: &str, completed: bool) -> MetricEntry {
        MetricEntry {
            timestamp: "2026-01-01T00:00:00+00:00".to_string(),
            goal: "test goal".to_string(),
            goal_type: goal_type.to_string(),
            success_score,
            plan_score: 4,
            reasoning_score: 3,
            execution_time_seconds: 1.5,
            completed,
            errors: vec![],
            tools_used: vec!["get_weather".to_string()],
        }
    }

    #[test]
    fn test_round_trip_preserves_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.jsonl"));

        let entries: Vec<MetricEntry> = (0..4).map(|i| entry(i, "weather", true)).collect();
        for e in &entries {
            store.log(e).unwrap();
        }

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_log_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("data/nested/metrics.jsonl"));
        store.log(&entry(4, "weather", true)).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("nope.jsonl"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_line_fails_whole_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");
        let store = MetricsStore::new(&path);
        store.log(&entry(5, "weather", true)).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{ broken json\n")
            .unwrap();
        assert!(store.load_all().is_err());
    }

    #[test]
    fn test_trend_declining() {
        let entries: Vec<MetricEntry> = [5, 5, 5, 5, 5, 1, 1, 1, 1, 1]
            .iter()
            .map(|&s| entry(s, "other", true))
            .collect();
        assert_eq!(calculate_trend(&entries, TREND_WINDOW), Trend::Declining);
    }

    #[test]
    fn test_trend_improving_and_stable() {
        let improving: Vec<MetricEntry> = [1, 1, 1, 1, 1, 5, 5, 5, 5, 5]
            .iter()
            .map(|&s| entry(s, "other", true))
            .collect();
        assert_eq!(calculate_trend(&improving, TREND_WINDOW), Trend::Improving);

        let stable: Vec<MetricEntry> = [3, 3, 3, 3, 3, 3, 3, 3, 3, 3]
            .iter()
            .map(|&s| entry(s, "other", true))
            .collect();
        assert_eq!(calculate_trend(&stable, TREND_WINDOW), Trend::Stable);
    }

    #[test]
    fn test_trend_insufficient_data() {
        let entries: Vec<MetricEntry> = (0..9).map(|_| entry(3, "other", true)).collect();
        assert_eq!(
            calculate_trend(&entries, TREND_WINDOW),
            Trend::InsufficientData
        );
    }

    #[test]
    fn test_stats_last_n_and_rates() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.jsonl"));
        store.log(&entry(1, "weather", false)).unwrap();
        store.log(&entry(5, "search", true)).unwrap();
        store.log(&entry(3, "search", true)).unwrap();

        let all = store.stats(None).unwrap().unwrap();
        assert_eq!(all.total_runs, 3);
        assert!((all.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(all.goal_type_breakdown["search"], 2);

        let last_two = store.stats(Some(2)).unwrap().unwrap();
        assert_eq!(last_two.total_runs, 2);
        assert!((last_two.avg_success_score - 4.0).abs() < 1e-9);
        assert_eq!(last_two.recent_trend, Trend::InsufficientData);
    }

    #[test]
    fn test_stats_empty_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.jsonl"));
        assert!(store.stats(None).unwrap().is_none());
    }

    #[test]
    fn test_infer_goal_type_keyword_order() {
        assert_eq!(infer_goal_type("What's the weather in NYC"), "weather");
        assert_eq!(infer_goal_type("Find trending repos"), "search");
        assert_eq!(infer_goal_type("create an issue in a/b"), "github");
        assert_eq!(infer_goal_type("hello there"), "other");
        // weather 关键词优先于 search
        assert_eq!(infer_goal_type("find the forecast"), "weather");
    }
}
