//! 编排错误类型
//!
//! 致命错误（PlanFormat / PlanTool / JudgeFormat）在写入任何 MetricEntry 之前终止整轮运行；
//! 单个工具失败与合成失败是非致命的，以错误标记文本形式进入结果与指标。

use thiserror::Error;

/// 编排过程中可能出现的错误（计划格式、工具名越界、工具执行、LLM、评分格式等）
#[derive(Error, Debug)]
pub enum AgentError {
    /// Planner 输出无法解析为 TaskPlan（致命；携带解析诊断与原始文本便于排查）
    #[error("Planner produced invalid TaskPlan.\nValidation error: {detail}\nRaw output:\n{raw}")]
    PlanFormat { detail: String, raw: String },

    /// 计划引用了白名单之外的工具（致命；指明工具名与步骤）
    #[error("Plan uses invalid tool '{tool}' in step {step_id}. Allowed tools: {allowed:?}")]
    PlanTool {
        tool: String,
        step_id: i64,
        allowed: Vec<String>,
    },

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    /// Judge 输出在单次修复后仍不符合 JudgeScore 模式（致命，不再重试）
    #[error("Judge returned invalid JudgeScore after repair attempt: {0}")]
    JudgeFormat(String),

    #[error("Metrics store error: {0}")]
    MetricsStore(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}
