//! 计划与运行结果的结构定义
//!
//! TaskPlan / PlanStep 同时派生 serde 与 schemars：serde 用于严格解析 Planner 输出，
//! schemars 生成的 JSON Schema 注入 Planner prompt，减少 LLM 输出格式错误。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::judge::JudgeScore;

/// 计划中的单个步骤
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    /// 顺序步骤编号
    pub step_id: i64,
    /// 该步骤要做什么
    pub action: String,
    /// 本步骤需要的工具名（可为空）
    #[serde(default)]
    pub tools: Vec<String>,
    /// 如何判断该步骤成功
    pub success_criteria: String,
}

/// 由用户目标生成的结构化任务计划；steps 至少一个（由 validator 强制）
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TaskPlan {
    /// 用户目标
    pub goal: String,
    #[serde(default)]
    pub assumptions: Vec<String>,
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub risks: Vec<String>,
}

impl TaskPlan {
    /// 计划中出现的全部工具名，去重并排序（用于 MetricEntry.tools_used）
    pub fn tools_used(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .steps
            .iter()
            .flat_map(|s| s.tools.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// 单次运行的各阶段产物
#[derive(Debug, Clone, Serialize)]
pub struct RunOutputs {
    pub plan: TaskPlan,
    /// 研究阶段占位输出（当前直接使用工具结果，跳过独立研究步骤）
    pub research: String,
    pub judge: JudgeScore,
    /// 工具名 → 结果文本（计划首遇顺序，每个工具至多一条）
    pub tool_results: serde_json::Value,
    pub execution_time: f64,
}

/// 返回给调用方的单次运行摘要（不持久化）
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub goal: String,
    pub completed: bool,
    pub outputs: RunOutputs,
    pub errors: Vec<String>,
    pub final_answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_used_dedup_sorted() {
        let plan: TaskPlan = serde_json::from_str(
            r#"{
                "goal": "g",
                "steps": [
                    {"step_id": 1, "action": "a", "tools": ["tavily_search"], "success_criteria": "s"},
                    {"step_id": 2, "action": "b", "tools": ["create_issue", "tavily_search"], "success_criteria": "s"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(plan.tools_used(), vec!["create_issue", "tavily_search"]);
    }

    #[test]
    fn test_optional_fields_default() {
        let plan: TaskPlan = serde_json::from_str(
            r#"{"goal": "g", "steps": [{"step_id": 1, "action": "a", "success_criteria": "s"}]}"#,
        )
        .unwrap();
        assert!(plan.assumptions.is_empty());
        assert!(plan.risks.is_empty());
        assert!(plan.steps[0].tools.is_empty());
    }
}
