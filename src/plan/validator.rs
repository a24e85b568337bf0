//! 计划校验（硬门禁）
//!
//! sanitize 去除代码围栏 → 严格 serde 解析（含 steps 非空检查）→ 工具白名单校验。
//! 任何一个越界工具名都会在执行任何工具之前终止整轮运行，没有部分计划恢复路径。

use std::collections::HashSet;

use crate::core::AgentError;
use crate::plan::TaskPlan;

/// 去除 Planner 输出外层的代码围栏（```json ... ``` 或 ``` ... ```）
pub fn sanitize_plan_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let inner = trimmed.trim_matches('`').trim();
    // 围栏后可能紧跟语言标记（json，大小写不限）
    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };
    inner.trim().to_string()
}

/// 解析 Planner 输出为 TaskPlan；失败时携带解析诊断与原始文本（PlanFormat，致命）
pub fn parse_plan(raw: &str) -> Result<TaskPlan, AgentError> {
    let sanitized = sanitize_plan_text(raw);
    let plan: TaskPlan =
        serde_json::from_str(&sanitized).map_err(|e| AgentError::PlanFormat {
            detail: e.to_string(),
            raw: raw.to_string(),
        })?;

    if plan.steps.is_empty() {
        return Err(AgentError::PlanFormat {
            detail: "steps must contain at least one step".to_string(),
            raw: raw.to_string(),
        });
    }

    Ok(plan)
}

/// 工具白名单校验：每个步骤的每个工具名都必须在 allowed 中，否则 PlanTool（致命）
pub fn validate_tools(plan: &TaskPlan, allowed: &HashSet<String>) -> Result<(), AgentError> {
    for step in &plan.steps {
        for tool in &step.tools {
            if !allowed.contains(tool) {
                let mut sorted: Vec<String> = allowed.iter().cloned().collect();
                sorted.sort();
                return Err(AgentError::PlanTool {
                    tool: tool.clone(),
                    step_id: step.step_id,
                    allowed: sorted,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const PLAN_JSON: &str = r#"{
        "goal": "weather in Tokyo",
        "assumptions": [],
        "steps": [
            {"step_id": 1, "action": "look up weather", "tools": ["get_weather"], "success_criteria": "temperature returned"}
        ],
        "risks": []
    }"#;

    #[test]
    fn test_sanitize_fenced_json() {
        let fenced = format!("```json\n{}\n```", PLAN_JSON);
        let plan = parse_plan(&fenced).unwrap();
        assert_eq!(plan.steps.len(), 1);
    }

    #[test]
    fn test_sanitize_plain_fence() {
        let fenced = format!("```\n{}\n```", PLAN_JSON);
        assert!(parse_plan(&fenced).is_ok());
    }

    #[test]
    fn test_sanitize_fence_tag_case_insensitive() {
        for tag in ["Json", "JSON", "jSoN"] {
            let fenced = format!("```{}\n{}\n```", tag, PLAN_JSON);
            assert!(parse_plan(&fenced).is_ok(), "tag {} should be stripped", tag);
        }
    }

    #[test]
    fn test_parse_invalid_json_carries_raw() {
        let err = parse_plan("not json at all").unwrap_err();
        match err {
            AgentError::PlanFormat { raw, .. } => assert_eq!(raw, "not json at all"),
            other => panic!("expected PlanFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_empty_steps() {
        let err = parse_plan(r#"{"goal": "g", "steps": []}"#).unwrap_err();
        assert!(matches!(err, AgentError::PlanFormat { .. }));
    }

    #[test]
    fn test_validate_tools_subset_ok() {
        let plan = parse_plan(PLAN_JSON).unwrap();
        validate_tools(&plan, &allowed(&["get_weather", "tavily_search"])).unwrap();
    }

    #[test]
    fn test_validate_tools_names_offender_and_step() {
        let plan = parse_plan(PLAN_JSON).unwrap();
        let err = validate_tools(&plan, &allowed(&["tavily_search"])).unwrap_err();
        match err {
            AgentError::PlanTool { tool, step_id, .. } => {
                assert_eq!(tool, "get_weather");
                assert_eq!(step_id, 1);
            }
            other => panic!("expected PlanTool, got {:?}", other),
        }
    }
}
