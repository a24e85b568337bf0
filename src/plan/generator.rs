//! 计划生成
//!
//! 纯生成：构造 Planner prompt（嵌入 TaskPlan JSON Schema 与工具白名单）并调用 LLM，
//! 不做任何校验，解析与白名单门禁在 validator 中。

use std::sync::Arc;

use schemars::schema_for;

use crate::core::AgentError;
use crate::llm::{LlmClient, Message};
use crate::plan::TaskPlan;

/// Planner：持有 LLM，generate(goal, allowed) 返回原始计划文本
pub struct PlanGenerator {
    llm: Arc<dyn LlmClient>,
}

impl PlanGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 生成计划文本；allowed 为当前注册的工具名（已排序）
    pub async fn generate(&self, goal: &str, allowed: &[String]) -> Result<String, AgentError> {
        let prompt = build_plan_prompt(goal, allowed);
        self.llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::LlmError)
    }
}

fn task_plan_schema_json() -> String {
    let schema = schema_for!(TaskPlan);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

fn build_plan_prompt(goal: &str, allowed: &[String]) -> String {
    format!(
        "You are the Task Planner.\n\n\
         Create a task plan for the following goal.\n\n\
         CRITICAL RULES (VIOLATION = FAILURE):\n\
         1. Return ONLY valid JSON\n\
         2. JSON MUST match this schema exactly:\n{schema}\n\n\
         3. You may ONLY use tool names from this list:\n{allowed}\n\n\
         TOOL SELECTION RULES:\n\
         - For web searches: Use 'tavily_search' (reliable, fast)\n\
         - For weather: Use 'get_weather'\n\
         - For GitHub: Use 'create_issue', 'list_issues', 'create_or_update_file'\n\
         - Prefer simple, single-step solutions\n\n\
         **MULTI-TOOL RULES:**\n\
         - Each step should have EXACTLY ONE tool\n\
         - If you need data from Tool A to use in Tool B, create TWO steps:\n\
           Step 1: Use Tool A to gather data\n\
           Step 2: Use Tool B with the data from Step 1\n\
         - NEVER combine tools that depend on each other in the same step\n\
         - Example: 'search then create issue' = 2 steps, NOT 1 step\n\n\
         DO NOT invent tools.\n\
         DO NOT use generic terms like 'browser', 'internet', or 'API'.\n\
         If no tool is needed for a step, omit the tools field.\n\n\
         Goal: {goal}",
        schema = task_plan_schema_json(),
        allowed = allowed.join(", "),
        goal = goal
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_schema_and_allowlist() {
        let prompt = build_plan_prompt(
            "weather in Tokyo",
            &["get_weather".to_string(), "tavily_search".to_string()],
        );
        assert!(prompt.contains("get_weather, tavily_search"));
        assert!(prompt.contains("success_criteria"));
        assert!(prompt.contains("Goal: weather in Tokyo"));
    }

    #[tokio::test]
    async fn test_generate_returns_raw_llm_output() {
        let llm = Arc::new(crate::llm::MockLlmClient::with_responses(vec![
            "{not validated here}".to_string(),
        ]));
        let generator = PlanGenerator::new(llm);
        let raw = generator.generate("g", &[]).await.unwrap();
        assert_eq!(raw, "{not validated here}");
    }
}
