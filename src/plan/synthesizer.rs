//! 答案合成
//!
//! 将目标、已校验计划与全部工具结果拼入 Executor prompt，一次 LLM 调用产出最终答案。
//! 指令约定要求综合每条工具结果，而非仅报告「任务完成」；LLM 失败由编排器捕获为非致命标记。

use std::sync::Arc;

use crate::core::AgentError;
use crate::dispatch::ToolResults;
use crate::llm::{LlmClient, Message};
use crate::plan::TaskPlan;

/// Executor：持有 LLM，synthesize(goal, plan, results) 返回最终答案文本
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn synthesize(
        &self,
        goal: &str,
        plan: &TaskPlan,
        results: &ToolResults,
    ) -> Result<String, AgentError> {
        let prompt = build_exec_prompt(goal, plan, results);
        self.llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::LlmError)
    }
}

fn build_exec_prompt(goal: &str, plan: &TaskPlan, results: &ToolResults) -> String {
    let plan_json = serde_json::to_string_pretty(plan).unwrap_or_else(|_| "{}".to_string());

    let mut prompt = format!(
        "You are the Action Executor.\n\n\
         You MUST use the tool results below to complete the user's goal.\n\n\
         Task Plan:\n{}\n\n",
        plan_json
    );

    if !results.is_empty() {
        prompt.push_str("\n**Tool Execution Results:**\n");
        for (tool, result) in results.iter() {
            prompt.push_str(&format!("\n{}:\n{}\n", tool, result));
        }
    }

    prompt.push_str(&format!(
        "\n**CRITICAL INSTRUCTIONS:**\n\
         1. Synthesize ALL tool results above into a coherent answer\n\
         2. If multiple steps were executed, combine the results logically\n\
         3. For example, if you searched for repos AND created an issue:\n\
            - Extract repo names/URLs from search results\n\
            - Format them into a summary\n\
            - Confirm the issue was created with that summary\n\
         4. DO NOT just say 'task completed' - provide specific details\n\
         5. Show what data was found and what action was taken\n\n\
         Original user goal: {}",
        goal
    ));

    prompt
}
