//! LLM-as-judge 质量评分
//!
//! 三个整数维度（success / plan_quality / reasoning_quality）各在 [0,5]，越界或非整数
//! 都是校验失败，不做钳制。解析失败时发起恰好一次修复重询（以首次失败响应为上下文，
//! 要求仅输出符合 Schema 的 JSON）；第二次失败作为 JudgeFormat 致命传播，不再重试。

use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::{LlmClient, Message};
use crate::plan::TaskPlan;

/// Trace 注入 prompt 前的最大字符数
const MAX_TRACE_CHARS: usize = 6000;

/// 单次运行的评分：三维整数各 0-5，附自由文本备注
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JudgeScore {
    /// 最终答案是否满足目标
    pub success: i64,
    /// 计划是否分步、现实、范围正确
    pub plan_quality: i64,
    /// 工具选择与使用是否合理
    pub reasoning_quality: i64,
    pub notes: String,
}

impl JudgeScore {
    /// 维度越界即失败；不钳制
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("success", self.success),
            ("plan_quality", self.plan_quality),
            ("reasoning_quality", self.reasoning_quality),
        ] {
            if !(0..=5).contains(&value) {
                return Err(format!("{} = {} out of range [0, 5]", name, value));
            }
        }
        Ok(())
    }
}

/// 严格解析评分 JSON：serde 拒绝非整数，validate 拒绝越界
fn parse_score(raw: &str) -> Result<JudgeScore, String> {
    let score: JudgeScore = serde_json::from_str(raw.trim()).map_err(|e| e.to_string())?;
    score.validate()?;
    Ok(score)
}

fn judge_score_schema_json() -> String {
    let schema = schema_for!(JudgeScore);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

/// Judge：持有 LLM，score(goal, plan, final_answer, trace) 返回 JudgeScore
pub struct QualityJudge {
    llm: Arc<dyn LlmClient>,
}

impl QualityJudge {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn score(
        &self,
        goal: &str,
        plan: &TaskPlan,
        final_answer: &str,
        trace: Option<&str>,
    ) -> Result<JudgeScore, AgentError> {
        let prompt = build_judge_prompt(goal, plan, final_answer, trace);
        let raw = self
            .llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(AgentError::LlmError)?;

        match parse_score(&raw) {
            Ok(score) => Ok(score),
            // 单次修复：以首次失败响应为上下文，要求仅输出 Schema JSON
            Err(first_err) => {
                tracing::warn!(error = %first_err, "judge output failed validation, repairing");
                let fix_prompt = format!(
                    "Return ONLY valid JSON for this schema. No markdown, no prose.\n{}\n\n\
                     Original response:\n{}",
                    judge_score_schema_json(),
                    raw
                );
                let raw2 = self
                    .llm
                    .complete(&[Message::user(fix_prompt)])
                    .await
                    .map_err(AgentError::LlmError)?;
                parse_score(&raw2).map_err(|second_err| {
                    AgentError::JudgeFormat(format!(
                        "first attempt: {}; repair attempt: {}",
                        first_err, second_err
                    ))
                })
            }
        }
    }
}

fn build_judge_prompt(
    goal: &str,
    plan: &TaskPlan,
    final_answer: &str,
    trace: Option<&str>,
) -> String {
    let plan_json = serde_json::to_string_pretty(plan).unwrap_or_else(|_| "{}".to_string());

    let mut prompt = format!(
        "You are a strict evaluator for a multi-agent tool orchestration system.\n\
         Score from 0 to 5 (integers) for each category:\n\
         - success: does the final answer satisfy the goal?\n\
         - plan_quality: is the plan step-by-step, realistic, and correctly scoped?\n\
         - reasoning_quality: are the selected tools appropriate and used sensibly?\n\n\
         Return ONLY valid JSON that matches this schema exactly:\n{schema}\n\n\
         GOAL:\n{goal}\n\n\
         PLAN (JSON):\n{plan}\n\n\
         FINAL ANSWER:\n{answer}\n\n",
        schema = judge_score_schema_json(),
        goal = goal,
        plan = plan_json,
        answer = final_answer
    );

    if let Some(trace) = trace {
        let trace: String = trace.chars().take(MAX_TRACE_CHARS).collect();
        prompt.push_str(&format!("TRACE:\n{}\n", trace));
    }

    prompt
}
