//! 编排器：端到端单次运行
//!
//! goal → 计划生成 → 校验（硬门禁）→ 工具调度 → 答案合成 → Judge 评分 → 指标落盘。
//! 严格单线程协作式：每次 LLM 调用与工具调用处挂起、按计划顺序恢复，工具之间不并发。
//! 合成失败非致命（completed=false，仍评分并记录）；致命错误在写入任何指标前终止。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::dispatch::ToolDispatchEngine;
use crate::judge::QualityJudge;
use crate::llm::{create_deepseek_client, LlmClient, OpenAiClient};
use crate::metrics::{infer_goal_type, MetricEntry, MetricsStore};
use crate::plan::{
    parse_plan, validate_tools, AnswerSynthesizer, ExecutionResult, PlanGenerator, RunOutputs,
};
use crate::tools::{
    CreateIssueTool, CreateOrUpdateFileTool, GetFileContentsTool, GitHubClient, ListIssuesTool,
    TavilySearchTool, ToolExecutor, ToolRegistry, WeatherTool,
};

/// 根据配置与环境变量选择 LLM 后端（OpenAI 兼容 / DeepSeek / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek {
        let model = cfg
            .llm
            .deepseek
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        tracing::info!("Using DeepSeek LLM ({})", model);
        Arc::new(create_deepseek_client(Some(&model)))
    } else if use_openai {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        let base = cfg.llm.base_url.as_deref();
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(OpenAiClient::new(
            base,
            &model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(crate::llm::MockLlmClient::new())
    }
}

/// 注册全部内置工具：weather、tavily_search、GitHub 四件套
pub fn build_tool_registry(cfg: &AppConfig) -> ToolRegistry {
    let github = Arc::new(GitHubClient::new(&cfg.tools.github));

    let mut registry = ToolRegistry::new();
    registry.register(WeatherTool::new(&cfg.tools.weather));
    registry.register(TavilySearchTool::new(&cfg.tools.tavily));
    registry.register(CreateIssueTool::new(github.clone()));
    registry.register(ListIssuesTool::new(github.clone()));
    registry.register(GetFileContentsTool::new(github.clone()));
    registry.register(CreateOrUpdateFileTool::new(github));
    registry
}

/// 编排器：组合生成、校验、调度、合成、评分与指标存储，拥有单次运行的全部可变状态
pub struct Orchestrator {
    generator: PlanGenerator,
    synthesizer: AnswerSynthesizer,
    judge: QualityJudge,
    engine: ToolDispatchEngine,
    metrics: MetricsStore,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, registry: ToolRegistry, cfg: &AppConfig) -> Self {
        let executor = ToolExecutor::new(registry, cfg.tools.tool_timeout_secs);
        Self {
            generator: PlanGenerator::new(llm.clone()),
            synthesizer: AnswerSynthesizer::new(llm.clone()),
            judge: QualityJudge::new(llm),
            engine: ToolDispatchEngine::new(executor),
            metrics: MetricsStore::new(&cfg.metrics.storage_path),
        }
    }

    /// 当前工具白名单（已排序）
    pub fn tool_names(&self) -> Vec<String> {
        self.engine.tool_names()
    }

    /// 执行一轮完整编排
    pub async fn run(&self, user_goal: &str) -> Result<ExecutionResult, AgentError> {
        let start = Instant::now();
        let allowed_names = self.engine.tool_names();

        // 1. 生成计划（纯生成，不校验）
        let raw_plan = self.generator.generate(user_goal, &allowed_names).await?;

        // 2. 校验：围栏剥离 + 严格解析 + 工具白名单（任一越界工具即整轮失败）
        let plan = parse_plan(&raw_plan)?;
        let allowed: HashSet<String> = allowed_names.iter().cloned().collect();
        validate_tools(&plan, &allowed)?;
        tracing::info!(steps = plan.steps.len(), "plan validated, all tools known");

        // 3. 执行计划中的全部不同工具（参数取自原始目标文本）
        let tool_results = self.engine.execute_plan_tools(&plan, user_goal).await;
        tracing::info!(collected = tool_results.len(), "tool results collected");

        // 4. 研究阶段占位：直接使用工具结果
        let research = serde_json::json!({
            "query": user_goal,
            "findings": [],
            "notes": "Skipped - using tool results directly",
        })
        .to_string();

        // 5. 答案合成；失败非致命：标记文本 + completed=false，仍继续评分与记录
        let (final_answer, completed, errors) = match self
            .synthesizer
            .synthesize(user_goal, &plan, &tool_results)
            .await
        {
            Ok(answer) => (answer, true, Vec::new()),
            Err(e) => {
                tracing::warn!(error = %e, "answer synthesis failed");
                (format!("Execution failed: {}", e), false, vec![e.to_string()])
            }
        };

        // 6. Judge 评分（解析失败单次修复；二次失败致命，指标不落盘）
        let judge = self
            .judge
            .score(user_goal, &plan, &final_answer, None)
            .await?;
        tracing::info!(
            success = judge.success,
            plan_quality = judge.plan_quality,
            reasoning_quality = judge.reasoning_quality,
            "judge scores"
        );

        // 7. 指标落盘（追加一条 JSONL）
        let execution_time = start.elapsed().as_secs_f64();
        let entry = MetricEntry {
            timestamp: chrono::Local::now().to_rfc3339(),
            goal: user_goal.to_string(),
            goal_type: infer_goal_type(user_goal).to_string(),
            success_score: judge.success,
            plan_score: judge.plan_quality,
            reasoning_score: judge.reasoning_quality,
            execution_time_seconds: execution_time,
            completed,
            errors: errors.clone(),
            tools_used: plan.tools_used(),
        };
        self.metrics
            .log(&entry)
            .map_err(|e| AgentError::MetricsStore(e.to_string()))?;

        Ok(ExecutionResult {
            goal: user_goal.to_string(),
            completed,
            outputs: RunOutputs {
                plan,
                research,
                judge,
                tool_results: tool_results.to_value(),
                execution_time,
            },
            errors,
            final_answer,
        })
    }
}
