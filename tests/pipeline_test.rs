//! 编排管线集成测试
//!
//! 用脚本化 Mock LLM 驱动 计划 → 校验 → 工具 → 合成 → 评分 → 指标 全链路，
//! 工具用计数桩替代，指标写入临时目录。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use navigator::config::AppConfig;
use navigator::core::{AgentError, Orchestrator};
use navigator::llm::{LlmClient, MockLlmClient, Message};
use navigator::tools::{Tool, ToolRegistry};

struct CountingTool {
    name: &'static str,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "counting stub"
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} result", self.name))
    }
}

/// 第 N 次调用返回错误，其余按队列返回（Mock LLM 无法脚本化失败时用）
struct FlakyLlm {
    responses: Mutex<Vec<String>>,
    call: AtomicUsize,
    fail_on: usize,
}

#[async_trait::async_trait]
impl LlmClient for FlakyLlm {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        let n = self.call.fetch_add(1, Ordering::SeqCst);
        if n == self.fail_on {
            return Err("synthetic LLM failure".to_string());
        }
        let mut queue = self.responses.lock().unwrap();
        if queue.is_empty() {
            Ok("{}".to_string())
        } else {
            Ok(queue.remove(0))
        }
    }
}

fn plan_json(tools_per_step: &[&[&str]]) -> String {
    let steps: Vec<serde_json::Value> = tools_per_step
        .iter()
        .enumerate()
        .map(|(i, tools)| {
            serde_json::json!({
                "step_id": (i + 1) as i64,
                "action": format!("step {}", i + 1),
                "tools": tools,
                "success_criteria": "done",
            })
        })
        .collect();
    serde_json::json!({
        "goal": "test goal",
        "assumptions": [],
        "steps": steps,
        "risks": [],
    })
    .to_string()
}

fn judge_json() -> String {
    r#"{"success": 5, "plan_quality": 4, "reasoning_quality": 4, "notes": "ok"}"#.to_string()
}

fn test_config(dir: &tempfile::TempDir) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.metrics.storage_path = dir.path().join("metrics.jsonl");
    cfg
}

fn registry_with(tools: Vec<CountingTool>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}

#[tokio::test]
async fn test_full_run_dedups_repeated_tools() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);

    let weather_calls = Arc::new(AtomicUsize::new(0));
    let search_calls = Arc::new(AtomicUsize::new(0));
    let registry = registry_with(vec![
        CountingTool {
            name: "get_weather",
            calls: weather_calls.clone(),
        },
        CountingTool {
            name: "tavily_search",
            calls: search_calls.clone(),
        },
    ]);

    // get_weather 出现在两步中，应只执行一次
    let llm = Arc::new(MockLlmClient::with_responses(vec![
        plan_json(&[&["get_weather", "tavily_search"], &["get_weather"]]),
        "Sunny in Tokyo, and here is the latest news.".to_string(),
        judge_json(),
    ]));

    let orchestrator = Orchestrator::new(llm, registry, &cfg);
    let result = orchestrator
        .run("weather in tokyo and latest news")
        .await
        .unwrap();

    assert!(result.completed);
    assert!(result.errors.is_empty());
    assert_eq!(result.final_answer, "Sunny in Tokyo, and here is the latest news.");
    assert_eq!(weather_calls.load(Ordering::SeqCst), 1);
    assert_eq!(search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.outputs.judge.success, 5);
    assert_eq!(
        result.outputs.plan.tools_used(),
        vec!["get_weather".to_string(), "tavily_search".to_string()]
    );

    // 指标恰好一条，字段与运行一致
    let content = std::fs::read_to_string(dir.path().join("metrics.jsonl")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(entry["goal"], "weather in tokyo and latest news");
    assert_eq!(entry["goal_type"], "weather");
    assert_eq!(entry["success_score"], 5);
    assert_eq!(entry["completed"], true);
}

#[tokio::test]
async fn test_unknown_tool_fails_whole_plan() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);

    let weather_calls = Arc::new(AtomicUsize::new(0));
    let registry = registry_with(vec![CountingTool {
        name: "get_weather",
        calls: weather_calls.clone(),
    }]);

    // 计划第二步引用未注册工具，第一步合法工具也不得执行
    let llm = Arc::new(MockLlmClient::with_responses(vec![plan_json(&[
        &["get_weather"],
        &["launch_rocket"],
    ])]));

    let orchestrator = Orchestrator::new(llm, registry, &cfg);
    let err = orchestrator.run("weather please").await.unwrap_err();

    match err {
        AgentError::PlanTool { tool, step_id, allowed } => {
            assert_eq!(tool, "launch_rocket");
            assert_eq!(step_id, 2);
            assert_eq!(allowed, vec!["get_weather".to_string()]);
        }
        other => panic!("expected PlanTool, got {:?}", other),
    }
    assert_eq!(weather_calls.load(Ordering::SeqCst), 0);
    // 失败运行不落盘
    assert!(!dir.path().join("metrics.jsonl").exists());
}

#[tokio::test]
async fn test_malformed_plan_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let registry = registry_with(vec![]);

    let llm = Arc::new(MockLlmClient::with_responses(vec![
        "I think the plan should be...".to_string(),
    ]));

    let orchestrator = Orchestrator::new(llm, registry, &cfg);
    let err = orchestrator.run("anything").await.unwrap_err();
    assert!(matches!(err, AgentError::PlanFormat { .. }));
    assert!(!dir.path().join("metrics.jsonl").exists());
}

#[tokio::test]
async fn test_judge_repair_succeeds_second_time() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let registry = registry_with(vec![]);

    // 评分首次返回散文，修复调用返回合法 JSON
    let llm = Arc::new(MockLlmClient::with_responses(vec![
        plan_json(&[&[]]),
        "Answer.".to_string(),
        "The run went great, I'd give it a 5!".to_string(),
        judge_json(),
    ]));

    let orchestrator = Orchestrator::new(llm, registry, &cfg);
    let result = orchestrator.run("no tools needed").await.unwrap();
    assert!(result.completed);
    assert_eq!(result.outputs.judge.plan_quality, 4);
}

#[tokio::test]
async fn test_judge_double_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let registry = registry_with(vec![]);

    let llm = Arc::new(MockLlmClient::with_responses(vec![
        plan_json(&[&[]]),
        "Answer.".to_string(),
        "not json".to_string(),
        "still not json".to_string(),
    ]));

    let orchestrator = Orchestrator::new(llm, registry, &cfg);
    let err = orchestrator.run("no tools needed").await.unwrap_err();
    assert!(matches!(err, AgentError::JudgeFormat(_)));
    assert!(!dir.path().join("metrics.jsonl").exists());
}

#[tokio::test]
async fn test_synthesis_failure_is_nonfatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let registry = registry_with(vec![]);

    // 调用序：0=计划，1=合成（失败），2=评分
    let llm = Arc::new(FlakyLlm {
        responses: Mutex::new(vec![plan_json(&[&[]]), judge_json()]),
        call: AtomicUsize::new(0),
        fail_on: 1,
    });

    let orchestrator = Orchestrator::new(llm, registry, &cfg);
    let result = orchestrator.run("flaky synthesis").await.unwrap();

    assert!(!result.completed);
    assert_eq!(result.errors.len(), 1);
    assert!(result.final_answer.starts_with("Execution failed:"));
    assert_eq!(result.outputs.judge.success, 5);

    // 失败的合成仍然记录指标，completed=false 且 errors 非空
    let content = std::fs::read_to_string(dir.path().join("metrics.jsonl")).unwrap();
    let entry: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(entry["completed"], false);
    assert_eq!(entry["errors"].as_array().unwrap().len(), 1);
}
