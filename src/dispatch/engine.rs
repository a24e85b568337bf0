//! 工具调度引擎
//!
//! 按计划顺序执行计划中出现的每个不同工具：步骤按序、步骤内工具按序；
//! 已执行过的工具名直接跳过（首次执行胜出，结果复用不刷新）。
//! 单个工具失败以错误标记文本记录、不中断兄弟工具；结果截断到 2000 字符。

use tracing::{info, warn};

use crate::dispatch::ExtractorRegistry;
use crate::plan::TaskPlan;
use crate::tools::ToolExecutor;

/// 单条工具结果保留的最大字符数，超出部分截断
pub const MAX_RESULT_CHARS: usize = 2000;

/// 工具结果有序映射：键为工具名，插入序 = 计划首遇序；每个工具至多一条
#[derive(Debug, Clone, Default)]
pub struct ToolResults {
    entries: Vec<(String, String)>,
}

impl ToolResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == tool_name)
    }

    /// 已存在的键不覆盖（首次执行胜出）
    pub fn insert(&mut self, tool_name: impl Into<String>, result: impl Into<String>) {
        let tool_name = tool_name.into();
        if !self.contains(&tool_name) {
            self.entries.push((tool_name, result.into()));
        }
    }

    pub fn get(&self, tool_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == tool_name)
            .map(|(_, result)| result.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 转为 JSON 对象（用于 ExecutionResult.outputs.tool_results）
    pub fn to_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, result) in &self.entries {
            map.insert(name.clone(), serde_json::Value::String(result.clone()));
        }
        serde_json::Value::Object(map)
    }
}

/// 调度引擎：持有工具执行器与参数抽取器注册表
pub struct ToolDispatchEngine {
    executor: ToolExecutor,
    extractors: ExtractorRegistry,
}

impl ToolDispatchEngine {
    pub fn new(executor: ToolExecutor) -> Self {
        Self {
            executor,
            extractors: ExtractorRegistry::standard(),
        }
    }

    pub fn with_extractors(executor: ToolExecutor, extractors: ExtractorRegistry) -> Self {
        Self { executor, extractors }
    }

    /// 当前注册的工具名（已排序），即计划校验的白名单
    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tool_names()
    }

    /// 执行计划中出现的全部不同工具，参数从原始目标文本抽取。
    /// 返回的映射每个工具名至多一条，键序为计划首遇序。
    pub async fn execute_plan_tools(&self, plan: &TaskPlan, user_goal: &str) -> ToolResults {
        let mut results = ToolResults::new();

        for step in &plan.steps {
            for tool_name in &step.tools {
                if results.contains(tool_name) {
                    continue; // 已执行，首次结果胜出
                }

                let args = self
                    .extractors
                    .resolve(tool_name)
                    .extract(tool_name, user_goal, &results);

                info!(tool = %tool_name, step_id = step.step_id, "executing plan tool");

                match self.executor.execute(tool_name, args).await {
                    Ok(result) => {
                        results.insert(tool_name.clone(), truncate_result(&result));
                    }
                    Err(e) => {
                        // 非致命：记录错误标记，兄弟工具继续执行
                        warn!(tool = %tool_name, error = %e, "plan tool failed");
                        results.insert(tool_name.clone(), format!("Error: {}", e));
                    }
                }
            }
        }

        results
    }
}

/// 超过 MAX_RESULT_CHARS 时按字符截断并追加标记
fn truncate_result(result: &str) -> String {
    if result.chars().count() > MAX_RESULT_CHARS {
        result.chars().take(MAX_RESULT_CHARS).collect::<String>() + "\n...[truncated]"
    } else {
        result.to_string()
    }
}
