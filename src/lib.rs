//! Navigator - 目标驱动的工具编排系统
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与编排器（plan → validate → execute → synthesize → judge → record）
//! - **dispatch**: 工具调度引擎与参数抽取器注册表
//! - **judge**: LLM-as-judge 质量评分（0-5 三维度，解析失败时单次修复）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **metrics**: 运行指标持久化（JSONL 追加）与趋势统计
//! - **plan**: TaskPlan 结构、计划生成、校验与答案合成
//! - **tools**: 工具注册表（weather、tavily_search、GitHub 系列）与执行器

pub mod config;
pub mod core;
pub mod dispatch;
pub mod judge;
pub mod llm;
pub mod metrics;
pub mod observability;
pub mod plan;
pub mod tools;
