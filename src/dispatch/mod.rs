//! 工具调度：参数抽取器注册表 + 按计划顺序的执行引擎

pub mod engine;
pub mod extract;

pub use engine::{ToolDispatchEngine, ToolResults, MAX_RESULT_CHARS};
pub use extract::{extract_city, ArgumentExtractor, ExtractorRegistry, DEFAULT_CITY};
