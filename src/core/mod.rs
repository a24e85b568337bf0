//! 核心层：统一错误类型与编排器

pub mod error;
pub mod orchestrator;

pub use error::AgentError;
pub use orchestrator::{build_tool_registry, create_llm_from_config, Orchestrator};
