//! 计划层：TaskPlan 结构、计划生成、校验（硬门禁）与答案合成

pub mod generator;
pub mod schema;
pub mod synthesizer;
pub mod validator;

pub use generator::PlanGenerator;
pub use schema::{ExecutionResult, PlanStep, RunOutputs, TaskPlan};
pub use synthesizer::AnswerSynthesizer;
pub use validator::{parse_plan, sanitize_plan_text, validate_tools};
