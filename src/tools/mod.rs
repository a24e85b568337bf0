//! 工具层：Tool trait、注册表、超时执行器与内置工具实现

pub mod executor;
pub mod github;
pub mod registry;
pub mod tavily;
pub mod weather;

pub use executor::ToolExecutor;
pub use github::{
    CreateIssueTool, CreateOrUpdateFileTool, GetFileContentsTool, GitHubClient, ListIssuesTool,
};
pub use registry::{Tool, ToolRegistry};
pub use tavily::TavilySearchTool;
pub use weather::WeatherTool;
