//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `NAVIGATOR__*` 覆盖（双下划线表示嵌套，
//! 如 `NAVIGATOR__LLM__PROVIDER=openai`）。API Key 不放在配置文件中，
//! 统一走环境变量（OPENAI_API_KEY / DEEPSEEK_API_KEY / TAVILY_API_KEY / GITHUB_TOKEN）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub metrics: MetricsSection,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub deepseek: LlmDeepSeekSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

// 整段缺省时由 Default 填充，须与 serde 的逐字段 default_* 保持一致
impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

/// [tools] 段：工具超时与各 Provider 端点
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub weather: WeatherSection,
    #[serde(default)]
    pub tavily: TavilySection,
    #[serde(default)]
    pub github: GithubSection,
}

fn default_tool_timeout_secs() -> u64 {
    30
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            weather: WeatherSection::default(),
            tavily: TavilySection::default(),
            github: GithubSection::default(),
        }
    }
}

/// [tools.weather] 段：open-meteo 地理编码与天气端点
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSection {
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_geocode_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            geocode_url: default_geocode_url(),
            forecast_url: default_forecast_url(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// [tools.tavily] 段：搜索端点与返回条数
#[derive(Debug, Clone, Deserialize)]
pub struct TavilySection {
    #[serde(default = "default_tavily_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_tavily_max_results")]
    pub max_results: u32,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tavily_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_tavily_max_results() -> u32 {
    10
}

impl Default for TavilySection {
    fn default() -> Self {
        Self {
            endpoint: default_tavily_endpoint(),
            max_results: default_tavily_max_results(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// [tools.github] 段：REST API Base（可指向企业版实例）
#[derive(Debug, Clone, Deserialize)]
pub struct GithubSection {
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// [metrics] 段：JSONL 存储路径
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    #[serde(default = "default_metrics_path")]
    pub storage_path: PathBuf,
}

fn default_metrics_path() -> PathBuf {
    PathBuf::from("data/metrics.jsonl")
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            storage_path: default_metrics_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmSection::default(),
            tools: ToolsSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 NAVIGATOR__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 NAVIGATOR__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("NAVIGATOR")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
