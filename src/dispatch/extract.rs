//! 工具参数抽取器
//!
//! 每个工具族一个 ArgumentExtractor（搜索 / 天气 / GitHub 各操作 / 通用仓库类 / 空参数兜底），
//! 由 ExtractorRegistry 按注册顺序匹配工具名选择；新增工具只需注册抽取器，不改调度代码。
//! 参数一律从原始用户目标文本抽取，而非计划内容。

use regex::Regex;
use serde_json::{json, Value};

use crate::dispatch::ToolResults;

/// 城市抽取全部失配时的默认城市
pub const DEFAULT_CITY: &str = "New York";

/// owner/repo 抽取失配时的固定兜底仓库
const DEFAULT_OWNER: &str = "deepmehta27";
const DEFAULT_REPO: &str = "mcp-navigator-test";

/// 城市缩写表：候选命中时直接替换为全名
const CITY_ABBREVIATIONS: [(&str, &str); 3] = [
    ("nyc", "New York"),
    ("sf", "San Francisco"),
    ("la", "Los Angeles"),
];

/// 参数抽取器：matches 判断是否负责该工具名，extract 从目标文本（与已收集结果）导出参数
pub trait ArgumentExtractor: Send + Sync {
    fn matches(&self, tool_name: &str) -> bool;

    /// collected 为本轮已执行工具的结果（create_issue 用其拼 issue body）
    fn extract(&self, tool_name: &str, goal: &str, collected: &ToolResults) -> Value;
}

/// 抽取器注册表：按注册顺序匹配；末位的空参数兜底保证 resolve 总能命中
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn ArgumentExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    pub fn register(&mut self, extractor: impl ArgumentExtractor + 'static) {
        self.extractors.push(Box::new(extractor));
    }

    /// 标准抽取器集合：精确名优先，通用仓库类次之，空参数兜底
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(TavilySearchExtractor);
        registry.register(WeatherExtractor::new());
        registry.register(CreateIssueExtractor::new());
        registry.register(ListIssuesExtractor::new());
        registry.register(GetFileContentsExtractor::new());
        registry.register(CreateOrUpdateFileExtractor::new());
        registry.register(GenericRepoExtractor::new());
        registry.register(EmptyArgsExtractor);
        registry
    }

    pub fn resolve(&self, tool_name: &str) -> &dyn ArgumentExtractor {
        self.extractors
            .iter()
            .find(|e| e.matches(tool_name))
            .map(|e| e.as_ref())
            // EmptyArgsExtractor 匹配一切；未注册时仍需兜底
            .unwrap_or(&EmptyArgsExtractor)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------- 共享抽取辅助 ----------

/// `owner/repo` 形状匹配（in/for [from] repo xxx/yyy），失配时返回固定兜底仓库
fn extract_owner_repo(goal: &str, with_from: bool) -> (String, String) {
    let pattern = if with_from {
        r"(?:in|for|from)\s+(?:repo\s+)?([a-zA-Z0-9_-]+/[a-zA-Z0-9_-]+)"
    } else {
        r"(?:in|for)\s+(?:repo\s+)?([a-zA-Z0-9_-]+/[a-zA-Z0-9_-]+)"
    };
    let re = Regex::new(pattern).unwrap();
    match re.captures(goal).and_then(|c| c.get(1)) {
        Some(m) => {
            let full = m.as_str();
            let (owner, repo) = full.split_once('/').unwrap_or((DEFAULT_OWNER, DEFAULT_REPO));
            (owner.to_string(), repo.to_string())
        }
        None => (DEFAULT_OWNER.to_string(), DEFAULT_REPO.to_string()),
    }
}

/// 文件路径抽取（"file xxx" / "path xxx"），失配时返回默认值
fn extract_file_path(goal: &str, default: &str) -> String {
    let re = Regex::new(r"(?:file|path)\s+(\S+)").unwrap();
    re.captures(goal)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| default.to_string())
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 候选城市名先过缩写表（"nyc" → "New York"），否则 title case
fn normalize_city(candidate: &str) -> String {
    let lower = candidate.trim().to_lowercase();
    for (abbr, full) in CITY_ABBREVIATIONS {
        if lower == abbr {
            return full.to_string();
        }
    }
    title_case(&lower)
}

/// 从自然语言目标中抽取城市名，按优先级依次尝试：
/// 1. "in/for X"（后接 weather / 句尾 / 标点）
/// 2. "X weather"
/// 3. 原文中首个大写开头单词（后词也大写则合并）
/// 4. 缩写表子串（nyc / sf / la）
/// 5. 默认城市
pub fn extract_city(text: &str) -> String {
    let text_lower = text.to_lowercase();

    let re_in_for =
        Regex::new(r"\b(?:in|for)\s+([a-z]+(?:\s+[a-z]+)*?)(?:\s+weather|$|\?|,)").unwrap();
    if let Some(c) = re_in_for.captures(&text_lower).and_then(|c| c.get(1)) {
        return normalize_city(c.as_str());
    }

    let re_city_weather = Regex::new(r"\b([a-z]+(?:\s+[a-z]+)?)\s+weather").unwrap();
    if let Some(c) = re_city_weather.captures(&text_lower).and_then(|c| c.get(1)) {
        return normalize_city(c.as_str());
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let starts_upper = word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
        if starts_upper && word.len() > 2 {
            if let Some(next) = words.get(i + 1) {
                if next.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
                    return format!("{} {}", word, next);
                }
            }
            return word.to_string();
        }
    }

    for (abbr, full) in CITY_ABBREVIATIONS {
        if text_lower.contains(abbr) {
            return full.to_string();
        }
    }

    DEFAULT_CITY.to_string()
}

// ---------- 各工具族抽取器 ----------

/// 搜索类：原始目标文本直接作为 query
pub struct TavilySearchExtractor;

impl ArgumentExtractor for TavilySearchExtractor {
    fn matches(&self, tool_name: &str) -> bool {
        tool_name == "tavily_search"
    }

    fn extract(&self, _tool_name: &str, goal: &str, _collected: &ToolResults) -> Value {
        json!({ "query": goal, "max_results": 10 })
    }
}

/// 天气类：从目标中抽取城市名
pub struct WeatherExtractor;

impl WeatherExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeatherExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentExtractor for WeatherExtractor {
    fn matches(&self, tool_name: &str) -> bool {
        tool_name == "get_weather"
    }

    fn extract(&self, _tool_name: &str, goal: &str, _collected: &ToolResults) -> Value {
        let city = extract_city(goal);
        tracing::info!(city = %city, "weather argument extracted");
        json!({ "city": city })
    }
}

/// create_issue：owner/repo + 标题（引号 > 关键词 > 去样板文本）+ 由已收集结果拼 body
pub struct CreateIssueExtractor {
    re_quoted: Regex,
    re_keyword: Regex,
    re_boilerplate: Regex,
    re_repo_suffix: Regex,
    re_leading_connector: Regex,
}

impl CreateIssueExtractor {
    pub fn new() -> Self {
        Self {
            re_quoted: Regex::new(r#"["']([^"']+)["']"#).unwrap(),
            re_keyword: Regex::new(
                r#"(?i)(?:issue|titled|called|named)\s+["']?([^"']+?)["']?(?:\s+(?:in|for|repo)|$)"#,
            )
            .unwrap(),
            re_boilerplate: Regex::new(
                r"(?i)create\s+(?:a\s+)?(?:github\s+)?issue\s+(?:about|for|on|titled)?\s*",
            )
            .unwrap(),
            re_repo_suffix: Regex::new(
                r"\s*(?:and\s+)?(?:in|for)\s+repo\s+[a-zA-Z0-9_-]+/[a-zA-Z0-9_-]+",
            )
            .unwrap(),
            re_leading_connector: Regex::new(r"(?i)^\s*(?:and|then)\s+").unwrap(),
        }
    }

    /// 标题优先级：引号内文本 > issue/titled/called/named 关键词之后 > 去除样板短语的目标文本
    fn extract_title(&self, goal: &str) -> String {
        if let Some(c) = self.re_quoted.captures(goal).and_then(|c| c.get(1)) {
            return c.as_str().to_string();
        }

        if let Some(c) = self.re_keyword.captures(goal).and_then(|c| c.get(1)) {
            return c.as_str().trim().to_string();
        }

        let title = self.re_boilerplate.replace(goal, "");
        let title = self.re_repo_suffix.replace(&title, "");
        let title = self.re_leading_connector.replace(title.trim(), "");
        title.trim().to_string()
    }

    /// issue body：汇总此前所有工具结果；无结果时附上原始请求
    fn build_body(&self, goal: &str, collected: &ToolResults) -> String {
        if collected.is_empty() {
            return format!("**Issue created via Navigator**\n\n**Request:** {}", goal);
        }

        let mut body = String::from("## Automated Issue Summary\n\n");
        body.push_str(&format!("**Generated from:** {}\n\n---\n\n", goal));
        for (tool, result) in collected.iter() {
            if tool == "create_issue" {
                continue;
            }
            let result = if result.chars().count() > 2000 {
                format!(
                    "{}\n\n... (truncated)",
                    result.chars().take(2000).collect::<String>()
                )
            } else {
                result.to_string()
            };
            body.push_str(&format!("### Results from `{}`\n\n```\n{}\n```\n\n", tool, result));
        }
        body
    }
}

impl Default for CreateIssueExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentExtractor for CreateIssueExtractor {
    fn matches(&self, tool_name: &str) -> bool {
        tool_name == "create_issue"
    }

    fn extract(&self, _tool_name: &str, goal: &str, collected: &ToolResults) -> Value {
        let (owner, repo) = extract_owner_repo(goal, false);
        let title = self.extract_title(goal);
        let title = if title.is_empty() { goal.to_string() } else { title };
        tracing::info!(owner = %owner, repo = %repo, title = %title, "create_issue arguments");
        json!({
            "owner": owner,
            "repo": repo,
            "title": title,
            "body": self.build_body(goal, collected),
        })
    }
}

/// list_issues：owner/repo，每页 100 条、全部状态
pub struct ListIssuesExtractor;

impl ListIssuesExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ListIssuesExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentExtractor for ListIssuesExtractor {
    fn matches(&self, tool_name: &str) -> bool {
        tool_name == "list_issues"
    }

    fn extract(&self, _tool_name: &str, goal: &str, _collected: &ToolResults) -> Value {
        let (owner, repo) = extract_owner_repo(goal, true);
        json!({ "owner": owner, "repo": repo, "perPage": 100, "state": "all" })
    }
}

/// get_file_contents：owner/repo + 文件路径（默认 README.md）
pub struct GetFileContentsExtractor;

impl GetFileContentsExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GetFileContentsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentExtractor for GetFileContentsExtractor {
    fn matches(&self, tool_name: &str) -> bool {
        tool_name == "get_file_contents"
    }

    fn extract(&self, _tool_name: &str, goal: &str, _collected: &ToolResults) -> Value {
        let (owner, repo) = extract_owner_repo(goal, true);
        let path = extract_file_path(goal, "README.md");
        json!({ "owner": owner, "repo": repo, "path": path })
    }
}

/// create_or_update_file：owner/repo + 文件路径（默认 test.txt）+ 固定提交信息
pub struct CreateOrUpdateFileExtractor;

impl CreateOrUpdateFileExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CreateOrUpdateFileExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentExtractor for CreateOrUpdateFileExtractor {
    fn matches(&self, tool_name: &str) -> bool {
        tool_name == "create_or_update_file"
    }

    fn extract(&self, _tool_name: &str, goal: &str, _collected: &ToolResults) -> Value {
        let (owner, repo) = extract_owner_repo(goal, false);
        let path = extract_file_path(goal, "test.txt");
        json!({
            "owner": owner,
            "repo": repo,
            "path": path,
            "content": format!("Updated via Navigator: {}", goal),
            "message": "Update from Navigator",
        })
    }
}

/// 通用仓库类兜底：create_/list_/get_/update_/search_ 前缀且名称含 issue/repo/pull/branch 的
/// 未注册工具，尽力抽取 owner/repo，抽不到则空参数
pub struct GenericRepoExtractor {
    re_repo: Regex,
}

impl GenericRepoExtractor {
    pub fn new() -> Self {
        Self {
            re_repo: Regex::new(r"(?:in|for|from)\s+(?:repo\s+)?([a-zA-Z0-9_-]+/[a-zA-Z0-9_-]+)")
                .unwrap(),
        }
    }
}

impl Default for GenericRepoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentExtractor for GenericRepoExtractor {
    fn matches(&self, tool_name: &str) -> bool {
        let prefixed = ["create_", "list_", "get_", "update_", "search_"]
            .iter()
            .any(|p| tool_name.starts_with(p));
        let repo_scoped = ["issue", "repo", "pull", "branch"]
            .iter()
            .any(|s| tool_name.contains(s));
        prefixed && repo_scoped
    }

    fn extract(&self, _tool_name: &str, goal: &str, _collected: &ToolResults) -> Value {
        match self.re_repo.captures(goal).and_then(|c| c.get(1)) {
            Some(m) => {
                let (owner, repo) = m
                    .as_str()
                    .split_once('/')
                    .unwrap_or((DEFAULT_OWNER, DEFAULT_REPO));
                json!({ "owner": owner, "repo": repo })
            }
            None => json!({}),
        }
    }
}

/// 空参数兜底：匹配一切未被识别的工具
pub struct EmptyArgsExtractor;

impl ArgumentExtractor for EmptyArgsExtractor {
    fn matches(&self, _tool_name: &str) -> bool {
        true
    }

    fn extract(&self, _tool_name: &str, _goal: &str, _collected: &ToolResults) -> Value {
        json!({})
    }
}
