//! Tavily 搜索工具
//!
//! POST https://api.tavily.com/search，参数 {"query", "max_results"}；
//! API Key 来自环境变量 TAVILY_API_KEY。返回响应 JSON 文本（上层调度引擎负责截断）。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::TavilySection;
use crate::tools::Tool;

/// Tavily 搜索：query → 搜索结果 JSON 文本
pub struct TavilySearchTool {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    default_max_results: u32,
}

impl TavilySearchTool {
    pub fn new(cfg: &TavilySection) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key: std::env::var("TAVILY_API_KEY").ok(),
            default_max_results: cfg.max_results,
        }
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        "tavily_search"
    }

    fn description(&self) -> &str {
        "Web search via Tavily. Args: {\"query\": \"...\", \"max_results\": 10}."
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("").trim();
        if query.is_empty() {
            return Err("Missing query".to_string());
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "TAVILY_API_KEY not set".to_string())?;
        let max_results = args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(self.default_max_results as u64);

        tracing::info!(query = %query, max_results, "tavily search");

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "api_key": api_key,
                "query": query,
                "max_results": max_results,
            }))
            .send()
            .await
            .map_err(|e| format!("Search request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| format!("Search response: {}", e))?;
        serde_json::to_string_pretty(&body).map_err(|e| e.to_string())
    }
}
