//! GitHub 工具族：create_issue / list_issues / get_file_contents / create_or_update_file
//!
//! 四个工具共享一个 GitHubClient（REST API + Token 认证）。Token 来自环境变量
//! GITHUB_TOKEN；create_or_update_file 按 contents API 要求对内容做 base64 编码。

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::GithubSection;
use crate::tools::Tool;

/// 共享 GitHub REST 客户端
pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(cfg: &GithubSection) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .user_agent("navigator-agent")
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            token: std::env::var("GITHUB_TOKEN").ok(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder, String> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| "GITHUB_TOKEN not set".to_string())?;
        Ok(self
            .client
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json"))
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<String, String> {
        let resp = builder
            .send()
            .await
            .map_err(|e| format!("GitHub request failed: {}", e))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| format!("GitHub response: {}", e))?;
        if !status.is_success() {
            return Err(format!("GitHub HTTP {}: {}", status, body));
        }
        Ok(body)
    }
}

/// 从参数中取 owner/repo（两者必填）
fn owner_repo(args: &Value) -> Result<(String, String), String> {
    let owner = args
        .get("owner")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing owner".to_string())?;
    let repo = args
        .get("repo")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing repo".to_string())?;
    Ok((owner.to_string(), repo.to_string()))
}

/// create_issue：POST /repos/{owner}/{repo}/issues
pub struct CreateIssueTool {
    github: Arc<GitHubClient>,
}

impl CreateIssueTool {
    pub fn new(github: Arc<GitHubClient>) -> Self {
        Self { github }
    }
}

#[async_trait]
impl Tool for CreateIssueTool {
    fn name(&self) -> &str {
        "create_issue"
    }

    fn description(&self) -> &str {
        "Create a GitHub issue. Args: {\"owner\", \"repo\", \"title\", \"body\"}."
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let (owner, repo) = owner_repo(&args)?;
        let title = args
            .get("title")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Missing title".to_string())?;
        let body = args.get("body").and_then(|v| v.as_str()).unwrap_or("");

        tracing::info!(owner = %owner, repo = %repo, title = %title, "creating issue");

        let builder = self
            .github
            .request(reqwest::Method::POST, &format!("/repos/{}/{}/issues", owner, repo))?
            .json(&json!({ "title": title, "body": body }));
        self.github.send(builder).await
    }
}

/// list_issues：GET /repos/{owner}/{repo}/issues
pub struct ListIssuesTool {
    github: Arc<GitHubClient>,
}

impl ListIssuesTool {
    pub fn new(github: Arc<GitHubClient>) -> Self {
        Self { github }
    }
}

#[async_trait]
impl Tool for ListIssuesTool {
    fn name(&self) -> &str {
        "list_issues"
    }

    fn description(&self) -> &str {
        "List GitHub issues. Args: {\"owner\", \"repo\", \"perPage\": 100, \"state\": \"all\"}."
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let (owner, repo) = owner_repo(&args)?;
        let per_page = args.get("perPage").and_then(|v| v.as_u64()).unwrap_or(100);
        let state = args.get("state").and_then(|v| v.as_str()).unwrap_or("all");

        let builder = self
            .github
            .request(reqwest::Method::GET, &format!("/repos/{}/{}/issues", owner, repo))?
            .query(&[("per_page", per_page.to_string()), ("state", state.to_string())]);
        self.github.send(builder).await
    }
}

/// get_file_contents：GET /repos/{owner}/{repo}/contents/{path}
pub struct GetFileContentsTool {
    github: Arc<GitHubClient>,
}

impl GetFileContentsTool {
    pub fn new(github: Arc<GitHubClient>) -> Self {
        Self { github }
    }
}

#[async_trait]
impl Tool for GetFileContentsTool {
    fn name(&self) -> &str {
        "get_file_contents"
    }

    fn description(&self) -> &str {
        "Read a file from a GitHub repo. Args: {\"owner\", \"repo\", \"path\": \"README.md\"}."
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let (owner, repo) = owner_repo(&args)?;
        let path = args
            .get("path")
            .and_then(|v| v.as_str())
            .unwrap_or("README.md");

        let builder = self.github.request(
            reqwest::Method::GET,
            &format!("/repos/{}/{}/contents/{}", owner, repo, path),
        )?;
        let body = self.github.send(builder).await?;

        // contents API 返回 base64 内容时解码为可读文本
        if let Ok(parsed) = serde_json::from_str::<Value>(&body) {
            if let Some(encoded) = parsed.get("content").and_then(|v| v.as_str()) {
                let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
                if let Ok(bytes) = BASE64.decode(cleaned) {
                    if let Ok(text) = String::from_utf8(bytes) {
                        return Ok(text);
                    }
                }
            }
        }
        Ok(body)
    }
}

/// create_or_update_file：PUT /repos/{owner}/{repo}/contents/{path}
pub struct CreateOrUpdateFileTool {
    github: Arc<GitHubClient>,
}

impl CreateOrUpdateFileTool {
    pub fn new(github: Arc<GitHubClient>) -> Self {
        Self { github }
    }
}

#[async_trait]
impl Tool for CreateOrUpdateFileTool {
    fn name(&self) -> &str {
        "create_or_update_file"
    }

    fn description(&self) -> &str {
        "Create or update a file in a GitHub repo. Args: {\"owner\", \"repo\", \"path\", \"content\", \"message\"}."
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let (owner, repo) = owner_repo(&args)?;
        let path = args.get("path").and_then(|v| v.as_str()).unwrap_or("test.txt");
        let content = args.get("content").and_then(|v| v.as_str()).unwrap_or("");
        let message = args
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Update from Navigator");

        let mut payload = json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
        });

        // 更新已有文件需要其当前 blob SHA
        if let Ok(builder) = self.github.request(
            reqwest::Method::GET,
            &format!("/repos/{}/{}/contents/{}", owner, repo, path),
        ) {
            if let Ok(existing) = self.github.send(builder).await {
                if let Ok(parsed) = serde_json::from_str::<Value>(&existing) {
                    if let Some(sha) = parsed.get("sha").and_then(|v| v.as_str()) {
                        payload["sha"] = Value::String(sha.to_string());
                    }
                }
            }
        }

        let builder = self
            .github
            .request(
                reqwest::Method::PUT,
                &format!("/repos/{}/{}/contents/{}", owner, repo, path),
            )?
            .json(&payload);
        self.github.send(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_repo_required() {
        assert!(owner_repo(&json!({"owner": "a", "repo": "b"})).is_ok());
        assert!(owner_repo(&json!({"owner": "a"})).is_err());
        assert!(owner_repo(&json!({"owner": "", "repo": "b"})).is_err());
    }
}
