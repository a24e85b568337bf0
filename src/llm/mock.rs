//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 可预置响应队列：complete 依次弹出预置响应，便于脚本化驱动
//! 计划 → 合成 → 评分 的多次 LLM 调用；队列为空时回显最后一条 User 消息。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

/// Mock 客户端：按队列返回预置响应，队列耗尽后回显用户输入
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一组响应，按调用顺序弹出
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            return Ok(next);
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("Echo from Mock: {}", last_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let mock = MockLlmClient::with_responses(vec!["one".into(), "two".into()]);
        let msgs = vec![Message::user("hi")];
        assert_eq!(mock.complete(&msgs).await.unwrap(), "one");
        assert_eq!(mock.complete(&msgs).await.unwrap(), "two");
        // 队列耗尽后回显
        assert_eq!(mock.complete(&msgs).await.unwrap(), "Echo from Mock: hi");
    }
}
