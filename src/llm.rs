use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use tracing::debug;

/// API key that switches the client into offline mode with a canned reply.
pub const DUMMY_API_KEY: &str = "dummy-api-key";

/// Text-completion capability: one prompt in, one untyped text reply out.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            model,
            http: reqwest::Client::new(),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.api_key == DUMMY_API_KEY
    }

    pub async fn call_llm(&self, prompt: &str) -> Result<String> {
        if self.is_offline() {
            return Ok(offline_reply());
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0
        });

        debug!("Calling {} with a {} character prompt", self.model, prompt.len());

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Llm(format!("Failed to read LLM API response: {}", e)))?;

        if !status.is_success() {
            let message = response_json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            return Err(PipelineError::Llm(format!(
                "LLM API returned {}: {}",
                status, message
            )));
        }

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PipelineError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl CompletionModel for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.call_llm(prompt).await
    }
}

fn offline_reply() -> String {
    serde_json::json!({
        "pyspark": "df = spark.read.parquet('s3://test-bucket/sales/')\ndf = df.filter(df.price.isNotNull())\ndf.write.mode('overwrite').saveAsTable('stg_sales')",
        "sql": "SELECT * FROM sales WHERE price IS NOT NULL;",
        "dbt": "select * from {{ source('raw', 'sales') }} where price is not null",
        "explanation": "Offline mode: reads sales, drops rows with a null price and stores the result."
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;

    #[tokio::test]
    async fn test_offline_reply_normalizes() {
        let client = LlmClient::new(
            DUMMY_API_KEY.to_string(),
            "gpt-4".to_string(),
            "http://localhost".to_string(),
        );
        assert!(client.is_offline());
        let reply = client.complete("anything").await.unwrap();
        let artifact = normalize(&reply).unwrap();
        assert!(artifact.text("dbt").unwrap().contains("{{ source("));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_llm_error() {
        let client = LlmClient::new(
            "sk-test".to_string(),
            "gpt-4".to_string(),
            "http://127.0.0.1:1/v1".to_string(),
        );
        assert!(matches!(
            client.complete("x").await,
            Err(PipelineError::Llm(_))
        ));
    }
}
