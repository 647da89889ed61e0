//! OpenAI-compatible chat completions client with structured output.

use super::{LanguageModel, OutputSchema, Prompt};
use crate::config::ModelConfig;
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const NAME: &str = "language model";

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Language model reached through `/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiModel {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` without an API key.
    pub fn from_config(config: &ModelConfig, timeout: Duration) -> Result<Self, CollaboratorError> {
        let api_key = config.api_key.clone().ok_or(CollaboratorError::Unavailable {
            collaborator: NAME,
            reason: "PROVIDER_API_KEY is not set".to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CollaboratorError::request(NAME, err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    fn request_body(&self, prompt: &Prompt, schema: &OutputSchema) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": true,
                },
            },
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn generate(&self, prompt: &Prompt, schema: &OutputSchema) -> Result<Value, CollaboratorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, schema))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| CollaboratorError::request(NAME, err.to_string()))?;

        let completion: Completion = response
            .json()
            .await
            .map_err(|err| CollaboratorError::invalid(NAME, err.to_string()))?;
        debug!(schema = %schema.name, "Completion received");
        parse_content(completion)
    }
}

fn parse_content(completion: Completion) -> Result<Value, CollaboratorError> {
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CollaboratorError::invalid(NAME, "empty completion"))?;
    serde_json::from_str(&content).map_err(|err| CollaboratorError::invalid(NAME, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAiModel {
        let config = ModelConfig {
            api_key: Some("key".to_string()),
            base_url: "http://localhost:8000/v1/".to_string(),
            model: "m".to_string(),
        };
        OpenAiModel::from_config(&config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url_is_normalized() {
        assert_eq!(model().base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn test_request_body_carries_schema() {
        let schema = OutputSchema {
            name: "section".to_string(),
            schema: json!({"type": "object"}),
        };
        let prompt = Prompt {
            system: "sys".to_string(),
            user: "user".to_string(),
        };
        let body = model().request_body(&prompt, &schema);
        assert_eq!(body["response_format"]["json_schema"]["name"], "section");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[test]
    fn test_parse_content() {
        let completion: Completion = serde_json::from_value(json!({
            "choices": [{"message": {"content": "{\"analysis\": \"ok\"}"}}]
        }))
        .unwrap();
        assert_eq!(parse_content(completion).unwrap()["analysis"], "ok");

        let empty: Completion = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(parse_content(empty).is_err());
    }
}
