use crate::failure::{FailureKind, ProviderFailure};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4";

const PROVIDER: &str = "openai-chat";
const TEMPERATURE: f32 = 0.2;

/// The generation capability: one prompt in, one completed text out.
/// No streaming; failures are classified, never retried here.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_output_tokens: u32)
        -> Result<String, ProviderFailure>;
}

/// [`TextGenerator`] backed by the OpenAI `/v1/chat/completions` endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderFailure> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderFailure::new(
                PROVIDER,
                FailureKind::Fatal,
                "api key must not be empty",
            ));
        }

        let endpoint = endpoint(api_base, "chat/completions")?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ProviderFailure::new(PROVIDER, FailureKind::Fatal, error.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: DEFAULT_GENERATION_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn endpoint(api_base: &str, path: &str) -> Result<Url, ProviderFailure> {
    let joined = format!("{}/{}", api_base.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|error| {
        ProviderFailure::new(
            PROVIDER,
            FailureKind::Fatal,
            format!("invalid api base `{api_base}`: {error}"),
        )
    })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn completion_text(response: ChatResponse) -> Result<String, ProviderFailure> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| {
            ProviderFailure::new(PROVIDER, FailureKind::Fatal, "response held no completion")
        })
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, ProviderFailure> {
        debug!(model = %self.model, prompt_len = prompt.len(), "requesting completion");

        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: max_output_tokens,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|error| ProviderFailure::from_transport(PROVIDER, &error))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(ProviderFailure::from_status(PROVIDER, status, &detail));
        }

        let parsed: ChatResponse = response.json().await.map_err(|error| {
            ProviderFailure::new(
                PROVIDER,
                FailureKind::Fatal,
                format!("unreadable completion response: {error}"),
            )
        })?;

        completion_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::{completion_text, ChatResponse, OpenAiGenerator};
    use std::time::Duration;

    #[test]
    fn first_choice_is_returned() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"The answer is on page 2. [Page 2]"}}]}"#,
        )
        .expect("response should parse");

        let text = completion_text(parsed).expect("completion present");
        assert_eq!(text, "The answer is on page 2. [Page 2]");
    }

    #[test]
    fn missing_choices_are_rejected() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[]}"#).expect("response should parse");
        assert!(completion_text(parsed).is_err());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result =
            OpenAiGenerator::new("https://api.openai.com/v1", "", Duration::from_secs(5));
        assert!(result.is_err());
    }
}
