use crate::failure::{FailureKind, ProviderFailure};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

const PROVIDER: &str = "openai-embeddings";

/// The embedding capability. Each call is a remote request; failures are
/// classified, never retried here. Identical text asked twice is re-embedded:
/// caching across texts would risk serving stale vectors after a document
/// swap.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderFailure>;

    /// Batch form; the returned vectors preserve input order.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderFailure>;
}

/// [`TextEmbedder`] backed by the OpenAI `/v1/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
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

        let endpoint = endpoint(api_base, "embeddings")?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ProviderFailure::new(PROVIDER, FailureKind::Fatal, error.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
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
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn vectors_in_input_order(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, ProviderFailure> {
    if data.len() != expected {
        return Err(ProviderFailure::new(
            PROVIDER,
            FailureKind::Fatal,
            format!("expected {expected} embeddings, response held {}", data.len()),
        ));
    }

    data.sort_by_key(|item| item.index);
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl TextEmbedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderFailure> {
        let input = [text.to_string()];
        let vectors = self.embed_many(&input).await?;
        vectors.into_iter().next().ok_or_else(|| {
            ProviderFailure::new(PROVIDER, FailureKind::Fatal, "response held no embedding")
        })
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderFailure> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(batch_size = texts.len(), model = %self.model, "embedding batch");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
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

        let parsed: EmbeddingResponse = response.json().await.map_err(|error| {
            ProviderFailure::new(
                PROVIDER,
                FailureKind::Fatal,
                format!("unreadable embedding response: {error}"),
            )
        })?;

        vectors_in_input_order(parsed.data, texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::{vectors_in_input_order, EmbeddingResponse, OpenAiEmbedder};
    use std::time::Duration;

    #[test]
    fn response_vectors_are_reordered_to_input_order() {
        let parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[
                {"index":1,"embedding":[0.5,0.5]},
                {"index":0,"embedding":[1.0,0.0]}
            ]}"#,
        )
        .expect("response should parse");

        let vectors = vectors_in_input_order(parsed.data, 2).expect("count matches");
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert_eq!(vectors[1], vec![0.5, 0.5]);
    }

    #[test]
    fn short_response_is_rejected() {
        let parsed: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#)
                .expect("response should parse");

        assert!(vectors_in_input_order(parsed.data, 2).is_err());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = OpenAiEmbedder::new("https://api.openai.com/v1", "  ", Duration::from_secs(5));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_api_base_is_rejected() {
        let result = OpenAiEmbedder::new("not a url", "key", Duration::from_secs(5));
        assert!(result.is_err());
    }
}
