use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{EmbeddingError, EmbeddingProvider};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpApi {
    Ollama,
    OpenAi,
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}


/// Remote embedding provider speaking either the Ollama or the
/// OpenAI-compatible embeddings API.
pub struct HttpEmbedder {
    api: HttpApi,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimension: Option<usize>,
    client: Client,
}

impl HttpEmbedder {

    pub fn new(
        api: HttpApi,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        dimension: Option<usize>,
        timeout_secs: u64,
    ) -> Result<Self, EmbeddingError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();

        if api == HttpApi::OpenAi && api_key.is_none() {
            return Err(EmbeddingError::InvalidResponse("API key required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        info!(
            "HttpEmbedder initialized: api={:?}, model={}, url={}",
            api, model, base_url
        );

        Ok(Self {
            api,
            base_url,
            model,
            api_key,
            dimension,
            client,
        })
    }


    pub fn ollama(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, EmbeddingError> {
        Self::new(HttpApi::Ollama, base_url, model, None, None, 30)
    }


    pub fn openai(
        base_url: Option<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, EmbeddingError> {
        Self::new(
            HttpApi::OpenAi,
            base_url.unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            model,
            Some(api_key.into()),
            None,
            30,
        )
    }

    pub fn api(&self) -> HttpApi {
        self.api
    }

    pub fn endpoint(&self) -> String {
        match self.api {
            HttpApi::Ollama => format!("{}/api/embeddings", self.base_url),
            HttpApi::OpenAi => format!("{}/embeddings", self.base_url),
        }
    }

    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        if response.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()));
        }
        Ok(response.embedding)
    }

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let request = OpenAiEmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAiEmbeddingResponse>()
            .await?;

        order_openai_data(response.data, texts.len())
    }
}

fn order_openai_data(
    mut data: Vec<OpenAiEmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }
        match self.api {
            HttpApi::Ollama => self.embed_ollama(text).await,
            HttpApi::OpenAi => {
                let mut vectors = self.embed_openai(&[text.to_string()]).await?;
                vectors
                    .pop()
                    .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
            }
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::EmptyText);
        }
        debug!("Embedding batch of {} texts via {:?}", texts.len(), self.api);
        match self.api {
            HttpApi::OpenAi => self.embed_openai(texts).await,
            HttpApi::Ollama => {
                let mut vectors = Vec::with_capacity(texts.len());
                for text in texts {
                    vectors.push(self.embed_ollama(text).await?);
                }
                Ok(vectors)
            }
        }
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        match self.api {
            HttpApi::Ollama => "ollama",
            HttpApi::OpenAi => "openai",
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
