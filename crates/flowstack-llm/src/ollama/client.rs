// Ollama-specific client implementation (HTTP direct, no SDK)

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;

use crate::streaming::{parse_generate_stream, parse_pull_stream, GenerationEvent};
use crate::traits::{GenerateRequest, GenerationStream, GenerativeClient};

const OLLAMA_API_BASE: &str = "http://localhost:11434";

/// Streaming client for a local or remote Ollama server.
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.into();
        let base_url = if base_url.is_empty() {
            OLLAMA_API_BASE.to_string()
        } else {
            base_url.trim_end_matches('/').to_string()
        };

        Ok(Self { http_client, base_url })
    }

    /// Names of models already installed on the server.
    pub async fn installed_models(&self) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .context("Failed to list models")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error ({}): {}", status, error_text);
        }

        let tags: TagsResponse = response.json().await.context("Failed to parse model list")?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn start_pull(&self, model: &str) -> Result<reqwest::Response> {
        let payload = serde_json::json!({ "name": model, "stream": true });

        let response = self
            .http_client
            .post(format!("{}/api/pull", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to start model pull")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error ({}): {}", status, error_text);
        }

        Ok(response)
    }

    async fn start_generate(&self, request: &GenerateRequest) -> Result<reqwest::Response> {
        let mut payload = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": true,
        });

        let obj = payload.as_object_mut().expect("payload is an object");
        if let Some(temp) = request.options.temperature {
            obj.insert("options".to_string(), serde_json::json!({ "temperature": temp }));
        }

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send generate request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error ({}): {}", status, error_text);
        }

        Ok(response)
    }
}

#[async_trait]
impl GenerativeClient for OllamaClient {
    /// Stream a generation, pulling the model first when it is missing.
    ///
    /// Pull progress is relayed as `Status` increments ahead of the first
    /// token. A failing tags call is not fatal here; the generate call will
    /// surface the real error.
    async fn generate_stream(&self, request: GenerateRequest) -> Result<GenerationStream> {
        let client = Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
        };

        Ok(Box::pin(async_stream::stream! {
            match client.installed_models().await {
                Ok(models) if !models.iter().any(|m| m == &request.model) => {
                    match client.start_pull(&request.model).await {
                        Ok(response) => {
                            let mut pull = parse_pull_stream(response.bytes_stream());
                            while let Some(event) = pull.next().await {
                                match event {
                                    Ok(GenerationEvent::Status { message }) => {
                                        yield Ok(GenerationEvent::Status {
                                            message: format!("Pulling {}: {}", request.model, message),
                                        });
                                    }
                                    Ok(other) => yield Ok(other),
                                    Err(e) => {
                                        yield Err(e);
                                        return;
                                    }
                                }
                            }
                            yield Ok(GenerationEvent::Status {
                                message: format!("Model {} ready", request.model),
                            });
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("model listing failed, generating anyway: {}", e);
                }
            }

            let response = match client.start_generate(&request).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut tokens = parse_generate_stream(response.bytes_stream());
            while let Some(event) = tokens.next().await {
                yield event;
            }
        }))
    }
}
