//! Knowledge store contract for pipeline execution.
//!
//! The store itself (embedding, indexing, ingestion) lives outside this
//! system; the engine only searches and clears per-pipeline collections
//! through the [`KnowledgeStore`] trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One retrieved context fragment with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
    pub score: f32,
}

impl Snippet {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self { text: text.into(), score }
    }
}

/// Knobs for one search call, taken from the knowledge_base node's config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    pub embed_model: String,
    pub top_k: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            embed_model: "mini".to_string(),
            top_k: 4,
        }
    }
}

/// Read contract against the external knowledge store, scoped per pipeline.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Return the top snippets for a query, best match first.
    async fn search(
        &self,
        pipeline_id: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Snippet>>;

    /// Drop the pipeline's collection contents.
    async fn clear(&self, pipeline_id: &str) -> Result<()>;
}

/// HTTP client against a retrieval sidecar exposing search/clear endpoints.
pub struct HttpKnowledgeStore {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    pipeline_id: &'a str,
    query: &'a str,
    embed_model: &'a str,
    top_k: usize,
}

impl HttpKnowledgeStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl KnowledgeStore for HttpKnowledgeStore {
    async fn search(
        &self,
        pipeline_id: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<Snippet>> {
        let payload = SearchRequest {
            pipeline_id,
            query,
            embed_model: &options.embed_model,
            top_k: options.top_k,
        };

        let response = self
            .http_client
            .post(format!("{}/search", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to reach knowledge store")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Knowledge store error ({}): {}", status, error_text);
        }

        let snippets: Vec<Snippet> = response
            .json()
            .await
            .context("Failed to parse search results")?;
        Ok(snippets)
    }

    async fn clear(&self, pipeline_id: &str) -> Result<()> {
        let response = self
            .http_client
            .post(format!("{}/clear/{}", self.base_url, pipeline_id))
            .send()
            .await
            .context("Failed to reach knowledge store")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Knowledge store error ({}): {}", status, error_text);
        }

        tracing::info!("cleared knowledge base for pipeline {}", pipeline_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_options_default_to_original_backend_values() {
        let options = SearchOptions::default();
        assert_eq!(options.embed_model, "mini");
        assert_eq!(options.top_k, 4);
    }

    #[test]
    fn snippet_wire_shape() {
        let snippet: Snippet =
            serde_json::from_str(r#"{"text":"widgets are devices","score":0.87}"#).unwrap();
        assert_eq!(snippet, Snippet::new("widgets are devices", 0.87));
    }
}
