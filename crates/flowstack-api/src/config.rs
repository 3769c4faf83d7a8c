use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub ollama: OllamaConfig,
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub engine: EngineSection,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub mongodb: MongoDbConfig,

    // Secret (from ENV only), read when the mongodb feature is active
    #[serde(default)]
    pub mongodb_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_embed_model")]
    pub default_embed_model: String,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            default_embed_model: default_embed_model(),
            default_top_k: default_top_k(),
        }
    }
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_embed_model() -> String {
    "mini".to_string()
}

fn default_top_k() -> usize {
    4
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoDbConfig {
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for MongoDbConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

fn default_database() -> String {
    "flowstack".to_string()
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (SERVER_, OLLAMA_, KNOWLEDGE_, ENGINE_,
    ///    LOG_, MONGODB_ prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::default()
                    .prefix("SERVER")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("OLLAMA")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("KNOWLEDGE")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("ENGINE")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("LOG")
                    .separator("_")
                    .try_parsing(true),
            )
            .add_source(
                Environment::default()
                    .prefix("MONGODB")
                    .separator("_")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let mut cfg: Config = config.try_deserialize()?;

        // Secret stays out of TOML files
        if let Ok(uri) = std::env::var("MONGODB_URI") {
            cfg.mongodb_uri = uri;
        }

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));
        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 8001

            [cors]
            enabled = true
            origins = ["http://localhost:3000"]

            [ollama]
            base_url = "http://localhost:11434"

            [knowledge]
            base_url = "http://localhost:8010"

            [engine]
            default_model = "llama3"
            default_embed_model = "mpnet"
            default_top_k = 6

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.engine.default_embed_model, "mpnet");
        assert_eq!(config.mongodb.database, "flowstack");
    }

    #[test]
    fn engine_section_is_optional() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 8001

            [cors]
            enabled = false
            origins = []

            [ollama]
            base_url = "http://localhost:11434"

            [knowledge]
            base_url = "http://localhost:8010"

            [logging]
            level = "info"
            format = "pretty"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.engine.default_model, "llama3");
        assert_eq!(config.engine.default_top_k, 4);
    }
}
