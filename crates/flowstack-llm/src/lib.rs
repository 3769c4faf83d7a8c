pub mod ollama;
pub mod streaming;
pub mod traits;

pub use ollama::OllamaClient;
pub use streaming::{parse_generate_stream, parse_pull_stream, GenerationEvent};
pub use traits::{GenerateOptions, GenerateRequest, GenerativeClient, GenerationStream};
