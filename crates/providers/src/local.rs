//! Self-hosted OpenAI-compatible provider (§4.1 vendor set), e.g. Ollama or
//! vLLM behind `local_provider_base_url`. Reuses the OpenAI wire format.

pub use crate::openai::OpenAiProvider as LocalProvider;
