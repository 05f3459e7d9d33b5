//! Type definitions for the oracle interface
//!
//! An oracle is anything that answers a free-text prompt with free text.
//! These types describe how to reach an LLM provider and what can go wrong.

/// Settings for an LLM-backed oracle
#[derive(Debug, Clone)]
pub struct OracleSettings {
    /// Provider identifier (e.g., "openai", "groq", "mistral")
    pub provider: String,
    /// Model identifier (e.g., "o4-mini-2025-04-16")
    pub model: String,
    /// API key for the provider
    pub api_key: String,
    /// Maximum tokens to generate (optional)
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0.0-2.0, optional)
    pub temperature: Option<f32>,
    /// Request timeout in seconds (optional)
    pub timeout_seconds: Option<u64>,
}

impl OracleSettings {
    /// Settings for a provider using its default model
    pub fn for_provider(provider: &str, api_key: impl Into<String>) -> Result<Self, OracleError> {
        let info = crate::provider::get_providers()
            .into_iter()
            .find(|p| p.id == provider)
            .ok_or_else(|| OracleError::ProviderNotFound {
                provider: provider.to_string(),
            })?;

        Ok(Self {
            provider: info.id,
            model: info.default_model,
            api_key: api_key.into(),
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
        })
    }
}

/// Information about a supported provider
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// Unique identifier for the provider
    pub id: String,
    /// Display name
    pub name: String,
    /// URL to get API keys
    pub registration_url: Option<String>,
    /// Default model for this provider
    pub default_model: String,
    /// Environment variable conventionally holding the API key
    pub api_key_env: String,
}

/// Error types for oracle calls
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("Provider not found: {provider}")]
    ProviderNotFound { provider: String },

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limited: retry after {retry_after_seconds:?} seconds")]
    RateLimited { retry_after_seconds: Option<u32> },

    #[error("Oracle unavailable: {message}")]
    Unavailable { message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Context length exceeded: {message}")]
    ContextLengthExceeded { message: String },
}
