//! Provider implementations wrapping graniet/llm backends
//!
//! This module provides the bridge between the blocking [`Oracle`] interface and
//! the async graniet/llm library.

use crate::oracle::Oracle;
use crate::types::*;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use llm::LLMProvider;
use tokio::runtime::Runtime;

// ============================================================================
// Tokio Runtime for blocking calls
// ============================================================================

/// Get or create the tokio runtime used for oracle calls.
///
/// The populator also spawns its Ctrl-C watcher here, so a single runtime serves
/// the whole process.
pub fn runtime() -> Result<&'static Runtime, OracleError> {
    static RUNTIME: std::sync::OnceLock<Runtime> = std::sync::OnceLock::new();
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }
    let rt = Runtime::new().map_err(|e| OracleError::Unavailable {
        message: format!("failed to create tokio runtime: {e}"),
    })?;
    Ok(RUNTIME.get_or_init(|| rt))
}

// ============================================================================
// Provider Registry
// ============================================================================

/// Get information about all supported providers
pub fn get_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            id: "openai".to_string(),
            name: "OpenAI".to_string(),
            registration_url: Some("https://platform.openai.com/api-keys".to_string()),
            default_model: "o4-mini-2025-04-16".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        },
        ProviderInfo {
            id: "groq".to_string(),
            name: "Groq".to_string(),
            registration_url: Some("https://console.groq.com/keys".to_string()),
            default_model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
        },
        ProviderInfo {
            id: "mistral".to_string(),
            name: "Mistral AI".to_string(),
            registration_url: Some("https://console.mistral.ai/api-keys/".to_string()),
            default_model: "mistral-large-latest".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
        },
        ProviderInfo {
            id: "deepseek".to_string(),
            name: "DeepSeek".to_string(),
            registration_url: Some("https://platform.deepseek.com/api_keys".to_string()),
            default_model: "deepseek-chat".to_string(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
        },
        ProviderInfo {
            id: "xai".to_string(),
            name: "xAI (Grok)".to_string(),
            registration_url: Some("https://console.x.ai/".to_string()),
            default_model: "grok-beta".to_string(),
            api_key_env: "XAI_API_KEY".to_string(),
        },
    ]
}

/// Look up a provider by ID
pub fn get_provider(provider_id: &str) -> Option<ProviderInfo> {
    get_providers().into_iter().find(|p| p.id == provider_id)
}

/// Map our provider ID to llm backend
fn get_backend(provider: &str) -> Result<LLMBackend, OracleError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        "xai" => Ok(LLMBackend::XAI),
        _ => Err(OracleError::ProviderNotFound {
            provider: provider.to_string(),
        }),
    }
}

/// Sort a backend failure message into an [`OracleError`]
pub(crate) fn classify_failure(message: &str) -> OracleError {
    let err_str = message.to_lowercase();
    if err_str.contains("rate limit") || err_str.contains("429") {
        OracleError::RateLimited {
            retry_after_seconds: Some(60),
        }
    } else if err_str.contains("unauthorized")
        || err_str.contains("401")
        || err_str.contains("invalid api key")
        || err_str.contains("invalid_api_key")
    {
        OracleError::InvalidApiKey
    } else if err_str.contains("network")
        || err_str.contains("connection")
        || err_str.contains("timed out")
        || err_str.contains("timeout")
    {
        OracleError::Unavailable {
            message: message.to_string(),
        }
    } else if err_str.contains("context") && err_str.contains("length") {
        OracleError::ContextLengthExceeded {
            message: message.to_string(),
        }
    } else {
        OracleError::ApiError {
            message: message.to_string(),
        }
    }
}

// ============================================================================
// LLM-backed oracle
// ============================================================================

/// An oracle that sends each prompt as a single user message to an LLM provider
pub struct LlmOracle {
    settings: OracleSettings,
    llm: Box<dyn LLMProvider>,
}

impl std::fmt::Debug for LlmOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmOracle")
            .field("provider", &self.settings.provider)
            .field("model", &self.settings.model)
            .finish()
    }
}

impl LlmOracle {
    /// Build the provider client for these settings
    pub fn new(settings: OracleSettings) -> Result<Self, OracleError> {
        let backend = get_backend(&settings.provider)?;

        if settings.api_key.is_empty() {
            return Err(OracleError::InvalidApiKey);
        }

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .api_key(&settings.api_key)
            .model(&settings.model);

        if let Some(max_tokens) = settings.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(temp) = settings.temperature {
            builder = builder.temperature(temp);
        }
        if let Some(timeout) = settings.timeout_seconds {
            builder = builder.timeout_seconds(timeout);
        }

        let llm = builder
            .build()
            .map_err(|e: llm::error::LLMError| OracleError::InvalidRequest {
                message: e.to_string(),
            })?;

        Ok(Self { settings, llm })
    }

    /// The settings this oracle was built from
    pub fn settings(&self) -> &OracleSettings {
        &self.settings
    }

    async fn complete_async(&self, prompt: &str) -> Result<String, OracleError> {
        let messages = vec![ChatMessage::user().content(prompt).build()];

        let response = self
            .llm
            .chat(&messages)
            .await
            .map_err(|e: llm::error::LLMError| classify_failure(&e.to_string()))?;

        let content = response.text().unwrap_or_default();
        if let Some(usage) = response.usage() {
            tracing::trace!(
                model = %self.settings.model,
                tokens = usage.total_tokens,
                "oracle call finished"
            );
        }

        Ok(content)
    }
}

impl Oracle for LlmOracle {
    fn query(&self, prompt: &str) -> Result<String, OracleError> {
        runtime()?.block_on(self.complete_async(prompt))
    }
}

// ============================================================================
// Tests
// ============================================================================
