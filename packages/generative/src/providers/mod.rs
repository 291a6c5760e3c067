//! Provider trait and implementations.
//!
//! Currently backed by Gemini, which is the only mainstream API offering
//! both strict-schema structured output and search grounding. The trait
//! seam exists so the analysis engine and conditions fetcher can be tested
//! against scripted fakes.

pub mod gemini;

use haul_advisor_models::SourceRef;

use crate::ProviderError;

/// A search-augmented answer: narrative text plus cited sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedAnswer {
    /// The narrative answer.
    pub text: String,
    /// Web sources cited by the search grounding, possibly empty.
    pub sources: Vec<SourceRef>,
}

/// Trait for generative providers.
#[async_trait::async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Generates JSON constrained by `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::RateLimited`] on quota exhaustion,
    /// [`ProviderError::Malformed`] when the output violates the schema,
    /// and other variants for transport/provider failures.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Generates a search-grounded narrative answer with cited sources.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails; an answer with zero
    /// sources is valid (grounding found nothing to cite).
    async fn generate_grounded(&self, prompt: &str) -> Result<GroundedAnswer, ProviderError>;
}

/// Creates a generative provider from environment variables.
///
/// Reads `GEMINI_API_KEY` (required) and `HAUL_AI_MODEL` (optional model
/// override).
///
/// # Errors
///
/// Returns [`ProviderError::Config`] if `GEMINI_API_KEY` is not set.
pub fn create_provider_from_env() -> Result<Box<dyn GenerativeProvider>, ProviderError> {
    let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| ProviderError::Config {
        message: "GEMINI_API_KEY environment variable not set".to_string(),
    })?;
    let model =
        std::env::var("HAUL_AI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
    log::info!("Using Gemini model {model}");
    Ok(Box::new(gemini::GeminiProvider::new(api_key, model)))
}
