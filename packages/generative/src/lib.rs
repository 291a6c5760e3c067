#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generative-analysis and grounded-search provider abstraction.
//!
//! Two distinct remote boundaries hide behind one trait:
//!
//! 1. **Structured generation**: a natural-language prompt plus a strict
//!    output schema, returning well-formed JSON or a classifiable failure.
//! 2. **Grounded search**: a search-augmented prompt returning free text
//!    plus cited web sources. The upstream API cannot combine search
//!    grounding with schema enforcement, so this boundary is narrative-only
//!    by construction.
//!
//! The concrete [`providers::gemini::GeminiProvider`] talks to the Gemini
//! `generateContent` endpoint; tests substitute scripted fakes through the
//! [`providers::GenerativeProvider`] trait.

pub mod providers;

use haul_advisor_resilience::RetryClass;
use thiserror::Error;

/// Errors from generative provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Quota exhausted; eligible for backoff-and-retry.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The provider returned output violating the requested schema.
    #[error("Malformed response: {message}")]
    Malformed {
        /// Description of the schema violation.
        message: String,
    },

    /// Provider-reported error (non-quota).
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error (missing credentials, unknown model).
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

impl RetryClass for ProviderError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}
