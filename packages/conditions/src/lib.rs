#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live incident and weather summaries via grounded search.
//!
//! Both fetchers never propagate failures: every failure path is converted
//! into a degraded-but-well-typed snapshot, because the advisory must
//! always render something. Live conditions get the interactive retry
//! budget; ambient weather is a background enrichment and gets the short
//! budget, failing fast and degrading silently.

use std::sync::Arc;

use chrono::Utc;
use haul_advisor_generative::providers::GenerativeProvider;
use haul_advisor_models::{LiveConditionsSnapshot, WeatherSnapshot};
use haul_advisor_resilience::{RetryClass, RetryPolicy, with_retry};

/// Fetches current incidents and weather for the target city.
pub struct LiveConditionsFetcher {
    provider: Arc<dyn GenerativeProvider>,
    city: String,
}

impl LiveConditionsFetcher {
    /// Creates a fetcher scoped to the given city.
    #[must_use]
    pub fn new(provider: Arc<dyn GenerativeProvider>, city: impl Into<String>) -> Self {
        Self {
            provider,
            city: city.into(),
        }
    }

    /// Fetches a live-conditions summary for `context` (a street name or a
    /// short list of route streets). Never fails.
    pub async fn fetch_live_conditions(&self, context: &str) -> LiveConditionsSnapshot {
        let prompt = format!(
            "Current traffic incidents, road closures and disruptions in {city} \
             relevant to heavy-vehicle traffic on or near: {context}. \
             Summarize in at most four sentences for a logistics dispatcher.",
            city = self.city,
        );

        let result = with_retry(RetryPolicy::interactive(), "live conditions", || {
            self.provider.generate_grounded(&prompt)
        })
        .await;

        match result {
            Ok(answer) => LiveConditionsSnapshot {
                summary: answer.text,
                sources: answer.sources,
                fetched_at: Utc::now(),
            },
            Err(e) if e.is_rate_limited() => {
                log::warn!("Live conditions rate limited, degrading: {e}");
                LiveConditionsSnapshot {
                    summary: "Live conditions temporarily unavailable (rate limited)."
                        .to_string(),
                    sources: Vec::new(),
                    fetched_at: Utc::now(),
                }
            }
            Err(e) => {
                log::error!("Live conditions fetch failed: {e}");
                LiveConditionsSnapshot {
                    summary: "Unable to fetch live conditions.".to_string(),
                    sources: Vec::new(),
                    fetched_at: Utc::now(),
                }
            }
        }
    }

    /// Fetches an ambient weather summary for the city. Never fails, and
    /// never surfaces an error to the operator; weather is a background
    /// enrichment.
    pub async fn fetch_ambient_weather(&self) -> WeatherSnapshot {
        let prompt = format!(
            "Current weather in {city} as it affects road traffic (wind, rain, ice, \
             visibility). Two sentences at most.",
            city = self.city,
        );

        let result = with_retry(RetryPolicy::background(), "ambient weather", || {
            self.provider.generate_grounded(&prompt)
        })
        .await;

        match result {
            Ok(answer) => WeatherSnapshot {
                summary: answer.text,
                fetched_at: Utc::now(),
            },
            Err(e) => {
                log::warn!("Ambient weather fetch failed, degrading silently: {e}");
                WeatherSnapshot {
                    summary: "Weather unavailable.".to_string(),
                    fetched_at: Utc::now(),
                }
            }
        }
    }
}
