//! Content generator collaborator: topic suggestion and join passwords.
//!
//! The generator is consulted, never synchronized: any failure or empty
//! response is silently replaced with an entry from the configured fallback
//! lists and is never surfaced as a user-facing error.

use futures::future::BoxFuture;
use rand::rng;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::config::AppConfig;

/// Prompt sent to the generator when suggesting a debate topic.
pub const TOPIC_PROMPT: &str = "Generate a surprising and creative debate topic suitable for \
college students. Keep it concise (under 100 characters), light-hearted, and non-political. \
Do not add any extra text, introduction, or quotation marks.";

/// Failure modes of a content generator call.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The request could not be completed.
    #[error("content generator request failed: {0}")]
    Request(String),
    /// The generator answered with nothing usable.
    #[error("content generator returned an empty response")]
    Empty,
}

/// External text-generation service consulted for topics.
pub trait ContentGenerator: Send + Sync {
    /// Produce a text completion for the prompt.
    fn generate_text(&self, prompt: &str) -> BoxFuture<'static, Result<String, ContentError>>;
}

/// Ask the generator for a topic, substituting a configured fallback on any
/// failure or empty response.
pub async fn suggest_topic(generator: &dyn ContentGenerator, config: &AppConfig) -> String {
    match generator.generate_text(TOPIC_PROMPT).await {
        Ok(topic) if !topic.trim().is_empty() => topic.trim().to_string(),
        Ok(_) | Err(_) => fallback_topic(config),
    }
}

/// Pick a random topic from the configured fallback list.
pub fn fallback_topic(config: &AppConfig) -> String {
    config
        .fallback_topics
        .choose(&mut rng())
        .cloned()
        .unwrap_or_else(|| "Is artificial intelligence a threat to humanity?".to_string())
}

/// Pick a join password from the configured list.
pub fn generate_password(config: &AppConfig) -> String {
    config
        .passwords
        .choose(&mut rng())
        .cloned()
        .unwrap_or_else(|| "debate505".to_string())
}

/// Join passwords are 6 to 20 characters.
pub fn validate_password(password: &str) -> bool {
    (6..=20).contains(&password.len())
}

/// Gemini-backed [`ContentGenerator`] speaking the `generateContent` API.
#[cfg(feature = "gemini-content")]
pub mod gemini {
    use futures::future::BoxFuture;
    use serde_json::json;

    use super::{ContentError, ContentGenerator};

    const DEFAULT_API_URL: &str =
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent";

    /// HTTP client for the hosted generation API.
    pub struct GeminiGenerator {
        client: reqwest::Client,
        url: String,
        api_key: String,
    }

    impl GeminiGenerator {
        /// Client against the default model endpoint.
        pub fn new(api_key: impl Into<String>) -> Self {
            Self::with_url(DEFAULT_API_URL, api_key)
        }

        /// Client against a custom endpoint, mainly for tests.
        pub fn with_url(url: impl Into<String>, api_key: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                url: url.into(),
                api_key: api_key.into(),
            }
        }
    }

    impl ContentGenerator for GeminiGenerator {
        fn generate_text(&self, prompt: &str) -> BoxFuture<'static, Result<String, ContentError>> {
            let client = self.client.clone();
            let url = self.url.clone();
            let api_key = self.api_key.clone();
            let body = json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": { "temperature": 1.0, "maxOutputTokens": 100 },
            });

            Box::pin(async move {
                let response = client
                    .post(&url)
                    .header("x-goog-api-key", api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|err| ContentError::Request(err.to_string()))?;

                if !response.status().is_success() {
                    return Err(ContentError::Request(format!(
                        "unexpected status {}",
                        response.status()
                    )));
                }

                let data: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|err| ContentError::Request(err.to_string()))?;
                let text = data["candidates"][0]["content"]["parts"][0]["text"]
                    .as_str()
                    .map(str::trim)
                    .unwrap_or_default();

                if text.is_empty() {
                    Err(ContentError::Empty)
                } else {
                    Ok(text.to_string())
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingGenerator;

    impl ContentGenerator for FailingGenerator {
        fn generate_text(&self, _prompt: &str) -> BoxFuture<'static, Result<String, ContentError>> {
            Box::pin(std::future::ready(Err(ContentError::Request(
                "connection refused".into(),
            ))))
        }
    }

    struct EmptyGenerator;

    impl ContentGenerator for EmptyGenerator {
        fn generate_text(&self, _prompt: &str) -> BoxFuture<'static, Result<String, ContentError>> {
            Box::pin(std::future::ready(Ok("   ".to_string())))
        }
    }

    struct EchoGenerator;

    impl ContentGenerator for EchoGenerator {
        fn generate_text(&self, _prompt: &str) -> BoxFuture<'static, Result<String, ContentError>> {
            Box::pin(std::future::ready(Ok(
                " Should homework be optional? ".to_string()
            )))
        }
    }

    #[tokio::test]
    async fn generator_failure_yields_a_fallback_topic() {
        let config = AppConfig::default();
        let topic = suggest_topic(&FailingGenerator, &config).await;
        assert!(config.fallback_topics.contains(&topic));
    }

    #[tokio::test]
    async fn empty_response_yields_a_fallback_topic() {
        let config = AppConfig::default();
        let topic = suggest_topic(&EmptyGenerator, &config).await;
        assert!(config.fallback_topics.contains(&topic));
    }

    #[tokio::test]
    async fn successful_response_is_trimmed_and_used() {
        let config = AppConfig::default();
        let topic = suggest_topic(&EchoGenerator, &config).await;
        assert_eq!(topic, "Should homework be optional?");
    }

    #[test]
    fn password_bounds_are_inclusive() {
        assert!(!validate_password("short"));
        assert!(validate_password("logic101"));
        assert!(validate_password("a".repeat(20).as_str()));
        assert!(!validate_password("a".repeat(21).as_str()));
    }

    #[test]
    fn generated_passwords_always_validate() {
        let config = AppConfig::default();
        for _ in 0..32 {
            assert!(validate_password(&generate_password(&config)));
        }
    }
}
