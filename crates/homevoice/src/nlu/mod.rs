//! Natural-language understanding.
//!
//! The assistant only needs one operation from an NLU service: classify an
//! utterance into an intent with parameters. Backends implement
//! [`IntentDetector`]; the Dialogflow backend is behind the `dialogflow` feature.

#[cfg(feature = "dialogflow")]
mod credentials;
#[cfg(feature = "dialogflow")]
mod dialogflow;

use async_trait::async_trait;

#[cfg(feature = "dialogflow")]
pub use credentials::ServiceAccount;
#[cfg(feature = "dialogflow")]
pub use dialogflow::DialogflowClient;

use crate::intents::Params;

/// Result of classifying one utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedIntent {
    /// Intent display name, if the service matched one.
    pub intent: Option<String>,

    /// The service's own response text; may be empty.
    pub fulfillment: String,

    /// Extracted parameters.
    pub params: Params,
}

#[derive(Debug, thiserror::Error)]
pub enum NluError {
    #[error("Failed to read credentials file {0}: {1}")]
    CredentialsIo(std::path::PathBuf, #[source] std::io::Error),

    #[error("Invalid credentials file {0}: {1}")]
    CredentialsParse(std::path::PathBuf, #[source] serde_json::Error),

    #[error("Failed to sign token request: {0}")]
    Signing(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("NLU request failed: {0}")]
    Request(String),

    #[error("NLU service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Trait for NLU backends.
///
/// This trait allows the assistant to be driven by a mock detector in tests.
#[async_trait]
pub trait IntentDetector: Send + Sync {
    /// Classify `text` into an intent.
    async fn detect_intent(&self, text: &str) -> Result<DetectedIntent, NluError>;
}

/// Mock detector for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockDetector {
    pub responses: std::sync::Mutex<std::collections::HashMap<String, DetectedIntent>>,
    pub fail_with: Option<String>,
}

#[cfg(test)]
impl MockDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `text` with `intent` and `params`.
    pub fn respond(self, text: &str, intent: &str, params: serde_json::Value) -> Self {
        let params = match params {
            serde_json::Value::Object(map) => map,
            _ => Params::new(),
        };
        self.responses.lock().unwrap().insert(
            text.to_string(),
            DetectedIntent {
                intent: Some(intent.to_string()),
                fulfillment: String::new(),
                params,
            },
        );
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[async_trait]
impl IntentDetector for MockDetector {
    async fn detect_intent(&self, text: &str) -> Result<DetectedIntent, NluError> {
        if let Some(message) = &self.fail_with {
            return Err(NluError::Request(message.clone()));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_default())
    }
}
