use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;

use super::DetectedIntent;
use super::IntentDetector;
use super::NluError;
use super::ServiceAccount;
use crate::intents::Params;

const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Refresh the access token this long before the server says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    #[serde(default)]
    query_result: QueryResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    fulfillment_text: String,
    #[serde(default)]
    intent: Option<IntentRef>,
    #[serde(default)]
    parameters: Params,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentRef {
    #[serde(default)]
    display_name: String,
}

impl From<QueryResult> for DetectedIntent {
    fn from(result: QueryResult) -> Self {
        let intent = result
            .intent
            .map(|i| i.display_name)
            .filter(|name| !name.is_empty());
        Self {
            intent,
            fulfillment: result.fulfillment_text,
            params: result.parameters,
        }
    }
}

/// Dialogflow ES client using the v2 REST API.
///
/// Authenticates with a service-account key: a signed JWT is exchanged for an
/// OAuth2 access token, which is cached until shortly before it expires.
pub struct DialogflowClient {
    http: reqwest::Client,
    account: ServiceAccount,
    endpoint: String,
    language_code: String,
    session_id: String,
    token: Mutex<Option<CachedToken>>,
}

impl DialogflowClient {
    pub fn new(
        account: ServiceAccount,
        endpoint: impl Into<String>,
        language_code: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            account,
            endpoint: endpoint.into(),
            language_code: language_code.into(),
            session_id: session_id.into(),
            token: Mutex::new(None),
        }
    }

    fn detect_intent_url(&self) -> String {
        format!(
            "{}/v2/projects/{}/agent/sessions/{}:detectIntent",
            self.endpoint.trim_end_matches('/'),
            self.account.project_id,
            self.session_id
        )
    }

    async fn access_token(&self) -> Result<String, NluError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        debug!("Requesting access token from {}", self.account.token_uri);
        let assertion = self.account.token_assertion(SCOPE)?;
        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NluError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NluError::Auth(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| NluError::Auth(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        info!("Obtained access token for {}", self.account.client_email);

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl IntentDetector for DialogflowClient {
    async fn detect_intent(&self, text: &str) -> Result<DetectedIntent, NluError> {
        let token = self.access_token().await?;
        let body = json!({
            "queryInput": {
                "text": {
                    "text": text,
                    "languageCode": self.language_code,
                }
            }
        });

        let response = self
            .http
            .post(self.detect_intent_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| NluError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NluError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: DetectIntentResponse = response
            .json()
            .await
            .map_err(|e| NluError::Request(e.to_string()))?;
        let detected = DetectedIntent::from(parsed.query_result);
        debug!("Detected intent {:?} for {:?}", detected.intent, text);
        Ok(detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> ServiceAccount {
        serde_json::from_value(json!({
            "project_id": "smart-home-1234",
            "private_key": "unused",
            "client_email": "assistant@example.com"
        }))
        .unwrap()
    }

    #[test]
    fn test_detect_intent_url() {
        let client = DialogflowClient::new(
            account(),
            "https://dialogflow.googleapis.com/",
            "en",
            "123456",
        );
        assert_eq!(
            client.detect_intent_url(),
            "https://dialogflow.googleapis.com/v2/projects/smart-home-1234/agent/sessions/123456:detectIntent"
        );
    }

    #[test]
    fn test_parse_matched_intent() {
        let body = json!({
            "responseId": "abc",
            "queryResult": {
                "queryText": "make it 3 degrees warmer",
                "parameters": {"change-value": 3.0, "device": ""},
                "fulfillmentText": "Okay.",
                "intent": {
                    "name": "projects/p/agent/intents/1",
                    "displayName": "smarthome.heating.up"
                },
                "intentDetectionConfidence": 0.92
            }
        });

        let parsed: DetectIntentResponse = serde_json::from_value(body).unwrap();
        let detected = DetectedIntent::from(parsed.query_result);
        assert_eq!(detected.intent.as_deref(), Some("smarthome.heating.up"));
        assert_eq!(detected.fulfillment, "Okay.");
        assert_eq!(detected.params["change-value"], 3.0);
    }

    #[test]
    fn test_parse_without_intent() {
        let body = json!({"queryResult": {"queryText": "asdf"}});
        let parsed: DetectIntentResponse = serde_json::from_value(body).unwrap();
        let detected = DetectedIntent::from(parsed.query_result);
        assert_eq!(detected, DetectedIntent::default());
    }
}
