// Webhook client - relays UI commands to an automation endpoint
use crate::infrastructure::api_error::ApiError;
use crate::infrastructure::config::WebhookSettings;

const WEBHOOK: &str = "command webhook";

#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookClient {
    pub fn new(client: reqwest::Client, settings: &WebhookSettings) -> Self {
        Self {
            client,
            url: settings.url.clone(),
        }
    }

    /// POST `body` unchanged and return the webhook's JSON reply. The reply
    /// is relayed whatever its status; only transport and decode failures error.
    pub async fn forward(&self, body: &serde_json::Value) -> Result<serde_json::Value, ApiError> {
        let url = self.url.as_deref().ok_or(ApiError::NotConfigured(WEBHOOK))?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: WEBHOOK,
                source,
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Webhook answered with an error status");
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|source| ApiError::Decode {
                endpoint: WEBHOOK,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::test_support::serve;
    use axum::routing::post;
    use axum::{Json, Router};

    fn client(url: Option<String>) -> WebhookClient {
        WebhookClient::new(reqwest::Client::new(), &WebhookSettings { url })
    }

    #[tokio::test]
    async fn test_forwards_body_verbatim() {
        let base = serve(Router::new().route(
            "/hook",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({"received": body}))
            }),
        ))
        .await;

        let body = serde_json::json!({"command": "zoom", "args": {"level": 4}});
        let reply = client(Some(format!("{}/hook", base))).forward(&body).await.unwrap();
        assert_eq!(reply["received"], body);
    }

    #[tokio::test]
    async fn test_unconfigured_webhook() {
        let err = client(None)
            .forward(&serde_json::json!({"command": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "command webhook is not configured");
    }

    #[tokio::test]
    async fn test_non_json_reply_is_an_error() {
        let base = serve(Router::new().route("/hook", post(|| async { "accepted" }))).await;
        let err = client(Some(format!("{}/hook", base)))
            .forward(&serde_json::json!({"command": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
