// SPDX-License-Identifier: MIT OR Apache-2.0
//! Protocol webhook delivery.
//!
//! At-least-once semantics: duplicates are expected and buyers deduplicate
//! on `(task_id, status)`. A failed delivery is logged and swallowed — it
//! must never turn a successful request into a failure.

use adcp_core::task::{PushNotificationConfig, WebhookPayload};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Bounded timeout for a single webhook POST.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers protocol webhooks to buyer-registered endpoints.
#[derive(Clone)]
pub struct WebhookSender {
    client: reqwest::Client,
    /// Host substituted for `localhost` destinations so containerized
    /// deployments can reach a receiver on the host machine.
    container_host: String,
}

impl WebhookSender {
    /// Sender with the default `host.docker.internal` localhost rewrite.
    #[must_use]
    pub fn new() -> Self {
        Self::with_container_host("host.docker.internal")
    }

    /// Sender with an explicit localhost-rewrite target. Tests pass the
    /// literal `"localhost"` to disable the rewrite.
    pub fn with_container_host(container_host: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .unwrap_or_default(),
            container_host: container_host.into(),
        }
    }

    /// Rewrite `localhost`/`127.0.0.1` destinations to the container host.
    #[must_use]
    pub fn effective_url(&self, url: &str) -> String {
        match url::Url::parse(url) {
            Ok(mut parsed) => {
                let host = parsed.host_str().unwrap_or_default();
                if host == "localhost" || host == "127.0.0.1" {
                    if parsed.set_host(Some(&self.container_host)).is_ok() {
                        return parsed.to_string();
                    }
                }
                url.to_string()
            }
            Err(_) => url.to_string(),
        }
    }

    /// POST a payload to a configured endpoint. Failures are logged and
    /// swallowed.
    pub async fn send(
        &self,
        config: &PushNotificationConfig,
        payload: &WebhookPayload,
        task_type: Option<&str>,
    ) {
        let url = self.effective_url(&config.url);

        let mut body = match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                warn!(?other, "webhook payload serialized to a non-object; skipping send");
                return;
            }
            Err(err) => {
                warn!(error = %err, "failed to serialize webhook payload");
                return;
            }
        };
        if let Some(task_type) = task_type {
            body.insert(
                "metadata".to_string(),
                serde_json::json!({ "task_type": task_type }),
            );
        }

        let mut request = self.client.post(&url).json(&Value::Object(body));

        // Auth uses scheme[0] + credentials from the stored config.
        if let Some(auth) = &config.authentication {
            if let (Some(scheme), Some(credentials)) = (auth.schemes.first(), &auth.credentials) {
                request = request.header("Authorization", format!("{scheme} {credentials}"));
            }
        }
        if let Some(token) = &config.token {
            request = request.header("X-AdCP-Validation-Token", token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                info!(url = %url, "webhook delivered");
            }
            Ok(response) => {
                warn!(url = %url, status = %response.status(), "webhook endpoint returned an error");
            }
            Err(err) => {
                warn!(url = %url, error = %err, "webhook delivery failed");
            }
        }
    }
}

impl Default for WebhookSender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_core::task::{webhook_payload, PushAuthenticationInfo, TaskState};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn localhost_rewritten_to_container_host() {
        let sender = WebhookSender::new();
        assert_eq!(
            sender.effective_url("http://localhost:8080/webhook"),
            "http://host.docker.internal:8080/webhook"
        );
        assert_eq!(
            sender.effective_url("http://127.0.0.1:9999/hook"),
            "http://host.docker.internal:9999/hook"
        );
    }

    #[test]
    fn external_hosts_untouched() {
        let sender = WebhookSender::new();
        assert_eq!(
            sender.effective_url("https://buyer.example.com/hooks"),
            "https://buyer.example.com/hooks"
        );
    }

    #[tokio::test]
    async fn delivers_payload_with_auth_and_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("Authorization", "Bearer hook-secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sender = WebhookSender::with_container_host("localhost");
        let config = PushNotificationConfig {
            id: Some("pnc_1".into()),
            url: format!("{}/hook", server.uri()),
            token: None,
            authentication: Some(PushAuthenticationInfo {
                schemes: vec!["Bearer".into()],
                credentials: Some("hook-secret".into()),
            }),
        };
        let payload = webhook_payload("task_1", "ctx_1", TaskState::Submitted, None);
        sender.send(&config, &payload, Some("create_media_buy")).await;
    }

    #[tokio::test]
    async fn failed_delivery_is_swallowed() {
        // Nothing listens on this port; send must not panic or error.
        let sender = WebhookSender::with_container_host("localhost");
        let config = PushNotificationConfig {
            id: None,
            url: "http://localhost:9/unreachable".into(),
            token: None,
            authentication: None,
        };
        let payload = webhook_payload("task_1", "ctx_1", TaskState::Completed, None);
        sender.send(&config, &payload, None).await;
    }
}
