//! Notifier: best-effort webhook delivery of progress/failure summaries.
//!
//! Every command's terminal failure path, plus the PDCA/Safety/Generation
//! components' human-readable reports, funnel through here. A delivery
//! failure is logged at `warn!` and never changes the caller's own exit
//! code — the notifier is a side channel, not a dependency any operation
//! can fail on.

use serde::Serialize;

use crate::config::NotifierConfig;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// One embed block of a webhook payload (Discord-style: title, description,
/// and an optional color accent).
#[derive(Debug, Clone, Default, Serialize)]
pub struct Embed {
    /// The embed's title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The embed's body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accent color as a decimal RGB integer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

#[derive(Serialize)]
struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed>,
}

/// A best-effort webhook client. Constructing one from a [`NotifierConfig`]
/// with no `webhook_url` yields a notifier whose sends are silent no-ops,
/// so callers never need to branch on whether notification is configured.
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    /// Build a notifier from [`NotifierConfig`]. Never fails: an absent
    /// `webhook_url` degrades to a no-op notifier.
    pub fn new(config: &NotifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("notifier HTTP client must build");
        Self {
            client,
            webhook_url: config.webhook_url.clone(),
        }
    }

    /// Send a plain text message. Logged and swallowed on failure.
    pub async fn send_text(&self, content: impl Into<String>) {
        self.send(Some(content.into()), Vec::new()).await;
    }

    /// Send a structured embed. Logged and swallowed on failure.
    pub async fn send_embed(&self, embed: Embed) {
        self.send(None, vec![embed]).await;
    }

    /// Send a raw `{content?, embeds?[]}` payload.
    pub async fn send(&self, content: Option<String>, embeds: Vec<Embed>) {
        let Some(webhook_url) = &self.webhook_url else {
            tracing::debug!("notifier not configured, dropping message");
            return;
        };

        let payload = WebhookPayload { content, embeds };
        let result = self
            .client
            .post(webhook_url)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        if let Err(err) = result {
            tracing::warn!(%err, "webhook delivery failed");
        }
    }

    /// `notify-test`: send a canned payload and report whether the webhook
    /// accepted it, without swallowing the result (the operator is
    /// explicitly checking reachability).
    pub async fn notify_test(&self) -> bool {
        let Some(webhook_url) = &self.webhook_url else {
            return false;
        };
        let payload = WebhookPayload {
            content: Some("postloop notifier test: webhook reachable.".to_string()),
            embeds: Vec::new(),
        };
        match self.client.post(webhook_url).json(&payload).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::warn!(%err, "notify-test webhook request failed");
                false
            }
        }
    }

    /// Whether this notifier has a webhook configured.
    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn unconfigured_notifier_is_a_silent_no_op() {
        let notifier = Notifier::new(&NotifierConfig { webhook_url: None });
        assert!(!notifier.is_configured());
        notifier.send_text("should not panic or block").await;
        assert!(!notifier.notify_test().await);
    }

    #[tokio::test]
    async fn configured_notifier_posts_json_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let notifier = Notifier::new(&NotifierConfig {
            webhook_url: Some(format!("{}/hook", server.uri())),
        });
        notifier.send_text("hello").await;
        assert!(notifier.is_configured());
    }

    #[tokio::test]
    async fn notify_test_reports_webhook_reachability() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let notifier = Notifier::new(&NotifierConfig {
            webhook_url: Some(format!("{}/hook", server.uri())),
        });
        assert!(notifier.notify_test().await);
    }

    #[tokio::test]
    async fn notify_test_reports_failure_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = Notifier::new(&NotifierConfig {
            webhook_url: Some(format!("{}/hook", server.uri())),
        });
        assert!(!notifier.notify_test().await);
    }

    #[tokio::test]
    async fn send_swallows_delivery_failure() {
        let notifier = Notifier::new(&NotifierConfig {
            webhook_url: Some("http://127.0.0.1:1".to_string()),
        });
        notifier.send_text("unreachable").await;
    }
}
