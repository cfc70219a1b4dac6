use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use pkg_constants::network::{SLACK_API_BASE, SLACK_TIMEOUT_SECS};

use crate::message::Message;

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("Slack bot token or channel is not configured")]
    NotConfigured,

    #[error("Slack API error: {0}")]
    Api(String),

    #[error("Slack request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts to `chat.postMessage` with the bot token, and replies to
/// interaction `response_url`s.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
    channel: Option<String>,
}

impl SlackClient {
    pub fn new(token: Option<String>, channel: Option<String>) -> anyhow::Result<Self> {
        Self::with_api_base(SLACK_API_BASE, token, channel)
    }

    pub fn with_api_base(
        api_base: &str,
        token: Option<String>,
        channel: Option<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SLACK_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            channel: channel.filter(|c| !c.is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.channel.is_some()
    }

    /// Post to the configured channel unless the message names its own.
    pub async fn post_message(&self, message: &Message) -> Result<(), SlackError> {
        let token = self.token.as_ref().ok_or(SlackError::NotConfigured)?;
        let mut body = message.clone();
        if body.channel.is_none() {
            body.channel = Some(self.channel.clone().ok_or(SlackError::NotConfigured)?);
        }

        let resp: ApiResponse = self
            .http
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        check_response(resp)?;
        info!("Posted Slack message to {}", body.channel.as_deref().unwrap_or("?"));
        Ok(())
    }

    /// Reply through an interaction or slash-command `response_url`.
    pub async fn respond(&self, response_url: &str, message: &Message) -> Result<(), SlackError> {
        debug!("Responding via {}", response_url);
        self.http
            .post(response_url)
            .json(message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn check_response(resp: ApiResponse) -> Result<(), SlackError> {
    if resp.ok {
        Ok(())
    } else {
        Err(SlackError::Api(
            resp.error.unwrap_or_else(|| "unknown_error".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, routing::post};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn fake_slack() -> (String, Captured) {
        async fn handler(
            State(captured): State<Captured>,
            Json(body): Json<serde_json::Value>,
        ) -> Json<serde_json::Value> {
            let ok = body["channel"] != "#missing";
            captured.lock().unwrap().push(body);
            if ok {
                Json(serde_json::json!({"ok": true}))
            } else {
                Json(serde_json::json!({"ok": false, "error": "channel_not_found"}))
            }
        }

        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/chat.postMessage", post(handler))
            .route("/respond", post(handler))
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), captured)
    }

    #[tokio::test]
    async fn test_post_message_uses_default_channel() {
        let (base, captured) = fake_slack().await;
        let client =
            SlackClient::with_api_base(&base, Some("xoxb-1".into()), Some("#infra".into())).unwrap();
        client.post_message(&Message::text("hello")).await.unwrap();

        let bodies = captured.lock().unwrap();
        assert_eq!(bodies[0]["channel"], "#infra");
        assert_eq!(bodies[0]["text"], "hello");
    }

    #[tokio::test]
    async fn test_post_message_api_error() {
        let (base, _) = fake_slack().await;
        let client =
            SlackClient::with_api_base(&base, Some("xoxb-1".into()), Some("#missing".into())).unwrap();
        let err = client.post_message(&Message::text("x")).await.unwrap_err();
        assert!(matches!(err, SlackError::Api(e) if e == "channel_not_found"));
    }

    #[tokio::test]
    async fn test_unconfigured_client() {
        let client = SlackClient::new(Some(String::new()), None).unwrap();
        assert!(!client.is_configured());
        let err = client.post_message(&Message::text("x")).await.unwrap_err();
        assert!(matches!(err, SlackError::NotConfigured));
    }

    #[tokio::test]
    async fn test_respond_posts_to_response_url() {
        let (base, captured) = fake_slack().await;
        let client = SlackClient::new(None, None).unwrap();
        client
            .respond(&format!("{}/respond", base), &Message::text("checking").in_channel())
            .await
            .unwrap();
        assert_eq!(captured.lock().unwrap()[0]["response_type"], "in_channel");
    }
}
