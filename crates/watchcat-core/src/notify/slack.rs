use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{NotificationEvent, Notifier, NotifyError};
use crate::error::CheckError;
use crate::types::TargetKind;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(20);
const USERNAME: &str = "watchcat";
/// Slack truncates long attachments anyway; keep payloads small.
const MAX_BODY_CHARS: usize = 1500;

/// Posts events to a Slack-compatible incoming webhook.
///
/// Any non-2xx response is a delivery failure. There is no retry; the
/// fan-out logs the error and moves on.
pub struct SlackNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()?;
        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }

    async fn post(&self, payload: &Value) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

fn color(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Release | TargetKind::Tag => "#36a64f",
        TargetKind::Commit => "#439fe0",
        TargetKind::Issue => "#e8a723",
        TargetKind::PullRequest => "#6f42c1",
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

pub fn event_payload(event: &NotificationEvent) -> Value {
    let repo = format!("{}/{}", event.owner, event.repo_name);
    let change = if event.previous.is_empty() {
        event.current.clone()
    } else {
        format!("{} → {}", event.previous, event.current)
    };
    let mut attachment = json!({
        "color": color(event.kind),
        "author_name": repo,
        "author_link": format!("https://github.com/{repo}"),
        "title": format!("new {}: {}", event.kind, event.title),
        "title_link": event.link,
        "text": truncate(&event.body),
        "footer": change,
    });
    if let Some(avatar) = &event.avatar_url {
        attachment["author_icon"] = json!(avatar);
    }

    let mut payload = json!({
        "username": USERNAME,
        "attachments": [attachment],
    });
    if let Some(avatar) = &event.avatar_url {
        payload["icon_url"] = json!(avatar);
    }
    payload
}

pub fn error_payload(err: &CheckError) -> Value {
    json!({
        "username": USERNAME,
        "attachments": [{
            "color": "danger",
            "title": "watchcat error",
            "text": err.to_string(),
        }],
    })
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.post(&event_payload(event)).await
    }

    async fn report_error(&self, err: &CheckError) -> Result<(), NotifyError> {
        self.post(&error_payload(err)).await
    }
}
