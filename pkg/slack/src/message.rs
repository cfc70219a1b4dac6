use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Who sees a slash-command or `response_url` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    Ephemeral,
}

/// Colored container around a list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub color: String,
    pub blocks: Vec<Value>,
}

/// A Slack message, usable both as a `chat.postMessage` body and as a
/// slash-command / `response_url` reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replace_original: bool,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn in_channel(mut self) -> Self {
        self.response_type = Some(ResponseType::InChannel);
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.response_type = Some(ResponseType::Ephemeral);
        self
    }

    /// Replace the message that carried the clicked button.
    pub fn replacing(mut self) -> Self {
        self.replace_original = true;
        self
    }

    pub fn with_blocks(mut self, blocks: Vec<Value>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn with_attachment(mut self, color: &str, blocks: Vec<Value>) -> Self {
        self.attachments.push(Attachment {
            color: color.to_string(),
            blocks,
        });
        self
    }
}

// --- Block Kit primitives ---

pub fn header(text: &str) -> Value {
    json!({"type": "header", "text": {"type": "plain_text", "text": text}})
}

pub fn section(text: &str) -> Value {
    json!({"type": "section", "text": {"type": "mrkdwn", "text": text}})
}

pub fn fields<S: AsRef<str>>(items: &[S]) -> Value {
    let fields: Vec<Value> = items
        .iter()
        .map(|t| json!({"type": "mrkdwn", "text": t.as_ref()}))
        .collect();
    json!({"type": "section", "fields": fields})
}

pub fn divider() -> Value {
    json!({"type": "divider"})
}

pub fn button(label: &str, value: &str, action_id: &str) -> Value {
    json!({
        "type": "button",
        "text": {"type": "plain_text", "text": label},
        "value": value,
        "action_id": action_id,
    })
}

pub fn actions(elements: Vec<Value>) -> Value {
    json!({"type": "actions", "elements": elements})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization_skips_empty_parts() {
        let json = serde_json::to_value(Message::text("hi")).unwrap();
        assert_eq!(json, json!({"text": "hi"}));

        let json = serde_json::to_value(
            Message::text("status")
                .in_channel()
                .replacing()
                .with_attachment("#2EB67D", vec![divider()]),
        )
        .unwrap();
        assert_eq!(json["response_type"], "in_channel");
        assert_eq!(json["replace_original"], true);
        assert_eq!(json["attachments"][0]["color"], "#2EB67D");
        assert_eq!(json["attachments"][0]["blocks"][0]["type"], "divider");
    }

    #[test]
    fn test_fields_section() {
        let block = fields(&["*A:*\n1", "*B:*\n2"]);
        assert_eq!(block["fields"].as_array().unwrap().len(), 2);
        assert_eq!(block["fields"][1]["text"], "*B:*\n2");
    }
}
