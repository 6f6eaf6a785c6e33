use serde::{Deserialize, Serialize};

/// One outbound webhook message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub blocks: Vec<Block>,
}

impl Message {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }
}

/// Block kinds the webhook payload is built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Header { text: Text },
    Section { text: Text },
    Divider,
}

impl Block {
    pub fn header(text: impl Into<String>) -> Self {
        Self::Header {
            text: Text {
                kind: "plain_text".to_string(),
                text: text.into(),
            },
        }
    }

    pub fn section(text: impl Into<String>) -> Self {
        Self::Section {
            text: Text {
                kind: "mrkdwn".to_string(),
                text: text.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Text {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_serialize_to_the_webhook_wire_shape() {
        let message = Message::new(vec![
            Block::header("Build Status - 07.08.2026"),
            Block::section("*Backend:* 🔴"),
            Block::Divider,
        ]);

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["blocks"][0]["type"], "header");
        assert_eq!(json["blocks"][0]["text"]["type"], "plain_text");
        assert_eq!(json["blocks"][1]["type"], "section");
        assert_eq!(json["blocks"][1]["text"]["type"], "mrkdwn");
        assert_eq!(
            json["blocks"][2],
            serde_json::json!({"type": "divider"}),
            "divider carries no text field"
        );
    }
}
