use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub message: Option<Message>,
    pub postback: Option<Postback>,
    #[serde(rename = "replyToken")]
    pub reply_token: Option<String>,
    pub source: Option<Source>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Postback {
    pub data: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Source {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "groupId")]
    pub group_id: Option<String>,
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
}

/// The part of an event the dispatcher acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    Text(String),
    Postback(String),
}

impl WebhookEvent {
    /// Text messages and postbacks; every other event kind is `None`.
    pub fn payload(&self) -> Option<InboundPayload> {
        match self.event_type.as_str() {
            "message" => {
                let message = self.message.as_ref()?;
                if message.message_type != "text" {
                    return None;
                }
                message.text.clone().map(InboundPayload::Text)
            }
            "postback" => self
                .postback
                .as_ref()
                .map(|p| InboundPayload::Postback(p.data.clone())),
            _ => None,
        }
    }

    /// User id of a one-to-one `follow` event.
    pub fn follower_id(&self) -> Option<&str> {
        if self.event_type != "follow" {
            return None;
        }
        let source = self.source.as_ref()?;
        if source.source_type != "user" {
            return None;
        }
        source.user_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Action attached to a quick reply chip or a rich menu area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Message {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        text: String,
    },
    Postback {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        data: String,
        #[serde(rename = "displayText", skip_serializing_if = "Option::is_none")]
        display_text: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickReplyItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: String,
    #[serde(rename = "quickReply", skip_serializing_if = "Option::is_none")]
    pub quick_reply: Option<QuickReply>,
}

impl ReplyMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message_type: "text".to_string(),
            text: text.into(),
            quick_reply: None,
        }
    }

    /// Text message with one message-action chip per label.
    pub fn with_quick_replies<'a>(
        text: impl Into<String>,
        labels: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let items = labels
            .into_iter()
            .map(|label| QuickReplyItem {
                item_type: "action".to_string(),
                action: Action::Message {
                    label: Some(label.to_string()),
                    text: label.to_string(),
                },
            })
            .collect();

        Self {
            quick_reply: Some(QuickReply { items }),
            ..Self::text(text)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyRequest {
    #[serde(rename = "replyToken")]
    pub reply_token: String,
    pub messages: Vec<ReplyMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichMenuArea {
    pub bounds: Bounds,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichMenu {
    pub size: Size,
    pub selected: bool,
    pub name: String,
    #[serde(rename = "chatBarText")]
    pub chat_bar_text: String,
    pub areas: Vec<RichMenuArea>,
}

#[derive(Debug, Deserialize)]
pub struct RichMenuIdResponse {
    #[serde(rename = "richMenuId")]
    pub rich_menu_id: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
