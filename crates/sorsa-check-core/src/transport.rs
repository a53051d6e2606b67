//! Chat transport seam: the dispatcher only needs to send and edit messages.

use async_trait::async_trait;

use crate::error::BotResult;

/// Telegram chat ids are signed 64-bit.
pub type ChatId = i64;
pub type MessageId = i64;

/// A text or caption the bot received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
}

/// Inline URL button under a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: ChatId,
    pub text: String,
    /// Parse as Telegram HTML.
    pub html: bool,
    pub disable_preview: bool,
    pub reply_to: Option<MessageId>,
    pub button: Option<UrlButton>,
}

impl OutgoingMessage {
    /// Plain-text reply to `to`.
    pub fn reply(to: &InboundMessage, text: impl Into<String>) -> Self {
        Self {
            chat_id: to.chat_id,
            text: text.into(),
            html: false,
            disable_preview: false,
            reply_to: Some(to.message_id),
            button: None,
        }
    }

    /// HTML body with link previews off.
    pub fn html(mut self) -> Self {
        self.html = true;
        self.disable_preview = true;
        self
    }

    pub fn with_button(mut self, button: UrlButton) -> Self {
        self.button = Some(button);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
    pub html: bool,
    pub disable_preview: bool,
    pub button: Option<UrlButton>,
}

impl EditMessage {
    /// Replace the text of a previously sent message with HTML.
    pub fn html(chat_id: ChatId, message_id: MessageId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            text: text.into(),
            html: true,
            disable_preview: true,
            button: None,
        }
    }

    pub fn with_button(mut self, button: UrlButton) -> Self {
        self.button = Some(button);
        self
    }
}

/// Receipt for a sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, message: OutgoingMessage) -> BotResult<SentMessage>;
    async fn edit_message(&self, edit: EditMessage) -> BotResult<()>;
}
