//! Telegram Bot API transport over reqwest: long-poll `getUpdates`, `sendMessage`,
//! `editMessageText`. No framework; the bot only needs these few calls.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::BotConfig;
use crate::error::{BotError, BotResult};
use crate::transport::{
    ChatTransport, EditMessage, InboundMessage, OutgoingMessage, SentMessage, UrlButton,
};

/// Max updates per `getUpdates` call.
const UPDATE_BATCH_LIMIT: u32 = 100;

/// Slack on top of the long-poll timeout before reqwest gives up on the socket.
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub chat: TgChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

impl Update {
    /// Text message or media caption, whichever is present.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let msg = self.message?;
        let text = msg.text.or(msg.caption).filter(|t| !t.is_empty())?;
        Some(InboundMessage {
            chat_id: msg.chat.id,
            message_id: msg.message_id,
            text,
        })
    }
}

#[derive(Serialize)]
struct GetUpdatesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    limit: u32,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Bot API client bound to one token.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    api_base: String,
    token: String,
    poll_timeout: Duration,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str, poll_timeout: Duration) -> BotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(poll_timeout + POLL_GRACE)
            .build()?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            poll_timeout,
            client,
        })
    }

    pub fn from_config(config: &BotConfig) -> BotResult<Self> {
        Self::new(&config.telegram_api_base, &config.bot_token, config.poll_timeout)
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> BotResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{}", self.api_base, self.token, method);
        let res = self.client.post(&url).json(params).send().await?;
        let status = res.status();
        let text = res.text().await?;
        let envelope: ApiEnvelope<R> = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                BotError::Json(e)
            } else {
                BotError::Upstream {
                    status: status.as_u16(),
                    body: text.chars().take(200).collect(),
                }
            }
        })?;
        if !envelope.ok {
            return Err(BotError::Telegram(format!(
                "{} failed ({}): {}",
                method,
                envelope.error_code.unwrap_or(status.as_u16() as i64),
                envelope.description.unwrap_or_default()
            )));
        }
        envelope
            .result
            .ok_or_else(|| BotError::Telegram(format!("{} returned no result", method)))
    }

    pub async fn get_me(&self) -> BotResult<BotUser> {
        self.call("getMe", &json!({})).await
    }

    /// Long-poll for new messages starting at `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> BotResult<Vec<Update>> {
        let params = GetUpdatesParams {
            offset,
            limit: UPDATE_BATCH_LIMIT,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &params).await
    }

    /// Tell Telegram everything below `offset` is handled, without waiting for new updates.
    /// Used on shutdown so a restart does not replay the last batch.
    pub async fn confirm_offset(&self, offset: i64) -> BotResult<()> {
        let params = GetUpdatesParams {
            offset: Some(offset),
            limit: 1,
            timeout: 0,
            allowed_updates: ["message"],
        };
        let _: Vec<Update> = self.call("getUpdates", &params).await?;
        Ok(())
    }
}

fn reply_markup(button: &Option<UrlButton>) -> Option<serde_json::Value> {
    button.as_ref().map(|b| {
        json!({
            "inline_keyboard": [[{ "text": b.label, "url": b.url }]]
        })
    })
}

#[derive(Debug, Deserialize)]
struct SentPayload {
    message_id: i64,
    chat: TgChat,
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_message(&self, message: OutgoingMessage) -> BotResult<SentMessage> {
        let mut params = json!({
            "chat_id": message.chat_id,
            "text": message.text,
        });
        if message.html {
            params["parse_mode"] = json!("HTML");
        }
        if message.disable_preview {
            params["link_preview_options"] = json!({ "is_disabled": true });
        }
        if let Some(reply_to) = message.reply_to {
            params["reply_parameters"] = json!({
                "message_id": reply_to,
                "allow_sending_without_reply": true,
            });
        }
        if let Some(markup) = reply_markup(&message.button) {
            params["reply_markup"] = markup;
        }
        let sent: SentPayload = self.call("sendMessage", &params).await?;
        Ok(SentMessage {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    async fn edit_message(&self, edit: EditMessage) -> BotResult<()> {
        let mut params = json!({
            "chat_id": edit.chat_id,
            "message_id": edit.message_id,
            "text": edit.text,
        });
        if edit.html {
            params["parse_mode"] = json!("HTML");
        }
        if edit.disable_preview {
            params["link_preview_options"] = json!({ "is_disabled": true });
        }
        if let Some(markup) = reply_markup(&edit.button) {
            params["reply_markup"] = markup;
        }
        // Returns the edited Message, or `true` for inline messages.
        let _: serde_json::Value = self.call("editMessageText", &params).await?;
        Ok(())
    }
}
