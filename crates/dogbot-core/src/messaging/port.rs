use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{InlineKeyboard, MessagingCapabilities},
    Result,
};

/// Capability used to push images and notices into a chat.
///
/// Telegram is the only implementation; the send pipeline and the handlers
/// only ever talk to this trait so they can be exercised with fakes.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Deliver a still image by URL.
    async fn send_photo(&self, chat_id: ChatId, url: &str) -> Result<MessageRef>;

    /// Deliver an animation (gif) by URL.
    async fn send_animation(&self, chat_id: ChatId, url: &str) -> Result<MessageRef>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    /// Replace the text of a message, dropping any keyboard attached to it.
    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()>;

    async fn edit_inline_keyboard(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<()>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
