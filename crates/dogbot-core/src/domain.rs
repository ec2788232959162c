/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Where an image is delivered, as seen by the send pipeline.
///
/// `chat_type` is the messenger's chat kind (`private`, `group`,
/// `supergroup`, `channel`). It is optional because not every update carries
/// enough context to resolve it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendContext {
    pub chat_id: ChatId,
    pub chat_type: Option<String>,
}

impl SendContext {
    pub fn new(chat_id: ChatId, chat_type: Option<String>) -> Self {
        Self { chat_id, chat_type }
    }
}
