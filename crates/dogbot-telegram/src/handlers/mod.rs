//! Telegram update handlers.
//!
//! The teloxide endpoints only extract what they need from the update and
//! hand it to the command/callback handlers. Any error that comes back is
//! reported to the operator, and the user gets a short apology.

use std::sync::Arc;

use anyhow::Context;
use teloxide::{
    prelude::*,
    types::{CallbackQuery, Chat, Message},
};
use tracing::warn;

use dogbot_core::{
    dog_api::ImageFilter,
    domain::{ChatId, MessageId, MessageRef, SendContext},
};

use crate::report::{notify_operator, render_update, USER_FAILURE_NOTICE};
use crate::router::AppState;

mod callback;
mod commands;

pub use callback::CallbackInput;
pub use commands::{BotCommand, GREETING};

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if !text.starts_with('/') {
        return Ok(());
    }

    let ctx = SendContext::new(ChatId(msg.chat.id.0), chat_kind(&msg.chat));
    if let Err(err) = commands::handle_command(&state, ctx.clone(), text).await {
        report_failure(&state, Some(ctx.chat_id), &render_update(&msg), &err).await;
    }
    Ok(())
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let message = q.message.as_ref().map(|m| {
        (
            MessageRef {
                chat_id: ChatId(m.chat.id.0),
                message_id: MessageId(m.id.0),
            },
            chat_kind(&m.chat),
        )
    });
    let chat_id = message.as_ref().map(|(m, _)| m.chat_id);

    let input = CallbackInput {
        callback_id: q.id.clone(),
        data: q.data.clone().unwrap_or_default(),
        message,
    };
    if let Err(err) = callback::handle_callback(&state, input).await {
        report_failure(&state, chat_id, &render_update(&q), &err).await;
    }
    Ok(())
}

/// Telegram chat kind as a plain string.
fn chat_kind(chat: &Chat) -> Option<String> {
    let kind = if chat.is_private() {
        "private"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_group() {
        "group"
    } else if chat.is_channel() {
        "channel"
    } else {
        return None;
    };
    Some(kind.to_string())
}

/// Run the send pipeline for one command or breed selection.
pub(crate) async fn send_dog(
    state: &AppState,
    ctx: SendContext,
    filter: ImageFilter,
) -> anyhow::Result<()> {
    state
        .sender
        .send_image(&filter, &ctx, state.messenger.as_ref(), state.log.as_ref())
        .await
        .with_context(|| {
            format!(
                "sending {} dog to chat {}",
                filter.breed_label(),
                ctx.chat_id.0
            )
        })?;
    Ok(())
}

pub(crate) async fn report_failure(
    state: &AppState,
    chat_id: Option<ChatId>,
    update: &str,
    err: &anyhow::Error,
) {
    notify_operator(
        state.messenger.as_ref(),
        state.operator(),
        update,
        err,
        state.cfg.telegram_message_limit,
    )
    .await;

    let Some(chat_id) = chat_id else {
        return;
    };
    if chat_id == state.operator() {
        return;
    }
    if let Err(e) = state.messenger.send_text(chat_id, USER_FAILURE_NOTICE).await {
        warn!(error = %e, "failed to tell user about the failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TRUNCATION_MARKER;
    use async_trait::async_trait;
    use dogbot_core::{
        config::Config,
        delivery_log::CsvDeliveryLog,
        dog_api::{Breed, BreedCatalog, DogApiClient},
        messaging::{
            port::DeliveryChannel,
            types::{InlineKeyboard, MessagingCapabilities},
        },
        request::{HttpTransport, RawResponse, RequestExecutor, RequestSpec, TransportError},
        sender::DogSender,
        Result,
    };
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    const OPERATOR: ChatId = ChatId(1);
    const USER: ChatId = ChatId(500);

    struct FakeApi {
        status: u16,
        body: String,
    }

    #[async_trait]
    impl HttpTransport for FakeApi {
        async fn send(&self, _spec: &RequestSpec) -> std::result::Result<RawResponse, TransportError> {
            Ok(RawResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Text(ChatId, String),
        Photo(ChatId, String),
        Animation(ChatId, String),
        Keyboard(ChatId, String, usize),
        Edit(MessageRef, String),
        EditKeyboard(MessageRef, String),
        Answer(String, Option<String>),
    }

    #[derive(Default)]
    struct FakeMessenger {
        events: Mutex<Vec<Event>>,
    }

    impl FakeMessenger {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, e: Event) {
            self.events.lock().unwrap().push(e);
        }

        fn msg(chat_id: ChatId) -> MessageRef {
            MessageRef {
                chat_id,
                message_id: MessageId(7),
            }
        }
    }

    #[async_trait]
    impl DeliveryChannel for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                max_message_len: 4096,
            }
        }

        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            self.push(Event::Text(chat_id, text.to_string()));
            Ok(Self::msg(chat_id))
        }

        async fn send_photo(&self, chat_id: ChatId, url: &str) -> Result<MessageRef> {
            self.push(Event::Photo(chat_id, url.to_string()));
            Ok(Self::msg(chat_id))
        }

        async fn send_animation(&self, chat_id: ChatId, url: &str) -> Result<MessageRef> {
            self.push(Event::Animation(chat_id, url.to_string()));
            Ok(Self::msg(chat_id))
        }

        async fn send_inline_keyboard(
            &self,
            chat_id: ChatId,
            text: &str,
            keyboard: InlineKeyboard,
        ) -> Result<MessageRef> {
            self.push(Event::Keyboard(
                chat_id,
                text.to_string(),
                keyboard.button_count(),
            ));
            Ok(Self::msg(chat_id))
        }

        async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()> {
            self.push(Event::Edit(msg, text.to_string()));
            Ok(())
        }

        async fn edit_inline_keyboard(
            &self,
            msg: MessageRef,
            text: &str,
            _keyboard: InlineKeyboard,
        ) -> Result<()> {
            self.push(Event::EditKeyboard(msg, text.to_string()));
            Ok(())
        }

        async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
            self.push(Event::Answer(
                callback_id.to_string(),
                text.map(|s| s.to_string()),
            ));
            Ok(())
        }
    }

    struct Harness {
        state: AppState,
        messenger: Arc<FakeMessenger>,
        log_path: PathBuf,
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            if let Some(dir) = self.log_path.parent() {
                let _ = std::fs::remove_dir_all(dir);
            }
        }
    }

    fn harness(name: &str, status: u16, body: serde_json::Value) -> Harness {
        let log_path = std::env::temp_dir().join(format!(
            "dogbot-handlers-{name}-{}-{}/log.csv",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));

        // Avoid Config::load() env dependency: hand-roll config.
        let cfg = Config {
            telegram_bot_token: "x".to_string(),
            dog_api_key: "k".to_string(),
            developer_chat_id: OPERATOR.0,
            dog_api_base_url: "https://api.example.test/v1".to_string(),
            request_timeout: Duration::from_secs(1),
            delivery_log_path: log_path.clone(),
            telegram_message_limit: 4096,
            breed_page_rows: 2,
        };

        let api = DogApiClient::new(
            RequestExecutor::new(Arc::new(FakeApi {
                status,
                body: body.to_string(),
            })),
            cfg.dog_api_base_url.clone(),
            cfg.dog_api_key.clone(),
            cfg.request_timeout,
        );
        let messenger = Arc::new(FakeMessenger::default());
        let catalog = BreedCatalog::new(
            (1..=10)
                .map(|i| Breed::new(i.to_string(), format!("Breed {i}")))
                .collect(),
        );

        let state = AppState {
            cfg: Arc::new(cfg),
            sender: Arc::new(DogSender::new(api, OPERATOR)),
            catalog,
            log: Arc::new(CsvDeliveryLog::new(log_path.clone())),
            messenger: messenger.clone(),
        };
        Harness {
            state,
            messenger,
            log_path,
        }
    }

    fn hit(url: &str) -> serde_json::Value {
        serde_json::json!([{ "url": url }])
    }

    fn private() -> SendContext {
        SendContext::new(USER, Some("private".to_string()))
    }

    fn keyboard_message() -> Option<(MessageRef, Option<String>)> {
        Some((FakeMessenger::msg(USER), Some("group".to_string())))
    }

    #[tokio::test]
    async fn greeting_lists_commands() {
        let h = harness("hi", 200, hit("https://cdn.example/a.jpg"));
        commands::handle_command(&h.state, private(), "/hi").await.unwrap();
        assert_eq!(h.messenger.events(), vec![Event::Text(USER, GREETING.to_string())]);
    }

    #[tokio::test]
    async fn senddog_delivers_logs_and_notifies_operator() {
        let h = harness("senddog", 200, hit("https://cdn.example/a.jpg"));
        commands::handle_command(&h.state, private(), "/senddog").await.unwrap();

        assert_eq!(
            h.messenger.events(),
            vec![
                Event::Photo(USER, "https://cdn.example/a.jpg".to_string()),
                Event::Text(OPERATOR, "Sending a dog to a single user.".to_string()),
            ]
        );
        let rows = h.state.log.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].breed, "random");
        assert!(!rows[0].is_gif);
    }

    #[tokio::test]
    async fn senddoggif_delivers_animation() {
        let h = harness("gif", 200, hit("https://cdn.example/a.gif"));
        commands::handle_command(&h.state, private(), "/senddoggif").await.unwrap();

        assert_eq!(
            h.messenger.events()[0],
            Event::Animation(USER, "https://cdn.example/a.gif".to_string())
        );
        assert!(h.state.log.rows().await[0].is_gif);
    }

    #[tokio::test]
    async fn senddogbybreed_shows_first_page() {
        let h = harness("bybreed", 200, hit("https://cdn.example/a.jpg"));
        commands::handle_command(&h.state, private(), "/senddogbybreed").await.unwrap();

        // 10 breeds, 2 rows of 3 per page: 6 breeds plus "Next".
        assert_eq!(
            h.messenger.events(),
            vec![Event::Keyboard(USER, "Please choose: (page 1/2)".to_string(), 7)]
        );
    }

    #[tokio::test]
    async fn breed_selection_sends_that_breed() {
        let h = harness("select", 200, hit("https://cdn.example/b.png"));
        let input = CallbackInput {
            callback_id: "cb1".to_string(),
            data: "breed:4".to_string(),
            message: keyboard_message(),
        };
        callback::handle_callback(&h.state, input).await.unwrap();

        let msg = FakeMessenger::msg(USER);
        assert_eq!(
            h.messenger.events(),
            vec![
                Event::Answer("cb1".to_string(), None),
                Event::Edit(msg, "Sending breed: Breed 4".to_string()),
                Event::Photo(USER, "https://cdn.example/b.png".to_string()),
                Event::Text(OPERATOR, "Sending a dog to a group.".to_string()),
            ]
        );
        let rows = h.state.log.rows().await;
        assert_eq!(rows[0].breed, "4");
        assert!(rows[0].is_group);
    }

    #[tokio::test]
    async fn unknown_breed_is_answered_and_ignored() {
        let h = harness("unknown", 200, hit("https://cdn.example/b.png"));
        let input = CallbackInput {
            callback_id: "cb2".to_string(),
            data: "breed:999".to_string(),
            message: keyboard_message(),
        };
        callback::handle_callback(&h.state, input).await.unwrap();

        assert_eq!(
            h.messenger.events(),
            vec![Event::Answer("cb2".to_string(), Some("Unknown breed".to_string()))]
        );
        assert!(h.state.log.is_empty().await);
    }

    #[tokio::test]
    async fn page_turn_edits_keyboard_in_place() {
        let h = harness("page", 200, hit("https://cdn.example/b.png"));
        let input = CallbackInput {
            callback_id: "cb3".to_string(),
            data: "breeds:5:1".to_string(),
            message: keyboard_message(),
        };
        callback::handle_callback(&h.state, input).await.unwrap();

        assert_eq!(
            h.messenger.events(),
            vec![
                Event::Answer("cb3".to_string(), None),
                Event::EditKeyboard(
                    FakeMessenger::msg(USER),
                    "Please choose: (page 2/2)".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn failed_send_reports_to_operator_and_apologizes() {
        let h = harness("fail", 500, serde_json::json!({"message": "down"}));
        let err = commands::handle_command(&h.state, private(), "/senddog")
            .await
            .unwrap_err();
        report_failure(&h.state, Some(USER), "{\"update_id\": 1}", &err).await;

        let events = h.messenger.events();
        assert_eq!(events.len(), 2);
        match &events[0] {
            Event::Text(chat, text) => {
                assert_eq!(*chat, OPERATOR);
                assert!(text.contains("update_id"));
                assert!(text.contains("unexpected status 500"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(events[1], Event::Text(USER, USER_FAILURE_NOTICE.to_string()));
        assert!(h.state.log.is_empty().await);
    }

    #[tokio::test]
    async fn failure_report_respects_configured_limit() {
        let mut h = harness("limit", 500, serde_json::json!({"message": "down"}));
        Arc::make_mut(&mut h.state.cfg).telegram_message_limit = 120;

        let err = commands::handle_command(&h.state, private(), "/senddog")
            .await
            .unwrap_err();
        let update = format!("{{\"text\": \"{}\"}}", "x".repeat(500));
        report_failure(&h.state, Some(USER), &update, &err).await;

        match &h.messenger.events()[0] {
            Event::Text(chat, text) => {
                assert_eq!(*chat, OPERATOR);
                assert_eq!(text.chars().count(), 120);
                assert!(text.ends_with(TRUNCATION_MARKER));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_callback_data_is_answered_and_ignored() {
        let h = harness("malformed", 200, hit("https://cdn.example/b.png"));
        let input = CallbackInput {
            callback_id: "cb4".to_string(),
            data: "Akita__1".to_string(),
            message: keyboard_message(),
        };
        callback::handle_callback(&h.state, input).await.unwrap();

        assert_eq!(
            h.messenger.events(),
            vec![Event::Answer("cb4".to_string(), Some("Unknown option".to_string()))]
        );
        assert!(h.state.log.is_empty().await);
    }

    #[tokio::test]
    async fn callback_without_message_is_only_answered() {
        let h = harness("nomsg", 200, hit("https://cdn.example/b.png"));
        let input = CallbackInput {
            callback_id: "cb5".to_string(),
            data: "breed:4".to_string(),
            message: None,
        };
        callback::handle_callback(&h.state, input).await.unwrap();

        assert_eq!(h.messenger.events(), vec![Event::Answer("cb5".to_string(), None)]);
        assert!(h.state.log.is_empty().await);
    }

    #[tokio::test]
    async fn senddogbybreed_with_no_breeds_says_so() {
        let mut h = harness("nobreeds", 200, hit("https://cdn.example/a.jpg"));
        h.state.catalog = BreedCatalog::default();
        commands::handle_command(&h.state, private(), "/senddogbybreed").await.unwrap();

        assert_eq!(
            h.messenger.events(),
            vec![Event::Text(USER, commands::NO_BREEDS.to_string())]
        );
    }
}
