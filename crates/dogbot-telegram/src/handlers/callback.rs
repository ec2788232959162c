use anyhow::Context;
use tracing::{info, warn};

use dogbot_core::{
    dog_api::ImageFilter,
    domain::{MessageRef, SendContext},
};

use crate::keyboard::{BreedPager, CallbackAction};
use crate::router::AppState;

use super::send_dog;

/// The parts of a callback query the breed picker needs.
#[derive(Clone, Debug)]
pub struct CallbackInput {
    pub callback_id: String,
    pub data: String,
    /// The keyboard message and its chat kind, when Telegram sent it along.
    pub message: Option<(MessageRef, Option<String>)>,
}

async fn answer(state: &AppState, callback_id: &str, text: Option<&str>) {
    // Callback queries must always be answered, but failing to do so is cosmetic.
    if let Err(e) = state
        .messenger
        .answer_callback_query(callback_id, text)
        .await
    {
        warn!(error = %e, "failed to answer callback query");
    }
}

pub async fn handle_callback(state: &AppState, input: CallbackInput) -> anyhow::Result<()> {
    let Some((msg, chat_type)) = input.message else {
        answer(state, &input.callback_id, None).await;
        return Ok(());
    };

    let Some(action) = CallbackAction::parse(&input.data) else {
        answer(state, &input.callback_id, Some("Unknown option")).await;
        return Ok(());
    };

    match action {
        CallbackAction::Page { seed, page } => {
            answer(state, &input.callback_id, None).await;
            let pager = BreedPager::new(seed, state.cfg.breed_page_rows);
            state
                .messenger
                .edit_inline_keyboard(
                    msg,
                    &pager.prompt(&state.catalog, page),
                    pager.keyboard(&state.catalog, page),
                )
                .await
                .context("turning breed keyboard page")?;
        }
        CallbackAction::Breed { id } => {
            let Some(breed) = state.catalog.find(&id) else {
                answer(state, &input.callback_id, Some("Unknown breed")).await;
                return Ok(());
            };
            answer(state, &input.callback_id, None).await;

            info!(chat_id = msg.chat_id.0, breed = %breed.name, "breed selected");
            state
                .messenger
                .edit_text(msg, &format!("Sending breed: {}", breed.name))
                .await
                .context("updating breed keyboard message")?;

            let ctx = SendContext::new(msg.chat_id, chat_type);
            send_dog(state, ctx, ImageFilter::breed(id)).await?;
        }
    }
    Ok(())
}
