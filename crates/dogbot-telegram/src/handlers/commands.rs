use anyhow::Context;
use tracing::{debug, info};

use dogbot_core::{dog_api::ImageFilter, domain::SendContext};

use crate::keyboard::{new_seed, BreedPager};
use crate::router::AppState;

use super::send_dog;

pub const GREETING: &str = "Hi there! I'm a DogBot and can send images of dogs.\n\n\
/senddog - a random dog picture\n\
/senddoggif - a random dog gif\n\
/senddogbybreed - pick a breed first";

pub(crate) const NO_BREEDS: &str = "No breeds are available right now.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Hi,
    SendDog,
    SendDogGif,
    SendDogByBreed,
}

impl BotCommand {
    pub fn parse(text: &str) -> Option<Self> {
        let (cmd, _args) = parse_command(text);
        match cmd.as_str() {
            "hi" | "start" | "help" => Some(Self::Hi),
            "senddog" => Some(Self::SendDog),
            "senddoggif" => Some(Self::SendDogGif),
            "senddogbybreed" => Some(Self::SendDogByBreed),
            _ => None,
        }
    }
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(state: &AppState, ctx: SendContext, text: &str) -> anyhow::Result<()> {
    let Some(cmd) = BotCommand::parse(text) else {
        debug!(chat_id = ctx.chat_id.0, text, "ignoring unknown command");
        return Ok(());
    };

    match cmd {
        BotCommand::Hi => {
            state
                .messenger
                .send_text(ctx.chat_id, GREETING)
                .await
                .context("sending greeting")?;
        }
        BotCommand::SendDog => send_dog(state, ctx, ImageFilter::random()).await?,
        BotCommand::SendDogGif => send_dog(state, ctx, ImageFilter::gif()).await?,
        BotCommand::SendDogByBreed => {
            if state.catalog.is_empty() {
                state.messenger.send_text(ctx.chat_id, NO_BREEDS).await?;
                return Ok(());
            }
            let pager = BreedPager::new(new_seed(), state.cfg.breed_page_rows);
            state
                .messenger
                .send_inline_keyboard(
                    ctx.chat_id,
                    &pager.prompt(&state.catalog, 0),
                    pager.keyboard(&state.catalog, 0),
                )
                .await
                .context("sending breed keyboard")?;
            info!(chat_id = ctx.chat_id.0, "sent breed keyboard");
        }
    }
    Ok(())
}
