//! Fetch an image, deliver it, record it, tell the operator.

use tracing::{info, warn};

use crate::{
    delivery_log::{AppendableLog, DeliveryRecord},
    dog_api::{DogApiClient, ImageFilter},
    domain::{ChatId, SendContext},
    errors::Error,
    messaging::port::DeliveryChannel,
    Result,
};

/// How an image URL is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Animation,
}

impl MediaKind {
    /// `.gif` URLs are animations, everything else is a photo.
    ///
    /// Query strings and fragments are ignored and the extension match is
    /// case-insensitive.
    pub fn for_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.to_ascii_lowercase().ends_with(".gif") {
            MediaKind::Animation
        } else {
            MediaKind::Photo
        }
    }
}

/// Whether the delivery target is a group chat.
///
/// Fails when the context does not say what kind of chat it is.
pub fn resolve_is_group(ctx: &SendContext) -> Result<bool> {
    let kind = ctx
        .chat_type
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::MissingContext(format!("chat {} has no chat type", ctx.chat_id.0)))?;
    // Covers both "group" and "supergroup".
    Ok(kind.contains("group"))
}

pub fn operator_summary(is_group: bool) -> String {
    let target = if is_group { "a group" } else { "a single user" };
    format!("Sending a dog to {target}.")
}

/// The send pipeline. One call is one independent transaction; the only state
/// carried between calls lives in the log.
#[derive(Clone)]
pub struct DogSender {
    api: DogApiClient,
    operator_chat: ChatId,
}

impl DogSender {
    pub fn new(api: DogApiClient, operator_chat: ChatId) -> Self {
        Self { api, operator_chat }
    }

    pub fn operator_chat(&self) -> ChatId {
        self.operator_chat
    }

    /// Send one image matching `filter` to `ctx.chat_id` and record it.
    ///
    /// The record is appended only after the image was delivered. A failure
    /// to notify the operator is logged and does not fail the send.
    pub async fn send_image(
        &self,
        filter: &ImageFilter,
        ctx: &SendContext,
        deliver: &dyn DeliveryChannel,
        log: &dyn AppendableLog,
    ) -> Result<DeliveryRecord> {
        let url = self.api.search_image(filter).await?;
        let kind = MediaKind::for_url(&url);
        info!(chat_id = ctx.chat_id.0, url = %url, ?kind, breed = %filter.breed_label(), "delivering image");

        match kind {
            MediaKind::Animation => deliver.send_animation(ctx.chat_id, &url).await?,
            MediaKind::Photo => deliver.send_photo(ctx.chat_id, &url).await?,
        };

        let is_group = match resolve_is_group(ctx) {
            Ok(v) => v,
            Err(e) => {
                warn!(chat_id = ctx.chat_id.0, error = %e, "could not determine chat kind, assuming single user");
                false
            }
        };

        let record = DeliveryRecord::now(is_group, filter.breed_label(), filter.want_gif);
        log.append(record.clone()).await?;

        if let Err(e) = deliver
            .send_text(self.operator_chat, &operator_summary(is_group))
            .await
        {
            warn!(error = %e, "failed to notify operator of delivery");
        }

        Ok(record)
    }
}
