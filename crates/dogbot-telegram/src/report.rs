//! Operator error reports.

use serde::Serialize;
use tracing::{error, warn};

use dogbot_core::{domain::ChatId, messaging::port::DeliveryChannel};

pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Short notice shown to the user when a command fails.
pub const USER_FAILURE_NOTICE: &str = "Sorry, I couldn't fetch a dog right now. Please try again later.";

/// Render an update for a report, falling back to its debug form.
pub fn render_update<T: Serialize + std::fmt::Debug>(update: &T) -> String {
    serde_json::to_string_pretty(update).unwrap_or_else(|_| format!("{update:#?}"))
}

/// Cut `text` to at most `limit` characters, ending with the truncation marker
/// when anything was dropped.
pub fn truncate_report(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    let keep = limit.saturating_sub(marker_len);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Plain-text report: heading, the update, then the error with its causes.
pub fn format_error_report(update: &str, err: &anyhow::Error, limit: usize) -> String {
    let report = format!(
        "An error was raised while handling an update\n\nupdate = {update}\n\nerror = {err:?}"
    );
    truncate_report(&report, limit)
}

/// Log the failure and forward it to the operator, cut to `limit` characters
/// (never more than the channel accepts). Best-effort.
pub async fn notify_operator(
    messenger: &dyn DeliveryChannel,
    operator: ChatId,
    update: &str,
    err: &anyhow::Error,
    limit: usize,
) {
    error!(error = ?err, "error while handling an update");

    let limit = limit.min(messenger.capabilities().max_message_len);
    let text = format_error_report(update, err, limit);
    if let Err(e) = messenger.send_text(operator, &text).await {
        warn!(error = %e, "failed to send error report to operator");
    }
}
