use std::sync::Arc;

use dogbot_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), dogbot_core::Error> {
    dogbot_core::logging::init("dogbot")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(
        api = %cfg.dog_api_base_url,
        log = %cfg.delivery_log_path.display(),
        "configuration loaded"
    );

    dogbot_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| dogbot_core::Error::External(format!("telegram bot failed: {e:#}")))?;

    Ok(())
}
