use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::info;

use dogbot_core::{
    config::Config,
    delivery_log::CsvDeliveryLog,
    dog_api::{BreedCatalog, DogApiClient},
    domain::ChatId,
    messaging::port::DeliveryChannel,
    request::RequestExecutor,
    sender::DogSender,
};

use crate::handlers;
use crate::TelegramMessenger;

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub sender: Arc<DogSender>,
    pub catalog: BreedCatalog,
    pub log: Arc<CsvDeliveryLog>,
    pub messenger: Arc<dyn DeliveryChannel>,
}

impl AppState {
    pub fn operator(&self) -> ChatId {
        self.sender.operator_chat()
    }
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let api = DogApiClient::new(
        RequestExecutor::reqwest(),
        cfg.dog_api_base_url.clone(),
        cfg.dog_api_key.clone(),
        cfg.request_timeout,
    );
    let catalog = api.fetch_breeds().await?;
    let log = Arc::new(CsvDeliveryLog::open(cfg.delivery_log_path.clone())?);
    let sender = Arc::new(DogSender::new(api, ChatId(cfg.developer_chat_id)));

    if let Ok(me) = bot.get_me().await {
        info!(username = %me.username(), "dogbot started");
    }
    info!(
        breeds = catalog.len(),
        log = %log.path().display(),
        logged_sends = log.len().await,
        "ready"
    );

    let messenger: Arc<dyn DeliveryChannel> = Arc::new(TelegramMessenger::new(bot.clone()));

    let state = Arc::new(AppState {
        cfg,
        sender,
        catalog,
        log,
        messenger,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
