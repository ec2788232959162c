use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{delivery_log::DEFAULT_LOG_PATH, dog_api::DEFAULT_BASE_URL, errors::Error, Result};

const DEFAULT_CREDENTIALS_FILE: &str = "env.json";

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub telegram_bot_token: String,
    pub dog_api_key: String,
    pub developer_chat_id: i64,

    // Image catalog
    pub dog_api_base_url: String,
    pub request_timeout: Duration,

    // Persistence
    pub delivery_log_path: PathBuf,

    // Telegram limits
    pub telegram_message_limit: usize,
    pub breed_page_rows: usize,
}

/// Credential file as written for the bot: `{ "bot_token", "dog_api_key", "developer_chat_id" }`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Credentials {
    pub bot_token: Option<String>,
    pub dog_api_key: Option<String>,
    pub developer_chat_id: Option<serde_json::Value>,
}

impl Credentials {
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let creds_path = env_str("DOGBOT_CREDENTIALS_FILE")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string());
        let creds = Credentials::read(Path::new(&creds_path))?.unwrap_or_default();

        Self::from_sources(env_str, creds)
    }

    /// Build the config from an environment lookup and the credential file.
    /// Environment values win over the file.
    pub fn from_sources(env: impl Fn(&str) -> Option<String>, creds: Credentials) -> Result<Self> {
        let var = |key: &str| env(key).and_then(non_empty);

        let telegram_bot_token = var("TELEGRAM_BOT_TOKEN")
            .or(creds.bot_token.and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN (or bot_token) is required".to_string())
            })?;

        let dog_api_key = var("DOG_API_KEY")
            .or(creds.dog_api_key.and_then(non_empty))
            .ok_or_else(|| Error::Config("DOG_API_KEY (or dog_api_key) is required".to_string()))?;

        let developer_chat_id = match var("DEVELOPER_CHAT_ID") {
            Some(s) => parse_chat_id(&s),
            None => creds.developer_chat_id.as_ref().and_then(chat_id_from_json),
        }
        .ok_or_else(|| {
            Error::Config(
                "DEVELOPER_CHAT_ID (or developer_chat_id) is required and must be numeric"
                    .to_string(),
            )
        })?;

        let dog_api_base_url = var("DOG_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let request_timeout = Duration::from_secs(
            var("REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(30)
                .max(1),
        );

        let delivery_log_path =
            PathBuf::from(var("DELIVERY_LOG_PATH").unwrap_or_else(|| DEFAULT_LOG_PATH.to_string()));

        let telegram_message_limit = var("TELEGRAM_MESSAGE_LIMIT")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(4096)
            .max(100);
        let breed_page_rows = var("BREED_PAGE_ROWS")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(8)
            .clamp(1, 30);

        Ok(Self {
            telegram_bot_token,
            dog_api_key,
            developer_chat_id,
            dog_api_base_url,
            request_timeout,
            delivery_log_path,
            telegram_message_limit,
            breed_page_rows,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() || env::var_os(key).is_some() {
            continue;
        }

        let mut val = v.trim();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }

        env::set_var(key, val);
    }
}

fn parse_chat_id(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok()
}

fn chat_id_from_json(v: &serde_json::Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str().and_then(parse_chat_id)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
