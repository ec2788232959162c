//! Core logic for the dog image bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `DeliveryChannel` port and HTTP behind the `HttpTransport` seam, both
//! implemented outside of the send pipeline.

pub mod config;
pub mod delivery_log;
pub mod dog_api;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod request;
pub mod sender;

pub use errors::{Error, Result};
