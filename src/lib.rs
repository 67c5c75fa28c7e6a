//! # wa-gateway
//!
//! HTTP gateway around a WhatsApp web multidevice session.
//!
//! The crate owns the session lifecycle (idle → pairing → connected →
//! closed) with bounded auto-reconnect, surfaces the pairing QR code, and
//! relays outbound text messages with validation, number normalization and
//! a delivery deadline. The pairing cryptography and wire protocol are an
//! opaque boundary behind [`client::MessagingClient`].
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wa_gateway::{client::WaClient, config::Config, session::SessionManager, store::MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let (client, events) = WaClient::new(Arc::new(MemoryStore::new()));
//!     let session = SessionManager::new(client, &config);
//!     tokio::spawn(Arc::clone(&session).run(events));
//!     session.initiate().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod http;
pub mod session;
pub mod store;
pub mod types;

pub use client::{MessagingClient, SendReceipt, WaClient};
pub use config::Config;
pub use error::{Error, Result, SendError};
pub use events::{CloseReason, ConnectionEvent, MessageEvent};
pub use gateway::{Delivery, OutboundGateway};
pub use session::{SessionManager, SessionState, StatusSnapshot};
pub use store::{CredentialStore, Credentials, FileStore, MemoryStore};
pub use types::{Jid, MessageId};
