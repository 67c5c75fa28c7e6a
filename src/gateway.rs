//! Outbound message gateway.
//!
//! Validates and normalizes a send request, derives the destination JID,
//! and forwards it to the active session with a bounded wait.

use crate::error::SendError;
use crate::session::SessionManager;
use crate::types::{Jid, MessageId};
use std::sync::Arc;
use std::time::Duration;

/// Maximum body length. Longer input is truncated, not rejected.
pub const MAX_BODY_LEN: usize = 1000;

/// A bare national number is exactly this many digits; anything shorter is
/// rejected, anything longer is assumed to already carry a country code.
const NATIONAL_NUMBER_LEN: usize = 10;

/// Length of the body preview written to the log.
const LOG_PREVIEW_LEN: usize = 30;

/// Successful delivery, echoed back to the caller.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Normalized destination number (digits only, country code applied).
    pub to: String,
    pub id: MessageId,
}

/// Gateway for outbound text messages.
pub struct OutboundGateway {
    session: Arc<SessionManager>,
    country_code: String,
    send_timeout: Duration,
}

impl OutboundGateway {
    pub fn new(session: Arc<SessionManager>, country_code: String, send_timeout: Duration) -> Self {
        Self {
            session,
            country_code,
            send_timeout,
        }
    }

    /// Validate, normalize and deliver one message.
    ///
    /// Readiness is checked before any delivery call; a session that closes
    /// between the check and the send surfaces as a delivery error or
    /// timeout, never as corrupted state.
    pub async fn send(&self, destination: &str, body: &str) -> Result<Delivery, SendError> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(SendError::InvalidInput("phone number is required".into()));
        }
        let body = body.trim();
        if body.is_empty() {
            return Err(SendError::InvalidInput("message is required".into()));
        }
        if !self.session.is_connected() {
            return Err(SendError::NotReady);
        }

        let number = normalize_destination(destination, &self.country_code)?;
        let jid = Jid::user_jid(number.clone());
        let body = truncate_body(body);

        let receipt = tokio::time::timeout(self.send_timeout, self.session.deliver(&jid, body))
            .await
            .map_err(|_| SendError::Timeout)?
            .map_err(|e| SendError::Delivery(e.to_string()))?;

        // Log the destination and a preview only, never the full body.
        tracing::info!(
            to = %jid,
            id = %receipt.id,
            preview = %preview(body),
            "message sent"
        );
        Ok(Delivery {
            to: number,
            id: receipt.id,
        })
    }
}

/// Strip non-digits and apply the country-code prefix to bare 10-digit numbers.
pub fn normalize_destination(raw: &str, country_code: &str) -> Result<String, SendError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < NATIONAL_NUMBER_LEN {
        return Err(SendError::InvalidInput(format!(
            "phone number must have at least {NATIONAL_NUMBER_LEN} digits"
        )));
    }
    if digits.len() == NATIONAL_NUMBER_LEN {
        Ok(format!("{country_code}{digits}"))
    } else {
        Ok(digits)
    }
}

/// Cap the body at [`MAX_BODY_LEN`], respecting char boundaries.
fn truncate_body(body: &str) -> &str {
    if body.len() <= MAX_BODY_LEN {
        return body;
    }
    let mut end = MAX_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(LOG_PREVIEW_LEN);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MessagingClient, SendReceipt};
    use crate::config::Config;
    use crate::session::SessionManager;
    use std::sync::Mutex;
    use std::time::SystemTime;

    /// Recording mock; optionally never resolves a send.
    struct MockClient {
        sends: Mutex<Vec<(Jid, String)>>,
        hang: bool,
    }

    impl MockClient {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sends: Mutex::new(Vec::new()),
                hang: false,
            })
        }

        fn hanging() -> Arc<Self> {
            Arc::new(Self {
                sends: Mutex::new(Vec::new()),
                hang: true,
            })
        }

        fn sends(&self) -> Vec<(Jid, String)> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl MessagingClient for MockClient {
        async fn start(&self) -> crate::Result<()> {
            Ok(())
        }

        async fn send_text(&self, to: &Jid, body: &str) -> crate::Result<SendReceipt> {
            self.sends.lock().unwrap().push((to.clone(), body.to_string()));
            if self.hang {
                futures::future::pending::<()>().await;
            }
            Ok(SendReceipt {
                id: "3EB0TEST".to_string(),
                timestamp: SystemTime::now(),
                sender: None,
            })
        }

        async fn close(&self) -> crate::Result<()> {
            Ok(())
        }
    }

    async fn connected_gateway(client: Arc<MockClient>) -> OutboundGateway {
        let mgr = SessionManager::new(client, &Config::default());
        mgr.initiate().await.unwrap();
        mgr.on_open().await;
        OutboundGateway::new(mgr, "91".to_string(), Duration::from_millis(100))
    }

    #[test]
    fn normalize_strips_punctuation_and_prefixes() {
        assert_eq!(
            normalize_destination("98765-43210", "91").unwrap(),
            "919876543210"
        );
        assert_eq!(
            normalize_destination("(987) 654-3210", "91").unwrap(),
            "919876543210"
        );
    }

    #[test]
    fn normalize_keeps_existing_country_code() {
        assert_eq!(
            normalize_destination("+91 98765 43210", "91").unwrap(),
            "919876543210"
        );
        assert_eq!(
            normalize_destination("14155550123", "91").unwrap(),
            "14155550123"
        );
    }

    #[test]
    fn normalize_rejects_short_numbers() {
        assert!(matches!(
            normalize_destination("12345", "91"),
            Err(SendError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize_destination("abc", "91"),
            Err(SendError::InvalidInput(_))
        ));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(MAX_BODY_LEN);
        let cut = truncate_body(&long);
        assert!(cut.len() <= MAX_BODY_LEN);
        assert!(long.starts_with(cut));
    }

    #[tokio::test]
    async fn send_happy_path() {
        let client = MockClient::new();
        let gw = connected_gateway(client.clone()).await;

        let delivery = gw.send("98765-43210", "hello").await.unwrap();
        assert_eq!(delivery.to, "919876543210");
        assert!(delivery.id.starts_with("3EB0"));

        let sends = client.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0.to_string(), "919876543210@s.whatsapp.net");
        assert_eq!(sends[0].1, "hello");
    }

    #[tokio::test]
    async fn send_rejects_empty_inputs_without_delivery() {
        let client = MockClient::new();
        let gw = connected_gateway(client.clone()).await;

        for (phone, message) in [("", "hi"), ("   ", "hi"), ("9876543210", ""), ("9876543210", "  ")] {
            let err = gw.send(phone, message).await.unwrap_err();
            assert!(matches!(err, SendError::InvalidInput(_)), "{phone:?}/{message:?}");
        }
        assert!(client.sends().is_empty());
    }

    #[tokio::test]
    async fn send_rejects_short_destination_without_delivery() {
        let client = MockClient::new();
        let gw = connected_gateway(client.clone()).await;

        let err = gw.send("12345", "hi").await.unwrap_err();
        assert!(matches!(err, SendError::InvalidInput(_)));
        assert!(client.sends().is_empty());
    }

    #[tokio::test]
    async fn send_not_ready_when_idle() {
        let client = MockClient::new();
        let mgr = SessionManager::new(client.clone(), &Config::default());
        let gw = OutboundGateway::new(mgr, "91".to_string(), Duration::from_millis(100));

        let err = gw.send("9876543210", "hi").await.unwrap_err();
        assert!(matches!(err, SendError::NotReady));
        assert!(client.sends().is_empty());
    }

    #[tokio::test]
    async fn send_not_ready_while_pairing() {
        let client = MockClient::new();
        let mgr = SessionManager::new(client.clone(), &Config::default());
        mgr.initiate().await.unwrap();
        let gw = OutboundGateway::new(mgr, "91".to_string(), Duration::from_millis(100));

        let err = gw.send("9876543210", "hi").await.unwrap_err();
        assert!(matches!(err, SendError::NotReady));
        assert!(client.sends().is_empty());
    }

    #[tokio::test]
    async fn send_truncates_overlength_body() {
        let client = MockClient::new();
        let gw = connected_gateway(client.clone()).await;

        let long = "a".repeat(MAX_BODY_LEN + 500);
        gw.send("9876543210", &long).await.unwrap();

        let sends = client.sends();
        assert_eq!(sends[0].1.len(), MAX_BODY_LEN);
    }

    #[tokio::test]
    async fn send_times_out_when_delivery_hangs() {
        let client = MockClient::hanging();
        let gw = connected_gateway(client.clone()).await;

        let err = gw.send("9876543210", "hi").await.unwrap_err();
        assert!(matches!(err, SendError::Timeout));
        // The delivery call was made; it just never resolved.
        assert_eq!(client.sends().len(), 1);
    }
}
