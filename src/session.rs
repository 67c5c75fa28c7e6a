//! Session lifecycle manager.
//!
//! Owns the single active [`Session`] and its state machine:
//! idle → pairing → connected → closed. Transitions are driven by the
//! client boundary's event channel (processed one at a time, in arrival
//! order) plus the external [`SessionManager::initiate`] trigger.
//!
//! Reconnect policy: on a non-logout close the manager schedules one delayed
//! re-initiate with capped exponential backoff (base delay doubling per
//! attempt, capped at [`MAX_BACKOFF`]), up to the configured retry bound.
//! A logout close or an exhausted retry counter leaves the session closed
//! for good; recovery requires restarting the process.

use crate::client::{MessagingClient, SendReceipt};
use crate::config::Config;
use crate::error::ConnectionError;
use crate::events::{CloseReason, ConnectionEvent, MessageEvent};
use crate::types::Jid;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

/// Hook deciding the reply (if any) to an inbound message. Kept boxed so
/// the manager field is Send + Sync.
type ReplyHook = Box<dyn Fn(&MessageEvent) -> Option<String> + Send + Sync>;

/// Ceiling for the reconnect backoff.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Lifecycle state of the active session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Pairing,
    Connected,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Pairing => "pairing",
            Self::Connected => "connected",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// One logical connection attempt to the network. Exactly one is active
/// process-wide; creating a new one retires the previous.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    pub state: SessionState,
    pub pairing_code: Option<String>,
    pub retry_count: u32,
    pub created_at: SystemTime,
    /// Why the session closed, when it did.
    pub close_reason: Option<CloseReason>,
}

impl Session {
    fn new(retry_count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Pairing,
            pairing_code: None,
            retry_count,
            created_at: SystemTime::now(),
            close_reason: None,
        }
    }
}

/// Pure-read snapshot of the session state.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StatusSnapshot {
    pub state: SessionState,
    pub has_pairing_code: bool,
}

/// Owns the active session and serializes all state transitions.
pub struct SessionManager {
    client: Arc<dyn MessagingClient>,
    session: Mutex<Option<Session>>,
    /// Mirrors `state == Connected` for the gateway's lock-free readiness read.
    connected: AtomicBool,
    reply_hook: RwLock<Option<ReplyHook>>,
    max_retries: u32,
    base_delay: Duration,
}

impl SessionManager {
    pub fn new(client: Arc<dyn MessagingClient>, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            client,
            session: Mutex::new(None),
            connected: AtomicBool::new(false),
            reply_hook: RwLock::new(None),
            max_retries: config.max_retries,
            base_delay: config.reconnect_delay,
        })
    }

    /// Install the hook consulted for inbound messages. Returning `Some`
    /// sends that text back to the sender.
    pub async fn set_reply_hook<F>(&self, f: F)
    where
        F: Fn(&MessageEvent) -> Option<String> + Send + Sync + 'static,
    {
        *self.reply_hook.write().await = Some(Box::new(f));
    }

    /// Start a new session unless one is already pairing or connected.
    /// Idempotent; this is also what makes overlapping reconnects harmless.
    pub async fn initiate(self: &Arc<Self>) -> crate::Result<()> {
        self.begin(0).await
    }

    async fn begin(self: &Arc<Self>, retry_count: u32) -> crate::Result<()> {
        {
            let mut guard = self.session.lock().await;
            if let Some(s) = guard.as_ref() {
                if matches!(s.state, SessionState::Pairing | SessionState::Connected) {
                    tracing::debug!(state = %s.state, "initiate ignored, session already live");
                    return Ok(());
                }
            }
            let session = Session::new(retry_count);
            tracing::info!(session = %session.id, retry = retry_count, "starting session");
            *guard = Some(session);
        }
        self.client.start().await
    }

    /// Consume the client's event stream. Runs until the channel closes.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<ConnectionEvent>) {
        while let Some(evt) = rx.recv().await {
            match evt {
                ConnectionEvent::PairingCode(code) => self.on_pairing_code(code).await,
                ConnectionEvent::Open => self.on_open().await,
                ConnectionEvent::Closed(reason) => self.on_close(reason).await,
                ConnectionEvent::Message(msg) => self.on_message(msg).await,
            }
        }
    }

    /// Record a fresh pairing code. Ignored outside the pairing state.
    pub async fn on_pairing_code(&self, code: String) {
        let mut guard = self.session.lock().await;
        if let Some(s) = guard.as_mut() {
            if s.state == SessionState::Pairing {
                tracing::info!(session = %s.id, "pairing code received");
                s.pairing_code = Some(code);
            }
        }
    }

    /// Connection open: pairing done, ready to send.
    pub async fn on_open(&self) {
        let mut guard = self.session.lock().await;
        let s = guard.get_or_insert_with(|| Session::new(0));
        s.state = SessionState::Connected;
        s.pairing_code = None;
        s.retry_count = 0;
        s.close_reason = None;
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(session = %s.id, "connected");
    }

    /// Connection closed: apply the reconnect policy.
    pub async fn on_close(self: &Arc<Self>, reason: CloseReason) {
        let prev_retries = {
            let mut guard = self.session.lock().await;
            let Some(s) = guard.as_mut() else { return };
            if s.state == SessionState::Closed {
                return;
            }
            s.state = SessionState::Closed;
            s.pairing_code = None;
            s.close_reason = Some(reason);
            self.connected.store(false, Ordering::SeqCst);
            tracing::warn!(session = %s.id, %reason, "connection closed");
            s.retry_count
        };

        if reason.is_logged_out() {
            tracing::error!(%reason, "logged out, not reconnecting; re-pair after restart");
            if let Err(e) = self.client.close().await {
                tracing::warn!(error = %e, "client teardown failed");
            }
            return;
        }
        let attempt = prev_retries + 1;
        if attempt > self.max_retries {
            tracing::error!(
                retries = self.max_retries,
                "reconnect attempts exhausted, staying closed"
            );
            return;
        }

        let delay = self.backoff(attempt);
        tracing::info!(attempt, ?delay, "scheduling reconnect");
        let mgr = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = mgr.begin(attempt).await {
                tracing::error!(error = %e, "reconnect attempt failed");
            }
        });
    }

    /// Inbound message: consult the reply hook and answer the sender.
    /// Own messages are ignored.
    pub async fn on_message(&self, msg: MessageEvent) {
        if msg.is_from_me {
            return;
        }
        tracing::info!(from = %msg.from, preview_len = msg.body.len().min(50), "message received");
        let reply = {
            let hook = self.reply_hook.read().await;
            hook.as_ref().and_then(|f| f(&msg))
        };
        let Some(text) = reply else { return };
        if !self.is_connected() {
            return;
        }
        match self.client.send_text(&msg.from, &text).await {
            Ok(receipt) => tracing::debug!(to = %msg.from, id = %receipt.id, "auto-reply sent"),
            Err(e) => tracing::warn!(to = %msg.from, error = %e, "auto-reply failed"),
        }
    }

    /// Tear down the client connection and leave the session closed.
    /// Used on process shutdown; no reconnect is scheduled.
    pub async fn shutdown(&self) {
        {
            let mut guard = self.session.lock().await;
            if let Some(s) = guard.as_mut() {
                s.state = SessionState::Closed;
                s.pairing_code = None;
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        if let Err(e) = self.client.close().await {
            tracing::warn!(error = %e, "client teardown failed");
        }
    }

    /// Capped exponential backoff for the given attempt (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(MAX_BACKOFF)
    }

    /// Readiness flag consumed by the gateway. Lock-free.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Pure read of the current state; never blocks on the network.
    pub async fn status(&self) -> StatusSnapshot {
        let guard = self.session.lock().await;
        match guard.as_ref() {
            Some(s) => StatusSnapshot {
                state: s.state,
                has_pairing_code: s.pairing_code.is_some(),
            },
            None => StatusSnapshot {
                state: SessionState::Idle,
                has_pairing_code: false,
            },
        }
    }

    /// Current pairing code, or None when not pairing.
    pub async fn pairing_code(&self) -> Option<String> {
        let guard = self.session.lock().await;
        guard
            .as_ref()
            .filter(|s| s.state == SessionState::Pairing)
            .and_then(|s| s.pairing_code.clone())
    }

    /// Forward a message to the active session via the client boundary.
    /// A session that has closed reports its close reason rather than
    /// reaching the client.
    pub async fn deliver(&self, to: &Jid, body: &str) -> crate::Result<SendReceipt> {
        {
            let guard = self.session.lock().await;
            if let Some(s) = guard.as_ref() {
                if s.state == SessionState::Closed {
                    let err = match s.close_reason {
                        Some(r) if r.is_logged_out() => ConnectionError::LoggedOut,
                        Some(r) => ConnectionError::Closed(r),
                        None => ConnectionError::Disconnected,
                    };
                    return Err(err.into());
                }
            }
        }
        self.client.send_text(to, body).await
    }
}
