//! Events emitted by the messaging-client boundary.
//!
//! The session manager consumes these over an mpsc channel, one at a time,
//! in arrival order.

use crate::types::{Jid, MessageId};
use std::fmt;
use std::time::SystemTime;

/// Events delivered from the client boundary to the session manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Pairing code for linking a device. Render as QR and show to the user.
    PairingCode(String),

    /// Connection established and authenticated.
    Open,

    /// Connection terminated.
    Closed(CloseReason),

    /// Inbound message (decrypted by the client library).
    Message(MessageEvent),
}

/// An inbound text message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub from: Jid,
    pub id: MessageId,
    pub timestamp: SystemTime,
    pub is_from_me: bool,
    /// Decoded text content.
    pub body: String,
}

/// Reason code for a connection close (maps to the server's connect failure codes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum CloseReason {
    Generic = 400,
    LoggedOut = 401,
    TempBanned = 402,
    MainDeviceGone = 403,
    ClientOutdated = 405,
    UnknownLogout = 406,
    InternalServerError = 500,
    ServiceUnavailable = 503,
}

impl CloseReason {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            400 => Some(Self::Generic),
            401 => Some(Self::LoggedOut),
            402 => Some(Self::TempBanned),
            403 => Some(Self::MainDeviceGone),
            405 => Some(Self::ClientOutdated),
            406 => Some(Self::UnknownLogout),
            500 => Some(Self::InternalServerError),
            503 => Some(Self::ServiceUnavailable),
            _ => None,
        }
    }

    /// Logout-class closes are terminal: the stored credentials are gone and
    /// reconnecting without re-pairing cannot succeed.
    pub fn is_logged_out(&self) -> bool {
        matches!(
            self,
            Self::LoggedOut | Self::MainDeviceGone | Self::UnknownLogout
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::LoggedOut => "logged out from another device",
            Self::TempBanned => "account temporarily banned",
            Self::MainDeviceGone => "primary device was logged out",
            Self::UnknownLogout => "logged out for unknown reason",
            Self::ClientOutdated => "client is out of date",
            Self::ServiceUnavailable => "service unavailable",
            _ => "connection failure",
        };
        write!(f, "{} (code {})", msg, *self as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_reason_from_code() {
        assert_eq!(CloseReason::from_code(401), Some(CloseReason::LoggedOut));
        assert_eq!(
            CloseReason::from_code(503),
            Some(CloseReason::ServiceUnavailable)
        );
        assert_eq!(CloseReason::from_code(999), None);
    }

    #[test]
    fn logout_classification() {
        assert!(CloseReason::LoggedOut.is_logged_out());
        assert!(CloseReason::MainDeviceGone.is_logged_out());
        assert!(CloseReason::UnknownLogout.is_logged_out());
        assert!(!CloseReason::ServiceUnavailable.is_logged_out());
        assert!(!CloseReason::Generic.is_logged_out());
    }
}
