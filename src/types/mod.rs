//! Core types.

mod jid;

pub use jid::{Jid, JidParseError, DEFAULT_USER_SERVER, GROUP_SERVER};

/// Message ID (client-generated, `3EB0` + hex).
pub type MessageId = String;
