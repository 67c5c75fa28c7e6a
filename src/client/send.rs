//! Delivery receipt types.

use crate::types::{Jid, MessageId};
use std::time::SystemTime;

/// Receipt returned by the client boundary for a delivered message.
#[derive(Clone, Debug)]
pub struct SendReceipt {
    pub id: MessageId,
    pub timestamp: SystemTime,
    pub sender: Option<Jid>,
}
