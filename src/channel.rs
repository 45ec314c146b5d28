use crossbeam_channel as cb;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SimError;

/// Opaque scalar payload carried over a classical channel. No type
/// negotiation takes place between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassicalValue {
    Int(i64),
    Real(f64),
    Str(String),
}

impl ClassicalValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ClassicalValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClassicalValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ClassicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassicalValue::Int(v) => write!(f, "{}", v),
            ClassicalValue::Real(v) => write!(f, "{}", v),
            ClassicalValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ClassicalValue {
    fn from(v: i64) -> Self {
        ClassicalValue::Int(v)
    }
}

impl From<f64> for ClassicalValue {
    fn from(v: f64) -> Self {
        ClassicalValue::Real(v)
    }
}

impl From<&str> for ClassicalValue {
    fn from(v: &str) -> Self {
        ClassicalValue::Str(v.to_string())
    }
}

impl From<String> for ClassicalValue {
    fn from(v: String) -> Self {
        ClassicalValue::Str(v)
    }
}

/// One endpoint of a reliable, ordered, point-to-point classical channel
/// between two named roles. Owned by exactly one role's runner; messages
/// are delivered exactly once, in send order.
pub struct ChannelEndpoint {
    local: String,
    remote: String,
    tx: cb::Sender<ClassicalValue>,
    rx: cb::Receiver<ClassicalValue>,
}

impl ChannelEndpoint {
    /// Queues a value for the remote role. Never blocks the sender; the
    /// underlying queue is unbounded and FIFO. Sending to a peer whose
    /// endpoint has been dropped (its role already exited) is logged and
    /// discarded, since nothing can receive it anymore.
    pub fn send(&self, value: impl Into<ClassicalValue>) {
        let value = value.into();
        if self.tx.send(value).is_err() {
            log::warn!(
                "channel {} -> {}: peer endpoint gone, message discarded",
                self.local,
                self.remote
            );
        }
    }

    /// Blocks the calling role until a value is available on this specific
    /// channel. An unmatched recv whose sender is still alive blocks
    /// indefinitely; pairing every recv with a send is a protocol design
    /// obligation, not something the channel enforces. If the sender's
    /// endpoint has been dropped without sending (the peer role failed),
    /// this returns a channel error instead of blocking forever.
    pub fn recv(&self) -> Result<ClassicalValue, SimError> {
        self.rx.recv().map_err(|_| {
            SimError::Channel(format!(
                "channel {} <- {}: peer endpoint gone before send",
                self.local, self.remote
            ))
        })
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }
}

/// Builds both endpoints of one a<->b channel. The first endpoint belongs
/// to role `a`, the second to role `b`.
pub fn channel_pair(a: &str, b: &str) -> (ChannelEndpoint, ChannelEndpoint) {
    let (a_tx, b_rx) = cb::unbounded();
    let (b_tx, a_rx) = cb::unbounded();

    let at_a = ChannelEndpoint {
        local: a.to_string(),
        remote: b.to_string(),
        tx: a_tx,
        rx: a_rx,
    };
    let at_b = ChannelEndpoint {
        local: b.to_string(),
        remote: a.to_string(),
        tx: b_tx,
        rx: b_rx,
    };
    (at_a, at_b)
}
