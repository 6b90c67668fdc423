//! 连接状态机。
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//!      ^              |             |
//!      +--------------+-------------+   （连接丢失）
//! ```

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// 是否允许迁移到目标状态。
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        matches!(
            (self, next),
            (ConnectionState::Disconnected, ConnectionState::Connecting)
                | (ConnectionState::Connecting, ConnectionState::Connected)
                | (ConnectionState::Connecting, ConnectionState::Disconnected)
                | (ConnectionState::Connected, ConnectionState::Disconnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        write!(f, "{}", value)
    }
}

/// 通过 watch 通道发布的连接状态。
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    sender: Arc<watch::Sender<ConnectionState>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> ConnectionState {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.sender.subscribe()
    }

    /// 迁移到目标状态；非法迁移被忽略并返回 false。
    pub fn transition(&self, next: ConnectionState) -> bool {
        self.sender.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
