//! Session state machine.

use std::fmt;

use showtime_core::types::EventId;

/// Where a connection is in its lifecycle.
///
/// `Connected → Subscribed(event) → Disconnected`. Subscribing again moves
/// between events; `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, watching nothing.
    Connected,
    /// Watching one event.
    Subscribed(EventId),
    /// Ended. A new connection is needed.
    Disconnected,
}

impl SessionState {
    /// The watched event, if any.
    pub fn event_id(&self) -> Option<EventId> {
        match self {
            Self::Subscribed(event_id) => Some(*event_id),
            _ => None,
        }
    }

    /// Whether the session has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::Subscribed(event_id) => write!(f, "subscribed:{event_id}"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}
