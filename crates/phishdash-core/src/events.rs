//! Navigation and notice bus.
//!
//! The HTTP layer never drives the router directly. When the response
//! interceptor needs to send the user to the login view, or tell them
//! access was denied, it publishes an `AppEvent`; the router and the front
//! end subscribe and react.

use tokio::sync::broadcast;
use tracing::debug;

use crate::router::{Location, Route};

/// Events buffered per subscriber before the slowest one starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible, non-blocking message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn access_denied() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Access denied: you do not have permission to perform this action.",
        )
    }

    pub fn session_expired() -> Self {
        Self::new(
            NoticeLevel::Warning,
            "Your session has expired. Please log in again.",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Move the front end to a location (subject to the route guard)
    Navigate(Location),
    Notice(Notice),
}

/// Broadcast bus; clones share the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Publish to every current subscriber. Returns how many received it;
    /// zero subscribers is not an error.
    pub fn publish(&self, event: AppEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "No subscribers for event");
                0
            }
        }
    }

    pub fn navigate(&self, location: Location) -> usize {
        self.publish(AppEvent::Navigate(location))
    }

    /// Send the front end to the login view.
    pub fn navigate_to_login(&self) -> usize {
        self.navigate(Location::new(Route::Login))
    }

    pub fn notify(&self, notice: Notice) -> usize {
        self.publish(AppEvent::Notice(notice))
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain everything currently buffered on `rx` without waiting.
pub fn drain(rx: &mut broadcast::Receiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "Event receiver lagged");
            }
            Err(_) => break,
        }
    }
    events
}
