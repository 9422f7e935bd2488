//! In-app notification feed.
//!
//! Producers send [`FeedEvent`]s over an unbounded channel; the owner of the
//! [`NotificationFeed`] drains and applies them between user actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::onboard::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Notification {
    /// Locally generated notification, unread and stamped now.
    pub fn system(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            id: format!("system-{}", uuid::Uuid::new_v4()),
            title: title.into(),
            message: message.into(),
            kind,
            read: false,
            timestamp: Utc::now(),
            user_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Starting a fresh connection; drops whatever was shown before
    Connecting,
    Connected,
    ConnectFailed(String),
    Disconnected,
    /// Upsert by id
    Received(Notification),
    History(Vec<Notification>),
    MarkRead(String),
    MarkAllRead,
    System {
        title: String,
        message: String,
        kind: NotificationKind,
    },
    Clear,
}

/// Session messages surface in the feed as system notifications
impl From<&Message> for FeedEvent {
    fn from(message: &Message) -> Self {
        let (title, kind) = if message.is_error {
            ("Error", NotificationKind::Error)
        } else {
            ("Update", NotificationKind::Info)
        };
        FeedEvent::System {
            title: title.to_string(),
            message: message.text.clone(),
            kind,
        }
    }
}

pub type FeedSender = mpsc::UnboundedSender<FeedEvent>;
pub type FeedReceiver = mpsc::UnboundedReceiver<FeedEvent>;

pub fn channel() -> (FeedSender, FeedReceiver) {
    mpsc::unbounded_channel()
}

/// Notifications newest first, plus connection state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFeed {
    notifications: Vec<Notification>,
    connected: bool,
    loading: bool,
    error: Option<String>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().filter(|n| !n.read)
    }

    pub fn unread_count(&self) -> usize {
        self.unread().count()
    }

    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connecting => {
                *self = Self {
                    loading: true,
                    ..Self::default()
                };
            }
            FeedEvent::Connected => {
                self.connected = true;
                self.loading = false;
                self.error = None;
            }
            FeedEvent::ConnectFailed(error) => {
                self.connected = false;
                self.loading = false;
                self.error = Some(error);
            }
            FeedEvent::Disconnected => {
                self.connected = false;
                self.notifications.clear();
            }
            FeedEvent::Received(notification) => {
                match self.notifications.iter_mut().find(|n| n.id == notification.id) {
                    Some(existing) => *existing = notification,
                    None => self.notifications.insert(0, notification),
                }
            }
            FeedEvent::History(notifications) => self.notifications = notifications,
            FeedEvent::MarkRead(id) => {
                if let Some(n) = self.notifications.iter_mut().find(|n| n.id == id) {
                    n.read = true;
                }
            }
            FeedEvent::MarkAllRead => {
                for n in &mut self.notifications {
                    n.read = true;
                }
            }
            FeedEvent::System {
                title,
                message,
                kind,
            } => {
                self.notifications
                    .insert(0, Notification::system(title, message, kind));
            }
            FeedEvent::Clear => self.notifications.clear(),
        }
    }

    /// Apply everything currently queued without waiting. Returns how many events were applied.
    pub fn drain(&mut self, rx: &mut FeedReceiver) -> usize {
        let mut applied = 0;
        while let Ok(event) = rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        if applied > 0 {
            debug!("Applied {applied} feed events");
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, message: &str) -> Notification {
        Notification {
            id: id.into(),
            title: "Progress".into(),
            message: message.into(),
            kind: NotificationKind::Info,
            read: false,
            timestamp: Utc::now(),
            user_id: Some("u1".into()),
        }
    }

    #[test]
    fn received_upserts_by_id() {
        let mut feed = NotificationFeed::new();
        feed.apply(FeedEvent::Received(note("a", "10%")));
        feed.apply(FeedEvent::Received(note("b", "hello")));
        feed.apply(FeedEvent::Received(note("a", "50%")));

        let ids: Vec<&str> = feed.notifications().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(feed.notifications()[1].message, "50%");
    }

    #[test]
    fn read_tracking() {
        let mut feed = NotificationFeed::new();
        feed.apply(FeedEvent::History(vec![note("a", "x"), note("b", "y")]));
        assert_eq!(feed.unread_count(), 2);

        feed.apply(FeedEvent::MarkRead("a".into()));
        assert_eq!(feed.unread_count(), 1);
        feed.apply(FeedEvent::MarkRead("missing".into()));
        assert_eq!(feed.unread_count(), 1);

        feed.apply(FeedEvent::MarkAllRead);
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn system_notifications_are_prepended_unread() {
        let mut feed = NotificationFeed::new();
        feed.apply(FeedEvent::Received(note("a", "x")));
        feed.apply(FeedEvent::System {
            title: "Profile completed".into(),
            message: "Done".into(),
            kind: NotificationKind::Success,
        });

        let first = &feed.notifications()[0];
        assert!(first.id.starts_with("system-"));
        assert!(!first.read);
        assert_eq!(first.kind, NotificationKind::Success);
    }

    #[test]
    fn session_messages_become_system_notifications() {
        let mut feed = NotificationFeed::new();
        feed.apply(FeedEvent::from(&Message {
            text: "Progress saved".into(),
            is_error: false,
        }));
        feed.apply(FeedEvent::from(&Message {
            text: "store unavailable: timeout".into(),
            is_error: true,
        }));

        let [error, info] = feed.notifications() else {
            panic!("expected two notifications");
        };
        assert_eq!(error.kind, NotificationKind::Error);
        assert_eq!(error.message, "store unavailable: timeout");
        assert_eq!(info.kind, NotificationKind::Info);
        assert_eq!(info.title, "Update");
        assert_eq!(feed.unread_count(), 2);
    }

    #[test]
    fn connection_lifecycle() {
        let mut feed = NotificationFeed::new();
        feed.apply(FeedEvent::Received(note("a", "stale")));
        feed.apply(FeedEvent::Connecting);
        assert!(feed.is_loading());
        assert!(feed.notifications().is_empty());

        feed.apply(FeedEvent::ConnectFailed("refused".into()));
        assert_eq!(feed.error(), Some("refused"));
        assert!(!feed.is_loading());

        feed.apply(FeedEvent::Connected);
        assert!(feed.is_connected());
        assert!(feed.error().is_none());

        feed.apply(FeedEvent::Received(note("b", "x")));
        feed.apply(FeedEvent::Disconnected);
        assert!(!feed.is_connected());
        assert!(feed.notifications().is_empty());
    }

    #[test]
    fn wire_shape_uses_type_key() {
        let json = serde_json::to_value(note("a", "x")).unwrap();
        assert_eq!(json["type"], "info");
        assert_eq!(json["userId"], "u1");
    }

    #[tokio::test]
    async fn drain_applies_queued_events() {
        let (tx, mut rx) = channel();
        tx.send(FeedEvent::Received(note("a", "x"))).unwrap();
        tx.send(FeedEvent::Clear).unwrap();
        tx.send(FeedEvent::Received(note("b", "y"))).unwrap();

        let mut feed = NotificationFeed::new();
        assert_eq!(feed.drain(&mut rx), 3);
        assert_eq!(feed.notifications().len(), 1);
        assert_eq!(feed.drain(&mut rx), 0);
    }
}
