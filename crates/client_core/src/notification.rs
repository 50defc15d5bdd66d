use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Danger,
}

/// Fire-and-forget user-visible message. Delivery is best-effort; nothing in
/// the dispatch path depends on anyone listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: Option<String>,
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn success(title: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            title: title.map(str::to_string),
            message: message.into(),
            kind: NotificationKind::Success,
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            kind: NotificationKind::Danger,
        }
    }
}

/// Sink for notifications. Implementations must not panic: a store finishes
/// settling an action regardless of what happens to the message.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: Notification);
}

/// Default sink: fans notifications out to every subscriber over a broadcast
/// channel. Dropped or lagging subscribers are ignored.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl NotificationSink for BroadcastNotifier {
    fn publish(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

/// Sink that drops every message; for headless use.
pub struct SilentNotifier;

impl NotificationSink for SilentNotifier {
    fn publish(&self, _notification: Notification) {}
}
