use crate::observable::Observable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

/// Repeats of the same (message, kind) inside this window collapse into one
/// visible entry with a running count.
pub const AGGREGATION_WINDOW: Duration = Duration::from_millis(5000);

const ERROR_TTL: Duration = Duration::from_millis(5000);
const WARNING_TTL: Duration = Duration::from_millis(4000);
const INFO_TTL: Duration = Duration::from_millis(3000);
const SUCCESS_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    Error,
    Warning,
    Info,
    Success,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Success => "success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    /// None means the notification never auto-expires.
    pub ttl_ms: Option<u64>,
    pub occurrence_count: u32,
}

struct AggregationRecord {
    notification_id: String,
    last_seen: Instant,
    count: u32,
    window_timer: JoinHandle<()>,
    expiry_timer: Option<JoinHandle<()>>,
}

impl AggregationRecord {
    fn cancel_timers(&self) {
        self.window_timer.abort();
        if let Some(timer) = &self.expiry_timer {
            timer.abort();
        }
    }
}

#[derive(Default)]
struct Inner {
    notifications: Vec<Notification>,
    records: HashMap<String, AggregationRecord>,
}

/// Presents transient messages to the user, collapsing noisy repeats into a
/// single visible entry with a running count. Never fails; only presentation
/// state lives here.
#[derive(Clone)]
pub struct NotificationAggregator {
    inner: Arc<Mutex<Inner>>,
    visible: Arc<Observable<Vec<Notification>>>,
}

impl Default for NotificationAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationAggregator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            visible: Arc::new(Observable::new(Vec::new())),
        }
    }

    pub fn error(&self, message: &str) {
        self.show(message, NotificationKind::Error, Some(ERROR_TTL));
    }

    pub fn warning(&self, message: &str) {
        self.show(message, NotificationKind::Warning, Some(WARNING_TTL));
    }

    pub fn info(&self, message: &str) {
        self.show(message, NotificationKind::Info, Some(INFO_TTL));
    }

    pub fn success(&self, message: &str) {
        self.show(message, NotificationKind::Success, Some(SUCCESS_TTL));
    }

    /// Shows a notification. A `ttl` of `None` (or zero) means it stays until
    /// dismissed; otherwise it auto-expires after `ttl`, restarted on every
    /// in-window repeat. Must be called from within a tokio runtime.
    pub fn show(&self, message: &str, kind: NotificationKind, ttl: Option<Duration>) {
        let ttl = ttl.filter(|value| !value.is_zero());
        let key = aggregation_key(message, kind);
        let now = Instant::now();

        let mut inner = self.inner.lock().expect("aggregator lock");
        let in_window = inner
            .records
            .get(&key)
            .is_some_and(|record| now.duration_since(record.last_seen) <= AGGREGATION_WINDOW);

        if in_window {
            let record = inner.records.get_mut(&key).expect("record present");
            record.count += 1;
            record.last_seen = now;
            let count = record.count;
            let notification_id = record.notification_id.clone();

            record.window_timer.abort();
            record.window_timer = self.spawn_window_timer(key.clone());
            if let Some(timer) = record.expiry_timer.take() {
                timer.abort();
            }
            if let Some(ttl) = ttl {
                record.expiry_timer =
                    Some(self.spawn_expiry_timer(key, notification_id.clone(), ttl));
            }

            let display = displayed_message(message, count);
            if let Some(entry) = inner
                .notifications
                .iter_mut()
                .find(|candidate| candidate.id == notification_id)
            {
                entry.message = display;
                entry.created_at = Utc::now();
                entry.ttl_ms = ttl.map(|value| value.as_millis() as u64);
                entry.occurrence_count = count;
            }
        } else {
            let notification = Notification {
                id: Uuid::new_v4().to_string(),
                message: message.to_string(),
                kind,
                created_at: Utc::now(),
                ttl_ms: ttl.map(|value| value.as_millis() as u64),
                occurrence_count: 1,
            };
            let record = AggregationRecord {
                notification_id: notification.id.clone(),
                last_seen: now,
                count: 1,
                window_timer: self.spawn_window_timer(key.clone()),
                expiry_timer: ttl
                    .map(|ttl| self.spawn_expiry_timer(key.clone(), notification.id.clone(), ttl)),
            };
            // A stale record here means its window timer has not run yet; the
            // timer guards on last_seen, so dropping the handles detaches it
            // safely without touching the fresh record.
            inner.records.insert(key, record);
            inner.notifications.push(notification);
        }

        publish(&self.visible, &inner);
    }

    /// Removes one notification and its aggregation record. No-op when the id
    /// is unknown.
    pub fn dismiss(&self, id: &str) {
        let mut inner = self.inner.lock().expect("aggregator lock");
        inner.notifications.retain(|candidate| candidate.id != id);
        let key = inner
            .records
            .iter()
            .find(|(_, record)| record.notification_id == id)
            .map(|(key, _)| key.clone());
        if let Some(key) = key {
            if let Some(record) = inner.records.remove(&key) {
                record.cancel_timers();
            }
        }
        publish(&self.visible, &inner);
    }

    pub fn clear_all(&self) {
        let mut inner = self.inner.lock().expect("aggregator lock");
        for record in inner.records.values() {
            record.cancel_timers();
        }
        inner.records.clear();
        inner.notifications.clear();
        publish(&self.visible, &inner);
    }

    pub fn visible(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .expect("aggregator lock")
            .notifications
            .clone()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Vec<Notification>> {
        self.visible.subscribe()
    }

    /// Deletes the aggregation record once the window passes with no repeat.
    /// The visible notification is untouched; only its expiry timer (if any)
    /// removes it.
    fn spawn_window_timer(&self, key: String) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(AGGREGATION_WINDOW).await;
            let mut inner = inner.lock().expect("aggregator lock");
            let stale = inner
                .records
                .get(&key)
                .is_some_and(|record| record.last_seen.elapsed() >= AGGREGATION_WINDOW);
            if stale {
                // Dropping the record detaches its expiry timer rather than
                // cancelling it; the notification still expires on schedule.
                inner.records.remove(&key);
            }
        })
    }

    fn spawn_expiry_timer(
        &self,
        key: String,
        notification_id: String,
        ttl: Duration,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let visible = Arc::clone(&self.visible);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut inner = inner.lock().expect("aggregator lock");
            inner
                .notifications
                .retain(|candidate| candidate.id != notification_id);
            let owned = inner
                .records
                .get(&key)
                .is_some_and(|record| record.notification_id == notification_id);
            if owned {
                inner.records.remove(&key);
            }
            publish(&visible, &inner);
        })
    }
}

fn publish(visible: &Observable<Vec<Notification>>, inner: &Inner) {
    visible.set(inner.notifications.clone());
}

fn aggregation_key(message: &str, kind: NotificationKind) -> String {
    format!("{}|{}", message, kind.as_str())
}

fn displayed_message(message: &str, count: u32) -> String {
    if count > 1 {
        format!("{message} ({count})")
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationAggregator, NotificationKind};
    use tokio::time::Duration;

    fn ttl(ms: u64) -> Option<Duration> {
        Some(Duration::from_millis(ms))
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn repeats_within_window_collapse_into_one() {
        let aggregator = NotificationAggregator::new();

        aggregator.show("disk full", NotificationKind::Error, ttl(5000));
        advance(2000).await;
        aggregator.show("disk full", NotificationKind::Error, ttl(5000));
        advance(2000).await;
        aggregator.show("disk full", NotificationKind::Error, ttl(5000));
        advance(1).await;

        let visible = aggregator.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].occurrence_count, 3);
        assert_eq!(visible[0].message, "disk full (3)");
        assert_eq!(visible[0].kind, NotificationKind::Error);

        // ttl restarted at t=4000, so it auto-dismisses by t=9001.
        advance(5000).await;
        assert!(aggregator.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeats_outside_window_stay_separate() {
        let aggregator = NotificationAggregator::new();

        aggregator.show("sync failed", NotificationKind::Warning, None);
        advance(5001).await;
        aggregator.show("sync failed", NotificationKind::Warning, None);

        let visible = aggregator.visible();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|entry| entry.occurrence_count == 1));
        assert!(visible.iter().all(|entry| entry.message == "sync failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn same_message_different_kinds_never_merge() {
        let aggregator = NotificationAggregator::new();

        aggregator.show("scan done", NotificationKind::Error, None);
        aggregator.show("scan done", NotificationKind::Warning, None);

        let visible = aggregator.visible();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|entry| entry.occurrence_count == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_resets_the_aggregation_key() {
        let aggregator = NotificationAggregator::new();

        aggregator.show("offline", NotificationKind::Error, None);
        let first_id = aggregator.visible()[0].id.clone();
        aggregator.dismiss(&first_id);
        assert!(aggregator.visible().is_empty());

        aggregator.show("offline", NotificationKind::Error, None);
        let visible = aggregator.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].occurrence_count, 1);
        assert_ne!(visible[0].id, first_id);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_of_unknown_id_is_a_noop() {
        let aggregator = NotificationAggregator::new();
        aggregator.show("hello", NotificationKind::Info, None);
        aggregator.dismiss("missing-id");
        assert_eq!(aggregator.visible().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sticky_notifications_outlive_the_window() {
        let aggregator = NotificationAggregator::new();

        aggregator.show("update available", NotificationKind::Info, None);
        advance(60_000).await;
        assert_eq!(aggregator.visible().len(), 1);

        aggregator.clear_all();
        assert!(aggregator.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_means_sticky() {
        let aggregator = NotificationAggregator::new();
        aggregator.show("pinned", NotificationKind::Success, ttl(0));
        advance(60_000).await;
        assert_eq!(aggregator.visible().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_keeps_the_notification_visible() {
        let aggregator = NotificationAggregator::new();

        aggregator.show("slow disk", NotificationKind::Warning, ttl(8000));
        advance(6000).await;
        // Window closed at t=5000; the entry itself lives until t=8000.
        assert_eq!(aggregator.visible().len(), 1);

        // A repeat after the window starts a brand-new record.
        aggregator.show("slow disk", NotificationKind::Warning, ttl(8000));
        let visible = aggregator.visible();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|entry| entry.occurrence_count == 1));

        advance(2001).await;
        // First entry expired at t=8000; second lives until t=14000.
        assert_eq!(aggregator.visible().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_restarts_on_every_repeat() {
        let aggregator = NotificationAggregator::new();

        aggregator.show("retrying", NotificationKind::Info, ttl(3000));
        advance(2500).await;
        aggregator.show("retrying", NotificationKind::Info, ttl(3000));
        advance(2500).await;
        // Would have expired at t=3000 without the repeat.
        assert_eq!(aggregator.visible().len(), 1);
        assert_eq!(aggregator.visible()[0].occurrence_count, 2);

        advance(501).await;
        assert!(aggregator.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_all_cancels_pending_timers() {
        let aggregator = NotificationAggregator::new();

        aggregator.show("a", NotificationKind::Error, ttl(1000));
        aggregator.show("b", NotificationKind::Warning, ttl(1000));
        aggregator.clear_all();
        assert!(aggregator.visible().is_empty());

        advance(2000).await;
        assert!(aggregator.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn default_kind_ttls_apply() {
        let aggregator = NotificationAggregator::new();

        aggregator.error("boom");
        aggregator.info("fyi");
        assert_eq!(aggregator.visible().len(), 2);

        advance(3001).await;
        // info expires at 3000ms, error at 5000ms.
        let visible = aggregator.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].kind, NotificationKind::Error);

        advance(2000).await;
        assert!(aggregator.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn subscription_sees_updates() {
        let aggregator = NotificationAggregator::new();
        let mut receiver = aggregator.subscribe();

        aggregator.show("saved", NotificationKind::Success, None);
        receiver.changed().await.expect("aggregator alive");
        assert_eq!(receiver.borrow().len(), 1);
    }
}
