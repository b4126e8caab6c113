//! Test doubles for the engine's collaborators.

use crate::engine::Clock;
use crate::models::Poll;
use crate::notify::{DeliveryError, Notifier, UserProfile};
use crate::render::PollView;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Barrier;

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Records every outbound call. Message ids count up from 1000.
pub struct RecordingNotifier {
    next_message: AtomicU64,
    failing: AtomicBool,
    placeholder_barrier: Option<Barrier>,
    placeholders: Mutex<Vec<String>>,
    deleted: Mutex<Vec<(String, String)>>,
    published: Mutex<Vec<(String, PollView)>>,
    closed: Mutex<Vec<(String, PollView)>>,
    results: Mutex<Vec<(String, String, PollView)>>,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self {
            next_message: AtomicU64::new(1000),
            failing: AtomicBool::new(false),
            placeholder_barrier: None,
            placeholders: Mutex::default(),
            deleted: Mutex::default(),
            published: Mutex::default(),
            closed: Mutex::default(),
            results: Mutex::default(),
        }
    }
}

impl RecordingNotifier {
    /// Holds every placeholder send until `parties` of them are waiting, so
    /// that many creates are in flight at once.
    pub fn with_placeholder_barrier(parties: usize) -> Self {
        Self {
            placeholder_barrier: Some(Barrier::new(parties)),
            ..Self::default()
        }
    }

    /// Makes every later call fail with a delivery error.
    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn placeholders(&self) -> usize {
        self.placeholders.lock().unwrap().len()
    }

    /// `(channel_id, message_id)` of every deleted message.
    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<(String, PollView)> {
        self.published.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<(String, PollView)> {
        self.closed.lock().unwrap().clone()
    }

    pub fn results(&self) -> Vec<(String, String, PollView)> {
        self.results.lock().unwrap().clone()
    }

    /// Waits until at least `count` result messages went out.
    pub async fn wait_for_results(&self, count: usize) {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while self.results.lock().unwrap().len() < count {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for poll results");
    }

    fn check(&self) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::InvalidId {
                kind: "test",
                value: "failing".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_placeholder(&self, channel_id: &str) -> Result<String, DeliveryError> {
        if let Some(barrier) = &self.placeholder_barrier {
            barrier.wait().await;
        }
        self.check()?;
        self.placeholders.lock().unwrap().push(channel_id.to_string());
        Ok(self.next_message.fetch_add(1, Ordering::SeqCst).to_string())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), DeliveryError> {
        self.check()?;
        self.deleted
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(())
    }

    async fn publish_poll(&self, poll: &Poll, view: &PollView) -> Result<(), DeliveryError> {
        self.check()?;
        self.published.lock().unwrap().push((poll.id.clone(), view.clone()));
        Ok(())
    }

    async fn close_poll(&self, poll: &Poll, view: &PollView) -> Result<(), DeliveryError> {
        self.check()?;
        self.closed.lock().unwrap().push((poll.id.clone(), view.clone()));
        Ok(())
    }

    async fn send_results(&self, user_id: &str, content: &str, view: &PollView) -> Result<(), DeliveryError> {
        self.check()?;
        self.results
            .lock()
            .unwrap()
            .push((user_id.to_string(), content.to_string(), view.clone()));
        Ok(())
    }

    async fn user_profile(&self, user_id: &str) -> Result<UserProfile, DeliveryError> {
        self.check()?;
        Ok(UserProfile {
            name: format!("user-{user_id}"),
            avatar_url: None,
        })
    }

    async fn guild_name(&self, guild_id: &str) -> Result<String, DeliveryError> {
        self.check()?;
        Ok(format!("Guild {guild_id}"))
    }
}
