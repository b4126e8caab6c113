//! Poll lifecycle: creation, voting, expiry and finalization.
//!
//! The store is the only source of truth for poll state. The engine keeps
//! nothing in memory except the abort handles of pending expiry timers, and
//! every path that ends a poll goes through [`PollEngine::finalize`], which
//! relies on the store's read-and-delete to run at most once per poll.

pub mod clock;
pub mod duration;
pub mod error;

use crate::db::{Database, StoreError};
use crate::models::{CreatePollRequest, Poll, new_poll_id};
use crate::notify::{Notifier, UserProfile};
use crate::render::PollView;
use crate::voting::calculate_results;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::AbortHandle;

pub use clock::{Clock, SystemClock};
pub use error::PollError;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 5;
pub const MAX_OPTION_CHARS: usize = 80;
pub const DEFAULT_DURATION_HOURS: i64 = 1;
pub const MAX_DURATION_HOURS: i64 = 24;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoverySummary {
    pub finalized: usize,
    pub scheduled: usize,
}

pub struct PollEngine {
    database: Arc<Database>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    timers: Mutex<HashMap<String, AbortHandle>>,
}

impl PollEngine {
    pub fn new(database: Arc<Database>, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            database,
            notifier,
            clock,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Validates the request, stores the poll, publishes it and arms its expiry.
    pub async fn create_poll(self: &Arc<Self>, request: CreatePollRequest) -> Result<Poll, PollError> {
        match self
            .database
            .get_poll_by_creator(&request.creator_id, &request.guild_id)
            .await
        {
            Ok(existing) => {
                debug!("Creator {} already runs poll {}", request.creator_id, existing.id);
                return Err(PollError::DuplicateActivePoll);
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        validate_options(&request.options)?;
        let duration = validate_duration(request.duration.as_deref().unwrap_or(""))?;

        let message_id = self.notifier.send_placeholder(&request.channel_id).await?;
        let created_time = self.clock.now().trunc_subsecs(3);
        let poll = Poll::new(new_poll_id(), request, message_id, created_time, duration);

        if let Err(e) = self.database.create_poll(&poll).await {
            // The placeholder would otherwise linger with no poll behind it.
            if let Err(delete_err) = self
                .notifier
                .delete_message(&poll.channel_id, &poll.message_id)
                .await
            {
                warn!(
                    "Failed to delete placeholder {} in channel {}: {}",
                    poll.message_id, poll.channel_id, delete_err
                );
            }
            return Err(e.into());
        }
        info!(
            "Created poll {} in guild {} by {} ({} options, ends {})",
            poll.id,
            poll.guild_id,
            poll.creator_id,
            poll.options.len(),
            poll.end_time.to_rfc3339()
        );

        let view = self.render_active(&poll).await;
        if let Err(e) = self.notifier.publish_poll(&poll, &view).await {
            error!("Failed to publish poll {}: {}", poll.id, e);
        }

        self.schedule_expiry(poll.id.clone(), poll.end_time);
        Ok(poll)
    }

    /// Moves the user's ballot to `option`. Returns the poll as stored afterwards.
    pub async fn apply_vote(&self, poll_id: &str, user_id: &str, option: usize) -> Result<Poll, PollError> {
        let poll = self
            .database
            .apply_vote(poll_id, user_id, option, self.clock.now())
            .await?;
        debug!("User {} voted for option {} in poll {}", user_id, option, poll_id);
        Ok(poll)
    }

    /// Ends the poll and delivers its results.
    ///
    /// Returns `None` when the poll is already gone, which is what every
    /// caller but the first sees when a timer, the sweep and recovery race.
    pub async fn finalize(&self, poll_id: &str) -> Result<Option<Poll>, PollError> {
        let poll = match self.database.end_poll(poll_id).await {
            Ok(poll) => poll,
            Err(StoreError::NotFound) => {
                debug!("Poll {} was already finalized", poll_id);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let results = calculate_results(&poll);
        info!(
            "Poll {} ended with {} vote(s) across {} options",
            poll.id,
            results.total_votes,
            poll.options.len()
        );

        let creator = self.creator_profile(&poll.creator_id).await;
        let ended = PollView::ended(&poll, creator.as_ref());
        if let Err(e) = self.notifier.close_poll(&poll, &ended).await {
            error!("Failed to update message for ended poll {}: {}", poll.id, e);
        }

        let content = match self.notifier.guild_name(&poll.guild_id).await {
            Ok(name) => format!("The results for your poll in {} are available below.", name),
            Err(e) => {
                warn!("Failed to resolve guild {} for poll {}: {}", poll.guild_id, poll.id, e);
                "The results for your poll are available below.".to_string()
            }
        };
        if let Err(e) = self
            .notifier
            .send_results(&poll.creator_id, &content, &PollView::results(&poll))
            .await
        {
            error!("Failed to send results of poll {} to {}: {}", poll.id, poll.creator_id, e);
        }

        Ok(Some(poll))
    }

    /// Ends the creator's running poll in this guild ahead of schedule.
    pub async fn end_poll(&self, creator_id: &str, guild_id: &str) -> Result<Poll, PollError> {
        let poll = self.database.get_poll_by_creator(creator_id, guild_id).await?;
        self.cancel_expiry(&poll.id);
        info!("Creator {} ended poll {} early", creator_id, poll.id);
        self.finalize(&poll.id).await?.ok_or(PollError::NotFound)
    }

    /// Startup pass over stored polls: finalize the overdue ones, re-arm the rest.
    pub async fn recover(self: &Arc<Self>) -> Result<RecoverySummary, PollError> {
        let now = self.clock.now();
        let mut summary = RecoverySummary::default();

        for poll in self.database.list_polls().await? {
            if poll.has_ended(now) {
                match self.finalize(&poll.id).await {
                    Ok(Some(_)) => summary.finalized += 1,
                    Ok(None) => {}
                    Err(e) => error!("Failed to finalize overdue poll {}: {}", poll.id, e),
                }
            } else {
                self.schedule_expiry(poll.id.clone(), poll.end_time);
                summary.scheduled += 1;
            }
        }

        info!(
            "Recovered polls: {} finalized, {} rescheduled",
            summary.finalized, summary.scheduled
        );
        Ok(summary)
    }

    /// Finalizes every stored poll that is past its end time. Returns how
    /// many this call actually ended.
    pub async fn sweep(&self) -> Result<usize, PollError> {
        let due = self.database.due_poll_ids(self.clock.now()).await?;
        let mut finalized = 0;

        for poll_id in due {
            self.cancel_expiry(&poll_id);
            match self.finalize(&poll_id).await {
                Ok(Some(_)) => finalized += 1,
                Ok(None) => {}
                Err(e) => error!("Failed to finalize expired poll {}: {}", poll_id, e),
            }
        }
        Ok(finalized)
    }

    /// The active view of the poll as currently stored, or `None` once it
    /// is past its end time or already finalized.
    pub async fn live_view(&self, poll_id: &str) -> Result<Option<PollView>, PollError> {
        let poll = match self.database.get_poll(poll_id).await {
            Ok(poll) => poll,
            Err(StoreError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if poll.has_ended(self.clock.now()) {
            return Ok(None);
        }
        Ok(Some(self.render_active(&poll).await))
    }

    /// The live view of a poll, with the creator's name when it resolves.
    pub async fn render_active(&self, poll: &Poll) -> PollView {
        let creator = self.creator_profile(&poll.creator_id).await;
        PollView::active(poll, creator.as_ref())
    }

    /// Arms a one-shot timer that finalizes the poll at `end_time`, or right
    /// away if that has already passed. Replaces any timer already armed for
    /// the poll.
    pub fn schedule_expiry(self: &Arc<Self>, poll_id: String, end_time: DateTime<Utc>) {
        let engine = Arc::clone(self);
        let id = poll_id.clone();

        // Held across the spawn so the task cannot forget itself before it is recorded.
        let mut timers = self.timers();
        let handle = tokio::spawn(async move {
            let wait = (end_time - engine.clock.now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            engine.timers().remove(&id);
            if let Err(e) = engine.finalize(&id).await {
                error!("Scheduled finalization of poll {} failed: {}", id, e);
            }
        });

        if let Some(previous) = timers.insert(poll_id, handle.abort_handle()) {
            previous.abort();
        }
    }

    fn cancel_expiry(&self, poll_id: &str) {
        if let Some(handle) = self.timers().remove(poll_id) {
            debug!("Cancelled expiry timer for poll {}", poll_id);
            handle.abort();
        }
    }

    pub fn pending_expiries(&self) -> usize {
        self.timers().len()
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<String, AbortHandle>> {
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn creator_profile(&self, user_id: &str) -> Option<UserProfile> {
        match self.notifier.user_profile(user_id).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Failed to look up user {}: {}", user_id, e);
                None
            }
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), PollError> {
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
        return Err(PollError::WrongOptionCount {
            min: MIN_OPTIONS,
            max: MAX_OPTIONS,
            got: options.len(),
        });
    }
    if let Some(position) = options.iter().position(|o| o.chars().count() > MAX_OPTION_CHARS) {
        return Err(PollError::OptionTooLong {
            position: position + 1,
            max: MAX_OPTION_CHARS,
        });
    }
    Ok(())
}

fn validate_duration(input: &str) -> Result<Duration, PollError> {
    let duration = duration::parse_duration(input, Duration::hours(DEFAULT_DURATION_HOURS))
        .map_err(|e| PollError::InvalidDuration(e.to_string()))?;
    if duration > Duration::hours(MAX_DURATION_HOURS) {
        return Err(PollError::DurationTooLong {
            max_hours: MAX_DURATION_HOURS,
        });
    }
    Ok(round_to_millis(duration))
}

// Timestamps are stored in whole milliseconds.
fn round_to_millis(duration: Duration) -> Duration {
    match duration.num_nanoseconds() {
        Some(nanos) => Duration::milliseconds((nanos + 500_000).div_euclid(1_000_000)),
        None => duration,
    }
}
