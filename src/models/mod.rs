pub mod ledger;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use ledger::VoteLedger;

#[derive(Debug, Clone, PartialEq)]
pub struct Poll {
    pub id: String,
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub creator_id: String,
    pub question: String,
    pub options: Vec<String>,
    /// One ledger per entry in `options`, same order.
    pub votes: Vec<VoteLedger>,
    pub created_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// What a user asked for through `/poll create`, before validation.
#[derive(Debug, Clone, Default)]
pub struct CreatePollRequest {
    pub guild_id: String,
    pub channel_id: String,
    pub creator_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub duration: Option<String>,
}

impl Poll {
    pub fn new(
        id: String,
        request: CreatePollRequest,
        message_id: String,
        created_time: DateTime<Utc>,
        duration: chrono::Duration,
    ) -> Self {
        let votes = vec![VoteLedger::new(); request.options.len()];

        Self {
            id,
            guild_id: request.guild_id,
            channel_id: request.channel_id,
            message_id,
            creator_id: request.creator_id,
            question: request.question,
            options: request.options,
            votes,
            created_time,
            end_time: created_time + duration,
        }
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// Index of the option the user currently backs, if any.
    pub fn choice_of(&self, user_id: &str) -> Option<usize> {
        self.votes.iter().position(|ledger| ledger.has(user_id))
    }
}

/// Unique, time-ordered poll identifier.
pub fn new_poll_id() -> String {
    Uuid::now_v7().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_poll_starts_with_empty_ledgers() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let request = CreatePollRequest {
            guild_id: "g".into(),
            channel_id: "c".into(),
            creator_id: "u".into(),
            question: "Lunch?".into(),
            options: vec!["Pizza".into(), "Sushi".into(), "Tacos".into()],
            duration: None,
        };
        let poll = Poll::new("p1".into(), request, "m".into(), created, chrono::Duration::hours(2));

        assert_eq!(poll.votes.len(), 3);
        assert!(poll.votes.iter().all(|l| l.count() == 0));
        assert_eq!(poll.end_time, created + chrono::Duration::hours(2));
        assert!(!poll.has_ended(created));
        assert!(poll.has_ended(poll.end_time));
        assert_eq!(poll.choice_of("u"), None);
    }

    #[test]
    fn poll_ids_are_unique_and_ordered() {
        let first = new_poll_id();
        let second = new_poll_id();
        assert_ne!(first, second);
        assert!(first < second);
        assert_eq!(first.len(), 32);
    }
}
