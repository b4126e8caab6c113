pub mod error;

use crate::models::{Poll, VoteLedger};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, migrate::MigrateDatabase};

pub use error::{Result, StoreError};

const POLL_COLUMNS: &str = "id, guild_id, channel_id, message_id, creator_id, question, options, votes, created_time, end_time, revision";

/// Durable poll storage. A row exists exactly as long as its poll is active.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
            info!("Creating database at {}", database_url);
            Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database; every pooled connection to
    /// `:memory:` would otherwise get its own empty schema.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id TEXT PRIMARY KEY,
                guild_id TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                creator_id TEXT NOT NULL,
                question TEXT NOT NULL,
                options TEXT NOT NULL,
                votes TEXT NOT NULL,
                created_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                revision INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(pool)
        .await?;

        // One active poll per creator per guild.
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS polls_creator_guild
            ON polls (creator_id, guild_id);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS polls_end_time ON polls (end_time);")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Inserts a new poll with an empty ledger for every option.
    pub async fn create_poll(&self, poll: &Poll) -> Result<()> {
        let options_json = serde_json::to_string(&poll.options)?;
        let votes_json = serde_json::to_string(&vec![VoteLedger::new(); poll.options.len()])?;

        let result = sqlx::query(
            r#"
            INSERT INTO polls (id, guild_id, channel_id, message_id, creator_id, question, options, votes, created_time, end_time, revision)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&poll.id)
        .bind(&poll.guild_id)
        .bind(&poll.channel_id)
        .bind(&poll.message_id)
        .bind(&poll.creator_id)
        .bind(&poll.question)
        .bind(options_json)
        .bind(votes_json)
        .bind(poll.created_time.timestamp_millis())
        .bind(poll.end_time.timestamp_millis())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!("Stored poll {} for creator {} in guild {}", poll.id, poll.creator_id, poll.guild_id);
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // SQLite names the violated columns, e.g. "UNIQUE constraint failed: polls.id"
                if db_err.message().contains("polls.id") {
                    Err(StoreError::AlreadyExists(poll.id.clone()))
                } else {
                    Err(StoreError::CreatorHasActivePoll)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_poll(&self, poll_id: &str) -> Result<Poll> {
        let row = sqlx::query(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?"))
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        let poll = poll_from_row(&row)?;
        check_id(poll_id, &poll)?;
        Ok(poll)
    }

    /// The creator's active poll in the given guild.
    pub async fn get_poll_by_creator(&self, creator_id: &str, guild_id: &str) -> Result<Poll> {
        let row = sqlx::query(&format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE creator_id = ? AND guild_id = ?"
        ))
        .bind(creator_id)
        .bind(guild_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        poll_from_row(&row)
    }

    /// Moves the user's single ballot to `option`, returning the updated poll.
    ///
    /// The write only lands if the row's revision is unchanged since it was
    /// read; a concurrent vote bumps the revision and this one re-reads.
    pub async fn apply_vote(
        &self,
        poll_id: &str,
        user_id: &str,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<Poll> {
        loop {
            let row = sqlx::query(&format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?"))
                .bind(poll_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)?;

            let revision: i64 = row.try_get("revision")?;
            let mut poll = poll_from_row(&row)?;
            check_id(poll_id, &poll)?;

            if option >= poll.votes.len() {
                return Err(StoreError::OptionOutOfRange { index: option, len: poll.votes.len() });
            }
            if poll.has_ended(now) {
                return Err(StoreError::PollEnded);
            }

            for (i, ledger) in poll.votes.iter_mut().enumerate() {
                if i == option {
                    ledger.add(user_id);
                } else {
                    ledger.remove(user_id);
                }
            }

            let updated = sqlx::query(
                r#"
                UPDATE polls
                SET votes = ?, revision = revision + 1
                WHERE id = ? AND revision = ?
                "#,
            )
            .bind(serde_json::to_string(&poll.votes)?)
            .bind(poll_id)
            .bind(revision)
            .execute(&self.pool)
            .await?;

            if updated.rows_affected() == 1 {
                return Ok(poll);
            }
            debug!("Vote by {} on poll {} raced another update, retrying", user_id, poll_id);
        }
    }

    /// Deletes the poll and returns what it looked like just before.
    /// Only one caller can ever get `Ok` for a given poll.
    pub async fn end_poll(&self, poll_id: &str) -> Result<Poll> {
        let row = sqlx::query(&format!("DELETE FROM polls WHERE id = ? RETURNING {POLL_COLUMNS}"))
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        let poll = poll_from_row(&row)?;
        check_id(poll_id, &poll)?;
        Ok(poll)
    }

    /// Every active poll. Rows are decoded lazily as the iterator advances.
    pub async fn list_polls(&self) -> Result<PollIter> {
        let rows = sqlx::query(&format!("SELECT {POLL_COLUMNS} FROM polls ORDER BY end_time"))
            .fetch_all(&self.pool)
            .await?;

        Ok(PollIter { rows: rows.into_iter() })
    }

    /// IDs of stored polls whose end time is at or before `now`.
    pub async fn due_poll_ids(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let ids = sqlx::query("SELECT id FROM polls WHERE end_time <= ? ORDER BY end_time")
            .bind(now.timestamp_millis())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.try_get::<String, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ids)
    }
}

/// Finite, single-pass sequence of stored polls. Undecodable rows are logged
/// and skipped.
pub struct PollIter {
    rows: std::vec::IntoIter<SqliteRow>,
}

impl Iterator for PollIter {
    type Item = Poll;

    fn next(&mut self) -> Option<Poll> {
        for row in self.rows.by_ref() {
            match poll_from_row(&row) {
                Ok(poll) => return Some(poll),
                Err(e) => warn!("Skipping unreadable poll row: {}", e),
            }
        }
        None
    }
}

fn poll_from_row(row: &SqliteRow) -> Result<Poll> {
    let options_json: String = row.try_get("options")?;
    let votes_json: String = row.try_get("votes")?;

    let options: Vec<String> = serde_json::from_str(&options_json)?;
    let votes: Vec<VoteLedger> = serde_json::from_str(&votes_json)?;
    if votes.len() != options.len() {
        return Err(StoreError::Corrupt(format!(
            "{} options but {} vote ledgers",
            options.len(),
            votes.len()
        )));
    }

    Ok(Poll {
        id: row.try_get("id")?,
        guild_id: row.try_get("guild_id")?,
        channel_id: row.try_get("channel_id")?,
        message_id: row.try_get("message_id")?,
        creator_id: row.try_get("creator_id")?,
        question: row.try_get("question")?,
        options,
        votes,
        created_time: from_millis(row.try_get("created_time")?)?,
        end_time: from_millis(row.try_get("end_time")?)?,
    })
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp {millis} out of range")))
}

fn check_id(requested: &str, poll: &Poll) -> Result<()> {
    if poll.id != requested {
        error!("Requested poll {} but storage returned {}", requested, poll.id);
        return Err(StoreError::Corrupt(format!(
            "requested poll {requested}, got {}",
            poll.id
        )));
    }
    Ok(())
}
