//! Turns poll snapshots into display-ready embeds.
//!
//! Everything here is pure: no storage, no scheduling, no Discord calls. The
//! Discord adapter copies a [`PollView`] into a serenity embed field by field.

use crate::models::Poll;
use crate::notify::UserProfile;
use crate::voting::{VoteCount, calculate_results};
use chrono::{DateTime, Utc};

pub const DISCORD_BLURPLE: u32 = 0x5865F2;
pub const DISCORD_YELLOW: u32 = 0xFEE75C;
pub const DISCORD_RED: u32 = 0xED4245;

pub const BAR_SEGMENTS: usize = 10;
const FILLED: char = '▓';
const EMPTY: char = '░';
const MEDAL: &str = ":medal:";

/// Discord's `<t:...>` timestamp markup styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    ShortDateTime,
    Relative,
}

pub fn discord_timestamp(time: DateTime<Utc>, style: TimestampStyle) -> String {
    let flag = match style {
        TimestampStyle::ShortDateTime => "f",
        TimestampStyle::Relative => "R",
    };
    format!("<t:{}:{}>", time.timestamp(), flag)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollView {
    pub title: String,
    pub description: String,
    pub colour: u32,
    pub fields: Vec<ViewField>,
    pub footer: Option<ViewFooter>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewFooter {
    pub text: String,
    pub icon_url: Option<String>,
}

impl PollView {
    /// The live poll message: options in the order they were given.
    pub fn active(poll: &Poll, creator: Option<&UserProfile>) -> Self {
        let results = calculate_results(poll);
        let fields = results
            .counts
            .iter()
            .map(|count| option_field(count, results.total_votes, true))
            .collect();

        Self {
            title: poll.question.clone(),
            description: format!(
                "Poll ends {}",
                discord_timestamp(poll.end_time, TimestampStyle::Relative)
            ),
            colour: DISCORD_YELLOW,
            fields,
            footer: creator.map(creator_footer),
            timestamp: poll.created_time,
        }
    }

    /// The poll message after it closed: best options first.
    pub fn ended(poll: &Poll, creator: Option<&UserProfile>) -> Self {
        let results = calculate_results(poll);
        let fields = results
            .ranked()
            .iter()
            .map(|count| option_field(count, results.total_votes, true))
            .collect();

        Self {
            title: poll.question.clone(),
            description: format!(
                "Poll ended ({} vote{})",
                results.total_votes,
                plural(results.total_votes)
            ),
            colour: DISCORD_RED,
            fields,
            footer: creator.map(creator_footer),
            timestamp: poll.created_time,
        }
    }

    /// The private copy sent to the creator: ranked like the ended view,
    /// one option per line, plain option names.
    pub fn results(poll: &Poll) -> Self {
        let mut view = Self::ended(poll, None);
        let results = calculate_results(poll);
        view.colour = DISCORD_BLURPLE;
        view.fields = results
            .ranked()
            .iter()
            .map(|count| ViewField {
                name: count.option_text.clone(),
                value: format_vote_string(count.votes, results.total_votes),
                inline: false,
            })
            .collect();
        view
    }
}

fn option_field(count: &VoteCount, total_votes: usize, inline: bool) -> ViewField {
    let name = if count.leader {
        format!("{} {}", MEDAL, count.option_text)
    } else {
        count.option_text.clone()
    };

    ViewField {
        name,
        value: format_vote_string(count.votes, total_votes),
        inline,
    }
}

fn creator_footer(creator: &UserProfile) -> ViewFooter {
    ViewFooter {
        text: format!("Poll created by {}", creator.name),
        icon_url: creator.avatar_url.clone(),
    }
}

pub fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

pub fn format_vote_bar(votes: usize, total_votes: usize) -> String {
    let fill = if total_votes == 0 {
        0
    } else {
        (votes.min(total_votes) * BAR_SEGMENTS) / total_votes
    };

    let mut bar = String::with_capacity(BAR_SEGMENTS * FILLED.len_utf8());
    bar.extend(std::iter::repeat_n(FILLED, fill));
    bar.extend(std::iter::repeat_n(EMPTY, BAR_SEGMENTS - fill));
    bar
}

/// Empty when nobody has voted yet.
pub fn format_vote_percentage(votes: usize, total_votes: usize) -> String {
    if total_votes == 0 {
        return String::new();
    }
    format!(" ({:.2}%)", votes as f64 / total_votes as f64 * 100.0)
}

pub fn format_vote_string(votes: usize, total_votes: usize) -> String {
    format!(
        "{} {} vote{}{}",
        format_vote_bar(votes, total_votes),
        votes,
        plural(votes),
        format_vote_percentage(votes, total_votes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreatePollRequest;
    use chrono::{Duration, TimeZone};

    fn poll() -> Poll {
        let request = CreatePollRequest {
            question: "Tabs or spaces?".into(),
            options: vec!["Tabs".into(), "Spaces".into(), "Both".into()],
            ..Default::default()
        };
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Poll::new("p".into(), request, "m".into(), created, Duration::hours(1))
    }

    #[test]
    fn vote_bar_fill() {
        assert_eq!(format_vote_bar(3, 10), "▓▓▓░░░░░░░");
        assert_eq!(format_vote_bar(0, 0), "░░░░░░░░░░");
        assert_eq!(format_vote_bar(1, 3), "▓▓▓░░░░░░░");
        assert_eq!(format_vote_bar(2, 3), "▓▓▓▓▓▓░░░░");
        assert_eq!(format_vote_bar(4, 4), "▓▓▓▓▓▓▓▓▓▓");
    }

    #[test]
    fn vote_strings() {
        assert_eq!(format_vote_percentage(0, 0), "");
        assert_eq!(format_vote_percentage(1, 3), " (33.33%)");
        assert_eq!(format_vote_string(0, 0), "░░░░░░░░░░ 0 votes");
        assert_eq!(format_vote_string(1, 2), "▓▓▓▓▓░░░░░ 1 vote (50.00%)");
    }

    #[test]
    fn timestamps() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(discord_timestamp(t, TimestampStyle::Relative), "<t:1704067200:R>");
        assert_eq!(discord_timestamp(t, TimestampStyle::ShortDateTime), "<t:1704067200:f>");
    }

    #[test]
    fn active_view_keeps_option_order_and_marks_leaders() {
        let mut poll = poll();
        poll.votes[2].add("u1");
        let creator = UserProfile { name: "ferris".into(), avatar_url: Some("https://cdn/a.png".into()) };

        let view = PollView::active(&poll, Some(&creator));
        assert_eq!(view.title, "Tabs or spaces?");
        assert_eq!(view.description, "Poll ends <t:1704070800:R>");
        assert_eq!(view.colour, DISCORD_YELLOW);
        let names: Vec<&str> = view.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Tabs", "Spaces", ":medal: Both"]);
        assert_eq!(view.footer.unwrap().text, "Poll created by ferris");
    }

    #[test]
    fn ended_view_ranks_options() {
        let mut poll = poll();
        poll.votes[1].add("u1");
        poll.votes[1].add("u2");
        poll.votes[0].add("u3");

        let view = PollView::ended(&poll, None);
        assert_eq!(view.description, "Poll ended (3 votes)");
        assert_eq!(view.colour, DISCORD_RED);
        let names: Vec<&str> = view.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![":medal: Spaces", "Tabs", "Both"]);
        assert!(view.footer.is_none());
    }

    #[test]
    fn zero_vote_poll_has_no_medals() {
        let view = PollView::results(&poll());
        assert_eq!(view.description, "Poll ended (0 votes)");
        assert_eq!(view.colour, DISCORD_BLURPLE);
        assert!(view.fields.iter().all(|f| !f.name.contains(MEDAL)));
        assert!(view.fields.iter().all(|f| f.value == "░░░░░░░░░░ 0 votes" && !f.inline));
    }

    #[test]
    fn results_view_lists_plain_names() {
        let mut poll = poll();
        poll.votes[2].add("u1");
        poll.votes[2].add("u2");
        poll.votes[0].add("u3");

        let view = PollView::results(&poll);
        assert_eq!(view.colour, DISCORD_BLURPLE);
        assert!(view.footer.is_none());
        let names: Vec<&str> = view.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Both", "Tabs", "Spaces"]);
        assert_eq!(view.fields[0].value, "▓▓▓▓▓▓░░░░ 2 votes (66.67%)");
        assert!(view.fields.iter().all(|f| !f.inline));
    }
}
