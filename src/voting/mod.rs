use crate::models::Poll;

// Tally for one poll snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct PollResults {
    pub total_votes: usize,
    pub highest_votes: usize,
    pub counts: Vec<VoteCount>, // Original option order
}

// Structure to hold vote counts
#[derive(Debug, Clone, PartialEq)]
pub struct VoteCount {
    pub index: usize,
    pub option_text: String,
    pub votes: usize,
    pub leader: bool, // Tied for the highest count
}

impl PollResults {
    /// Counts ordered by descending votes; ties keep the original option order.
    pub fn ranked(&self) -> Vec<VoteCount> {
        let mut ranked = self.counts.clone();
        // sort_by is stable
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
        ranked
    }
}

pub fn calculate_results(poll: &Poll) -> PollResults {
    let total_votes = poll.votes.iter().map(|ledger| ledger.count()).sum();
    let highest_votes = poll.votes.iter().map(|ledger| ledger.count()).max().unwrap_or(0);

    let counts = poll
        .options
        .iter()
        .zip(&poll.votes)
        .enumerate()
        .map(|(index, (text, ledger))| VoteCount {
            index,
            option_text: text.clone(),
            votes: ledger.count(),
            // Nobody leads a poll nobody voted in
            leader: highest_votes > 0 && ledger.count() == highest_votes,
        })
        .collect();

    PollResults { total_votes, highest_votes, counts }
}
