// models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Poll {
    pub id: Uuid,
    pub creator_name: String,
    pub creator_email: String,
    pub question: String,
    pub deadline: DateTime<Utc>,
    pub show_realtime_results: bool,
    pub access_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Poll {
    /// Voting is closed once `now` is strictly past the deadline.
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Results are public when realtime display is on, or after the deadline.
    pub fn results_visible(&self, now: DateTime<Utc>) -> bool {
        self.show_realtime_results || self.deadline < now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_text: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub poll_option_id: Uuid,
    pub voter_name: String,
    pub voter_email: String,
    pub submitted_at: DateTime<Utc>,
}

/// Raw poll payload. Every field defaults so that missing fields surface as
/// validation issues rather than a deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreatePollRequest {
    pub creator_name: String,
    pub creator_email: String,
    pub question: String,
    pub options: Vec<String>,
    pub deadline: String,
    pub show_realtime_results: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitVoteRequest {
    pub poll_id: String,
    pub poll_option_id: String,
    pub voter_name: String,
    pub voter_email: String,
}

/// A validated poll ready to be stored, minus its access code.
#[derive(Debug, Clone)]
pub struct PollDraft {
    pub creator_name: String,
    pub creator_email: String,
    pub question: String,
    pub options: Vec<String>,
    pub deadline: DateTime<Utc>,
    pub show_realtime_results: bool,
}

#[derive(Debug, Clone)]
pub struct NewPoll {
    pub creator_name: String,
    pub creator_email: String,
    pub question: String,
    pub deadline: DateTime<Utc>,
    pub show_realtime_results: bool,
    pub access_code: String,
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub poll_id: Uuid,
    pub poll_option_id: Uuid,
    pub voter_name: String,
    pub voter_email: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedPoll {
    pub id: Uuid,
    pub access_code: String,
    pub question: String,
    pub deadline: DateTime<Utc>,
    pub share_url: String,
}

#[derive(Debug, Serialize)]
pub struct PollDetail {
    pub poll: Poll,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Serialize)]
pub struct CodeLookup {
    pub poll_id: Uuid,
    pub question: String,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct VoteReceipt {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Voter {
    pub voter_name: String,
    pub voter_email: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionResult {
    pub option_id: Uuid,
    pub option_text: String,
    pub vote_count: i64,
    pub percentage: u32,
    pub voters: Vec<Voter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollResults {
    pub poll_id: Uuid,
    pub total_votes: i64,
    pub results: Vec<OptionResult>,
}
