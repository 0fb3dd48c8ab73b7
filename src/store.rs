// src/store.rs
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewPoll, NewVote, Poll, PollOption, Vote};

/// Persistence seam for polls, their options and votes.
#[async_trait]
pub trait PollStore: Send + Sync {
    async fn access_code_exists(&self, code: &str) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::DuplicateAccessCode`] when the code is taken.
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, StoreError>;

    /// Inserts `options` for `poll_id`; the index becomes `display_order`.
    async fn insert_options(
        &self,
        poll_id: Uuid,
        options: &[String],
    ) -> Result<Vec<PollOption>, StoreError>;

    async fn delete_poll(&self, id: Uuid) -> Result<(), StoreError>;

    async fn get_poll(&self, id: Uuid) -> Result<Option<Poll>, StoreError>;

    /// `code` must already be upper case.
    async fn get_poll_by_code(&self, code: &str) -> Result<Option<Poll>, StoreError>;

    /// Options ordered by `display_order`.
    async fn list_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>, StoreError>;

    async fn option_belongs_to_poll(
        &self,
        poll_id: Uuid,
        option_id: Uuid,
    ) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::DuplicateVote`] when the voter email already
    /// voted in this poll. The check and the insert are atomic.
    async fn insert_vote(&self, vote: NewVote) -> Result<Vote, StoreError>;

    /// Votes ordered by `submitted_at`, oldest first.
    async fn list_votes(&self, poll_id: Uuid) -> Result<Vec<Vote>, StoreError>;
}

#[derive(Default)]
struct Tables {
    polls: HashMap<Uuid, Poll>,
    options: Vec<PollOption>,
    votes: Vec<Vote>,
}

/// In-process store backed by a single mutex.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a half-written row.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn access_code_exists(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.tables().polls.values().any(|p| p.access_code == code))
    }

    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        let mut tables = self.tables();
        if tables.polls.values().any(|p| p.access_code == poll.access_code) {
            return Err(StoreError::DuplicateAccessCode);
        }
        let now = Utc::now();
        let row = Poll {
            id: Uuid::new_v4(),
            creator_name: poll.creator_name,
            creator_email: poll.creator_email,
            question: poll.question,
            deadline: poll.deadline,
            show_realtime_results: poll.show_realtime_results,
            access_code: poll.access_code,
            created_at: now,
            updated_at: now,
        };
        tables.polls.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_options(
        &self,
        poll_id: Uuid,
        options: &[String],
    ) -> Result<Vec<PollOption>, StoreError> {
        let now = Utc::now();
        let rows: Vec<PollOption> = options
            .iter()
            .enumerate()
            .map(|(i, text)| PollOption {
                id: Uuid::new_v4(),
                poll_id,
                option_text: text.clone(),
                display_order: i as i32,
                created_at: now,
            })
            .collect();
        self.tables().options.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn delete_poll(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables();
        tables.polls.remove(&id);
        tables.options.retain(|o| o.poll_id != id);
        tables.votes.retain(|v| v.poll_id != id);
        Ok(())
    }

    async fn get_poll(&self, id: Uuid) -> Result<Option<Poll>, StoreError> {
        Ok(self.tables().polls.get(&id).cloned())
    }

    async fn get_poll_by_code(&self, code: &str) -> Result<Option<Poll>, StoreError> {
        Ok(self
            .tables()
            .polls
            .values()
            .find(|p| p.access_code == code)
            .cloned())
    }

    async fn list_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>, StoreError> {
        let mut options: Vec<PollOption> = self
            .tables()
            .options
            .iter()
            .filter(|o| o.poll_id == poll_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.display_order);
        Ok(options)
    }

    async fn option_belongs_to_poll(
        &self,
        poll_id: Uuid,
        option_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .tables()
            .options
            .iter()
            .any(|o| o.id == option_id && o.poll_id == poll_id))
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote, StoreError> {
        let mut tables = self.tables();
        if tables
            .votes
            .iter()
            .any(|v| v.poll_id == vote.poll_id && v.voter_email == vote.voter_email)
        {
            return Err(StoreError::DuplicateVote);
        }
        let row = Vote {
            id: Uuid::new_v4(),
            poll_id: vote.poll_id,
            poll_option_id: vote.poll_option_id,
            voter_name: vote.voter_name,
            voter_email: vote.voter_email,
            submitted_at: Utc::now(),
        };
        tables.votes.push(row.clone());
        Ok(row)
    }

    async fn list_votes(&self, poll_id: Uuid) -> Result<Vec<Vote>, StoreError> {
        let mut votes: Vec<Vote> = self
            .tables()
            .votes
            .iter()
            .filter(|v| v.poll_id == poll_id)
            .cloned()
            .collect();
        votes.sort_by_key(|v| v.submitted_at);
        Ok(votes)
    }
}
