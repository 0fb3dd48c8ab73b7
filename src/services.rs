// services.rs
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, StoreError};
use crate::models::{
    CodeLookup, CreatePollRequest, CreatedPoll, NewPoll, Poll, PollDetail, PollResults,
    SubmitVoteRequest, VoteReceipt,
};
use crate::poll::{generate_access_code, tally};
use crate::realtime::ResultsHub;
use crate::store::PollStore;
use crate::validation::{validate_access_code, validate_create_poll, validate_submit_vote};

const ACCESS_CODE_ATTEMPTS: usize = 5;

/// Validates and stores a poll with its options.
pub async fn create_poll(
    store: &dyn PollStore,
    config: &Config,
    req: CreatePollRequest,
    now: DateTime<Utc>,
) -> Result<CreatedPoll, AppError> {
    create_poll_with_codes(store, config, req, now, || {
        generate_access_code(&mut rand::thread_rng())
    })
    .await
}

pub async fn create_poll_with_codes<G>(
    store: &dyn PollStore,
    config: &Config,
    req: CreatePollRequest,
    now: DateTime<Utc>,
    mut next_code: G,
) -> Result<CreatedPoll, AppError>
where
    G: FnMut() -> String + Send,
{
    let draft = validate_create_poll(req, now)?;

    let mut inserted = None;
    for attempt in 1..=ACCESS_CODE_ATTEMPTS {
        let access_code = next_code();
        if store.access_code_exists(&access_code).await? {
            warn!(attempt, "Access code collision, retrying");
            continue;
        }
        // Another request may claim the same code between the check and the insert.
        match store
            .insert_poll(NewPoll {
                creator_name: draft.creator_name.clone(),
                creator_email: draft.creator_email.clone(),
                question: draft.question.clone(),
                deadline: draft.deadline,
                show_realtime_results: draft.show_realtime_results,
                access_code,
            })
            .await
        {
            Ok(poll) => {
                inserted = Some(poll);
                break;
            }
            Err(StoreError::DuplicateAccessCode) => {
                warn!(attempt, "Access code taken concurrently, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    let poll = inserted.ok_or(AppError::AccessCodeExhausted)?;

    if let Err(e) = store.insert_options(poll.id, &draft.options).await {
        error!(poll_id = %poll.id, "Failed to insert poll options: {e}");
        if let Err(e) = store.delete_poll(poll.id).await {
            error!(poll_id = %poll.id, "Failed to remove poll without options: {e}");
        }
        return Err(AppError::OptionsInsert);
    }

    info!(poll_id = %poll.id, access_code = %poll.access_code, "Poll created");

    Ok(CreatedPoll {
        share_url: config.share_url(poll.id),
        id: poll.id,
        access_code: poll.access_code,
        question: poll.question,
        deadline: poll.deadline,
    })
}

/// Path ids that are not UUIDs cannot name a poll.
pub fn parse_poll_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::PollNotFound)
}

pub async fn find_poll(store: &dyn PollStore, id: Uuid) -> Result<Poll, AppError> {
    store.get_poll(id).await?.ok_or(AppError::PollNotFound)
}

pub async fn get_poll(store: &dyn PollStore, id: Uuid) -> Result<PollDetail, AppError> {
    let poll = find_poll(store, id).await?;
    let options = store.list_options(id).await?;
    Ok(PollDetail { poll, options })
}

pub async fn find_by_code(store: &dyn PollStore, code: &str) -> Result<CodeLookup, AppError> {
    let code = validate_access_code(code)?;
    let poll = store
        .get_poll_by_code(&code)
        .await?
        .ok_or(AppError::AccessCodeNotFound)?;
    Ok(CodeLookup {
        poll_id: poll.id,
        question: poll.question,
        deadline: poll.deadline,
    })
}

pub async fn submit_vote(
    store: &dyn PollStore,
    hub: &ResultsHub,
    req: SubmitVoteRequest,
    now: DateTime<Utc>,
) -> Result<VoteReceipt, AppError> {
    let vote = validate_submit_vote(req)?;

    let poll = find_poll(store, vote.poll_id).await?;
    if poll.is_closed(now) {
        return Err(AppError::VotingClosed);
    }

    if !store
        .option_belongs_to_poll(vote.poll_id, vote.poll_option_id)
        .await?
    {
        return Err(AppError::InvalidOption);
    }

    let vote = store.insert_vote(vote).await.map_err(|e| match e {
        StoreError::DuplicateVote => AppError::AlreadyVoted,
        other => AppError::Store(other),
    })?;

    info!(poll_id = %vote.poll_id, vote_id = %vote.id, "Vote recorded");

    if hub.is_watched(poll.id) {
        match load_results(store, &poll).await {
            Ok(results) => hub.publish(results),
            Err(e) => warn!(poll_id = %poll.id, "Failed to refresh live results: {e}"),
        }
    }

    Ok(VoteReceipt {
        id: vote.id,
        poll_id: vote.poll_id,
        created_at: vote.submitted_at,
    })
}

async fn load_results(store: &dyn PollStore, poll: &Poll) -> Result<PollResults, StoreError> {
    let options = store.list_options(poll.id).await?;
    let votes = store.list_votes(poll.id).await?;
    Ok(tally(poll.id, &options, &votes))
}

/// Finds a poll whose results the caller may see at `now`.
pub async fn visible_poll(
    store: &dyn PollStore,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Poll, AppError> {
    let poll = find_poll(store, id).await?;
    if !poll.results_visible(now) {
        return Err(AppError::ResultsHidden);
    }
    Ok(poll)
}

pub async fn poll_results(
    store: &dyn PollStore,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<PollResults, AppError> {
    let poll = visible_poll(store, id, now).await?;
    Ok(load_results(store, &poll).await?)
}
