// src/poll.rs
use std::collections::HashMap;

use rand::Rng;
use uuid::Uuid;

use crate::models::{OptionResult, PollOption, PollResults, Vote, Voter};
use crate::validation::ACCESS_CODE_LEN;

const ACCESS_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws a fresh 8-character access code. Uniqueness is checked by the caller.
pub fn generate_access_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ACCESS_CODE_LEN)
        .map(|_| ACCESS_CODE_ALPHABET[rng.gen_range(0..ACCESS_CODE_ALPHABET.len())] as char)
        .collect()
}

/// `count / total` as a whole percentage, halves rounded up. Zero when nobody voted.
pub fn percentage(count: i64, total: i64) -> u32 {
    if total <= 0 {
        return 0;
    }
    ((count * 200 + total) / (2 * total)) as u32
}

/// Groups `votes` under their options, keeping option display order and
/// vote submission order.
pub fn tally(poll_id: Uuid, options: &[PollOption], votes: &[Vote]) -> PollResults {
    let mut voters: HashMap<Uuid, Vec<Voter>> = HashMap::new();
    for vote in votes {
        voters.entry(vote.poll_option_id).or_default().push(Voter {
            voter_name: vote.voter_name.clone(),
            voter_email: vote.voter_email.clone(),
            submitted_at: vote.submitted_at,
        });
    }

    let mut results: Vec<OptionResult> = options
        .iter()
        .map(|option| {
            let voters = voters.remove(&option.id).unwrap_or_default();
            OptionResult {
                option_id: option.id,
                option_text: option.option_text.clone(),
                vote_count: voters.len() as i64,
                percentage: 0,
                voters,
            }
        })
        .collect();

    let total_votes: i64 = results.iter().map(|r| r.vote_count).sum();
    for result in &mut results {
        result.percentage = percentage(result.vote_count, total_votes);
    }

    PollResults {
        poll_id,
        total_votes,
        results,
    }
}
