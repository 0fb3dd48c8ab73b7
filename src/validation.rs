// src/validation.rs
//! Payload checks for poll creation and vote submission.
//!
//! Each validator collects every failing field instead of stopping at the
//! first one, so clients can highlight all bad inputs at once.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CreatePollRequest, NewVote, PollDraft, SubmitVoteRequest};

pub const ACCESS_CODE_LEN: usize = 8;
const MAX_NAME_LEN: usize = 255;
const MAX_OPTION_LEN: usize = 500;
const MIN_QUESTION_LEN: usize = 5;
const MIN_OPTIONS: usize = 2;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Issue {
    pub path: Vec<Value>,
    pub message: String,
}

impl Issue {
    fn field(name: &str, message: &str) -> Self {
        Self {
            path: vec![Value::from(name)],
            message: message.to_string(),
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

fn check_name(issues: &mut Vec<Issue>, field: &str, value: &str) {
    let len = value.chars().count();
    if len == 0 {
        issues.push(Issue::field(field, "Name is required"));
    } else if len > MAX_NAME_LEN {
        issues.push(Issue::field(field, "Name must be at most 255 characters"));
    }
}

fn check_email(issues: &mut Vec<Issue>, field: &str, value: &str) {
    if !is_valid_email(value) {
        issues.push(Issue::field(field, "Valid email required"));
    }
}

/// Parses an RFC 3339 timestamp, or a `datetime-local` form value
/// (`YYYY-MM-DDTHH:MM[:SS]`) which is taken to be UTC.
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn validate_create_poll(
    req: CreatePollRequest,
    now: DateTime<Utc>,
) -> Result<PollDraft, AppError> {
    let mut issues = Vec::new();

    check_name(&mut issues, "creator_name", &req.creator_name);
    check_email(&mut issues, "creator_email", &req.creator_email);

    if req.question.chars().count() < MIN_QUESTION_LEN {
        issues.push(Issue::field(
            "question",
            "Question must be at least 5 characters",
        ));
    }

    if req.options.len() < MIN_OPTIONS {
        issues.push(Issue::field("options", "At least 2 options required"));
    }
    for (i, option) in req.options.iter().enumerate() {
        let len = option.chars().count();
        let message = if len == 0 {
            "Option cannot be empty"
        } else if len > MAX_OPTION_LEN {
            "Option must be at most 500 characters"
        } else {
            continue;
        };
        issues.push(Issue {
            path: vec![Value::from("options"), Value::from(i)],
            message: message.to_string(),
        });
    }

    let deadline = match parse_deadline(&req.deadline) {
        Some(deadline) if deadline > now => Some(deadline),
        _ => {
            issues.push(Issue::field("deadline", "Deadline must be in the future"));
            None
        }
    };

    match deadline {
        Some(deadline) if issues.is_empty() => Ok(PollDraft {
            creator_name: req.creator_name,
            creator_email: req.creator_email,
            question: req.question,
            options: req.options,
            deadline,
            show_realtime_results: req.show_realtime_results.unwrap_or(true),
        }),
        _ => Err(AppError::Validation(issues)),
    }
}

pub fn validate_submit_vote(req: SubmitVoteRequest) -> Result<NewVote, AppError> {
    let mut issues = Vec::new();

    let poll_id = Uuid::parse_str(&req.poll_id).ok();
    if poll_id.is_none() {
        issues.push(Issue::field("poll_id", "Invalid uuid"));
    }
    let poll_option_id = Uuid::parse_str(&req.poll_option_id).ok();
    if poll_option_id.is_none() {
        issues.push(Issue::field("poll_option_id", "Invalid uuid"));
    }
    check_name(&mut issues, "voter_name", &req.voter_name);
    check_email(&mut issues, "voter_email", &req.voter_email);

    match (poll_id, poll_option_id) {
        (Some(poll_id), Some(poll_option_id)) if issues.is_empty() => Ok(NewVote {
            poll_id,
            poll_option_id,
            voter_name: req.voter_name,
            voter_email: req.voter_email,
        }),
        _ => Err(AppError::Validation(issues)),
    }
}

/// Checks the shape of a user-typed access code and normalizes it to upper case.
pub fn validate_access_code(code: &str) -> Result<String, AppError> {
    if code.chars().count() != ACCESS_CODE_LEN {
        return Err(AppError::InvalidAccessCode);
    }
    Ok(code.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn poll_request() -> CreatePollRequest {
        CreatePollRequest {
            creator_name: "Ada".to_string(),
            creator_email: "ada@example.com".to_string(),
            question: "Lunch spot?".to_string(),
            options: vec!["Tacos".to_string(), "Ramen".to_string()],
            deadline: "2026-01-02T09:30".to_string(),
            show_realtime_results: None,
        }
    }

    fn issue_paths(err: AppError) -> Vec<Vec<Value>> {
        match err {
            AppError::Validation(issues) => issues.into_iter().map(|i| i.path).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_poll_defaults_realtime_on() {
        let draft = validate_create_poll(poll_request(), now()).unwrap();
        assert!(draft.show_realtime_results);
        assert_eq!(
            draft.deadline,
            Utc.with_ymd_and_hms(2026, 1, 2, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_realtime_flag_respected() {
        let mut req = poll_request();
        req.show_realtime_results = Some(false);
        let draft = validate_create_poll(req, now()).unwrap();
        assert!(!draft.show_realtime_results);
    }

    #[test]
    fn test_collects_every_issue() {
        let req = CreatePollRequest {
            options: vec!["only".to_string(), String::new()],
            deadline: "2025-12-31T23:00".to_string(),
            ..Default::default()
        };
        let paths = issue_paths(validate_create_poll(req, now()).unwrap_err());
        assert_eq!(
            paths,
            vec![
                vec![Value::from("creator_name")],
                vec![Value::from("creator_email")],
                vec![Value::from("question")],
                vec![Value::from("options"), Value::from(1)],
                vec![Value::from("deadline")],
            ]
        );
    }

    #[test]
    fn test_single_option_rejected() {
        let mut req = poll_request();
        req.options.truncate(1);
        let paths = issue_paths(validate_create_poll(req, now()).unwrap_err());
        assert_eq!(paths, vec![vec![Value::from("options")]]);
    }

    #[test]
    fn test_deadline_must_be_strictly_future() {
        let mut req = poll_request();
        req.deadline = now().to_rfc3339();
        assert!(validate_create_poll(req, now()).is_err());
    }

    #[test]
    fn test_parse_deadline_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 0).unwrap();
        assert_eq!(parse_deadline("2026-03-04T05:06"), Some(expected));
        assert_eq!(parse_deadline("2026-03-04T05:06:00"), Some(expected));
        assert_eq!(parse_deadline("2026-03-04T05:06:00Z"), Some(expected));
        assert_eq!(
            parse_deadline("2026-03-04T07:06:00+02:00"),
            Some(expected)
        );
        assert_eq!(parse_deadline("next tuesday"), None);
    }

    #[test]
    fn test_overlong_option() {
        let mut req = poll_request();
        req.options.push("x".repeat(501));
        let paths = issue_paths(validate_create_poll(req, now() - Duration::days(1)).unwrap_err());
        assert_eq!(paths, vec![vec![Value::from("options"), Value::from(2)]]);
    }

    #[test]
    fn test_vote_validation() {
        let ok = SubmitVoteRequest {
            poll_id: Uuid::new_v4().to_string(),
            poll_option_id: Uuid::new_v4().to_string(),
            voter_name: "Grace".to_string(),
            voter_email: "grace@example.com".to_string(),
        };
        assert!(validate_submit_vote(ok).is_ok());

        let bad = SubmitVoteRequest {
            poll_id: "not-a-uuid".to_string(),
            voter_email: "grace@".to_string(),
            ..Default::default()
        };
        let paths = issue_paths(validate_submit_vote(bad).unwrap_err());
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_access_code_format() {
        assert_eq!(validate_access_code("abcd1234").unwrap(), "ABCD1234");
        assert!(matches!(
            validate_access_code("short"),
            Err(AppError::InvalidAccessCode)
        ));
        assert!(validate_access_code("toolong123").is_err());
    }
}
