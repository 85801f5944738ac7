// File: src/polls.rs
// Purpose: Poll and vote business rules on top of the database layer

use crate::database::{self, OptionRow, PollRow};
use crate::response::ServiceResult;
use serde::{Deserialize, Serialize};
use sqlx::AnyPool;
use std::collections::HashSet;

pub const MAX_QUESTION_LEN: usize = 500;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;
pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 100;

pub const POLL_NOT_FOUND: &str = "Poll not found";
pub const ALREADY_VOTED: &str = "You have already voted in this poll";

/// A poll with its options, as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub created_at: String,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollOption {
    pub id: i64,
    pub label: String,
}

/// Summary used in listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub id: String,
    pub question: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub poll_id: String,
    pub question: String,
    pub total_votes: i64,
    pub options: Vec<OptionTally>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionTally {
    pub id: i64,
    pub label: String,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub poll_id: String,
    pub option_id: i64,
}

// ============================================================================
// PURE FUNCTIONS - validation
// ============================================================================

/// Normalize and validate a new poll (Pure function)
///
/// # Examples
/// ```
/// use ballot::polls::validate_new_poll;
///
/// let (question, options) =
///     validate_new_poll("  Lunch? ", &["pizza".into(), " soup ".into()]).unwrap();
/// assert_eq!(question, "Lunch?");
/// assert_eq!(options, vec!["pizza", "soup"]);
///
/// assert!(validate_new_poll("Lunch?", &["pizza".into()]).is_err());
/// ```
pub fn validate_new_poll(question: &str, options: &[String]) -> Result<(String, Vec<String>), String> {
    let question = question.trim();
    if question.is_empty() {
        return Err("Question is required".to_string());
    }
    if question.chars().count() > MAX_QUESTION_LEN {
        return Err(format!("Question must be at most {MAX_QUESTION_LEN} characters"));
    }

    let options: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(format!(
            "A poll needs between {MIN_OPTIONS} and {MAX_OPTIONS} options"
        ));
    }
    if options.iter().any(String::is_empty) {
        return Err("Options cannot be empty".to_string());
    }

    let mut seen = HashSet::new();
    if !options.iter().all(|o| seen.insert(o.to_lowercase())) {
        return Err("Options must be unique".to_string());
    }

    Ok((question.to_string(), options))
}

/// Clamp a requested listing size (Pure function)
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

fn to_poll(row: PollRow, options: Vec<OptionRow>) -> Poll {
    Poll {
        id: row.id,
        question: row.question,
        created_at: row.created_at,
        options: options
            .into_iter()
            .map(|o| PollOption {
                id: o.id,
                label: o.label,
            })
            .collect(),
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// Poll operations; every method answers with a `ServiceResult` envelope
///
/// Database failures are the only `Err`; rule violations are envelopes
/// with `success: false`.
#[derive(Clone)]
pub struct PollService {
    pool: AnyPool,
}

impl PollService {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn create_poll(
        &self,
        question: &str,
        options: &[String],
    ) -> Result<ServiceResult<Poll>, sqlx::Error> {
        let (question, options) = match validate_new_poll(question, options) {
            Ok(valid) => valid,
            Err(reason) => return Ok(ServiceResult::fail(reason)),
        };

        let (row, options) = database::insert_poll(&self.pool, &question, &options).await?;
        tracing::info!(poll_id = %row.id, "Poll created");
        Ok(ServiceResult::ok(to_poll(row, options)).with_message("Poll created"))
    }

    pub async fn get_poll(&self, id: &str) -> Result<ServiceResult<Poll>, sqlx::Error> {
        let Some(row) = database::get_poll(&self.pool, id).await? else {
            return Ok(ServiceResult::fail(POLL_NOT_FOUND));
        };
        let options = database::get_options(&self.pool, id).await?;
        Ok(ServiceResult::ok(to_poll(row, options)))
    }

    pub async fn list_polls(
        &self,
        limit: Option<i64>,
    ) -> Result<ServiceResult<Vec<PollSummary>>, sqlx::Error> {
        let rows = database::list_polls(&self.pool, clamp_limit(limit)).await?;
        let polls = rows
            .into_iter()
            .map(|row| PollSummary {
                id: row.id,
                question: row.question,
                created_at: row.created_at,
            })
            .collect();
        Ok(ServiceResult::ok(polls))
    }

    /// Record a vote; a non-empty `voter_id` may vote once per poll
    pub async fn cast_vote(
        &self,
        poll_id: &str,
        option_id: i64,
        voter_id: Option<&str>,
    ) -> Result<ServiceResult<VoteReceipt>, sqlx::Error> {
        if database::get_poll(&self.pool, poll_id).await?.is_none() {
            return Ok(ServiceResult::fail(POLL_NOT_FOUND));
        }

        let options = database::get_options(&self.pool, poll_id).await?;
        if !options.iter().any(|o| o.id == option_id) {
            return Ok(ServiceResult::fail("Option does not belong to this poll"));
        }

        // One vote per named voter, enforced by the unique (poll_id, voter_id) index
        let voter_id = voter_id.map(str::trim).filter(|v| !v.is_empty());
        if !database::insert_vote(&self.pool, poll_id, option_id, voter_id).await? {
            return Ok(ServiceResult::fail(ALREADY_VOTED));
        }
        tracing::debug!(poll_id, option_id, "Vote recorded");

        Ok(ServiceResult::ok(VoteReceipt {
            poll_id: poll_id.to_string(),
            option_id,
        })
        .with_message("Vote recorded"))
    }

    pub async fn results(&self, poll_id: &str) -> Result<ServiceResult<PollResults>, sqlx::Error> {
        let Some(poll) = database::get_poll(&self.pool, poll_id).await? else {
            return Ok(ServiceResult::fail(POLL_NOT_FOUND));
        };

        let options: Vec<OptionTally> = database::tally(&self.pool, poll_id)
            .await?
            .into_iter()
            .map(|row| OptionTally {
                id: row.option_id,
                label: row.label,
                votes: row.votes,
            })
            .collect();
        let total_votes = options.iter().map(|o| o.votes).sum();

        Ok(ServiceResult::ok(PollResults {
            poll_id: poll.id,
            question: poll.question,
            total_votes,
            options,
        }))
    }

    pub async fn vote_count(&self, poll_id: &str) -> Result<ServiceResult<i64>, sqlx::Error> {
        if database::get_poll(&self.pool, poll_id).await?.is_none() {
            return Ok(ServiceResult::fail(POLL_NOT_FOUND));
        }
        Ok(ServiceResult::ok(database::count_votes(&self.pool, poll_id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn service() -> PollService {
        PollService::new(database::init_db("sqlite::memory:").await.unwrap())
    }

    #[rstest]
    #[case("", &["a", "b"], "Question is required")]
    #[case("Q?", &["a"], "between")]
    #[case("Q?", &["a", " "], "cannot be empty")]
    #[case("Q?", &["Yes", "yes"], "unique")]
    fn test_validate_new_poll_rejections(
        #[case] question: &str,
        #[case] options: &[&str],
        #[case] reason: &str,
    ) {
        let err = validate_new_poll(question, &strings(options)).unwrap_err();
        assert!(err.contains(reason), "{err}");
    }

    #[test]
    fn test_question_length_limit() {
        let long = "q".repeat(MAX_QUESTION_LEN + 1);
        assert!(validate_new_poll(&long, &strings(&["a", "b"])).is_err());
        let max = "q".repeat(MAX_QUESTION_LEN);
        assert!(validate_new_poll(&max, &strings(&["a", "b"])).is_ok());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(1000)), MAX_LIST_LIMIT);
    }

    #[tokio::test]
    async fn test_create_and_fetch_poll() {
        let polls = service().await;
        let created = polls
            .create_poll("Favorite season?", &strings(&["spring", "autumn"]))
            .await
            .unwrap();
        assert!(created.success);
        let poll = created.data.unwrap();
        assert_eq!(poll.options.len(), 2);

        let fetched = polls.get_poll(&poll.id).await.unwrap();
        assert_eq!(fetched.data, Some(poll));

        let missing = polls.get_poll("nope").await.unwrap();
        assert!(!missing.success);
        assert_eq!(missing.error.as_deref(), Some(POLL_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_invalid_poll_is_an_envelope() {
        let result = service().await.create_poll("", &[]).await.unwrap();
        assert!(!result.success);
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn test_vote_rules_and_results() {
        let polls = service().await;
        let poll = polls
            .create_poll("Cats or dogs?", &strings(&["cats", "dogs"]))
            .await
            .unwrap()
            .data
            .unwrap();
        let cats = poll.options[0].id;
        let dogs = poll.options[1].id;

        assert!(polls.cast_vote(&poll.id, cats, Some("ann")).await.unwrap().success);
        assert!(polls.cast_vote(&poll.id, dogs, None).await.unwrap().success);
        assert!(polls.cast_vote(&poll.id, dogs, Some("  ")).await.unwrap().success);

        let repeat = polls.cast_vote(&poll.id, dogs, Some("ann")).await.unwrap();
        assert_eq!(repeat.error.as_deref(), Some(ALREADY_VOTED));

        let foreign = polls.cast_vote(&poll.id, 9999, None).await.unwrap();
        assert_eq!(foreign.error.as_deref(), Some("Option does not belong to this poll"));

        let unknown = polls.cast_vote("nope", cats, None).await.unwrap();
        assert_eq!(unknown.error.as_deref(), Some(POLL_NOT_FOUND));

        let results = polls.results(&poll.id).await.unwrap().data.unwrap();
        assert_eq!(results.total_votes, 3);
        assert_eq!(results.options[0].votes, 1);
        assert_eq!(results.options[1].votes, 2);

        assert_eq!(polls.vote_count(&poll.id).await.unwrap().data, Some(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_votes_from_one_voter_count_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("ballot.db").display());
        let polls = PollService::new(database::init_db(&url).await.unwrap());

        let poll = polls
            .create_poll("Coffee or tea?", &strings(&["coffee", "tea"]))
            .await
            .unwrap()
            .data
            .unwrap();
        let coffee = poll.options[0].id;

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let polls = polls.clone();
                let poll_id = poll.id.clone();
                tokio::spawn(async move { polls.cast_vote(&poll_id, coffee, Some("ann")).await })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            let result = task.await.unwrap().unwrap();
            if result.success {
                accepted += 1;
            } else {
                assert_eq!(result.error.as_deref(), Some(ALREADY_VOTED));
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(polls.vote_count(&poll.id).await.unwrap().data, Some(1));
    }
}
