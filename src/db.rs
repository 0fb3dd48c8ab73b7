// src/db.rs
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewPoll, NewVote, Poll, PollOption, Vote};
use crate::store::PollStore;

pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<Pool<Postgres>, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Postgres-backed [`PollStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl PollStore for PgStore {
    async fn access_code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM polls WHERE access_code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        let row = sqlx::query_as::<_, Poll>(
            r#"
            INSERT INTO polls (id, creator_name, creator_email, question, deadline, show_realtime_results, access_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&poll.creator_name)
        .bind(&poll.creator_email)
        .bind(&poll.question)
        .bind(poll.deadline)
        .bind(poll.show_realtime_results)
        .bind(&poll.access_code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateAccessCode
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(row)
    }

    async fn insert_options(
        &self,
        poll_id: Uuid,
        options: &[String],
    ) -> Result<Vec<PollOption>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut rows = Vec::with_capacity(options.len());
        for (display_order, option_text) in options.iter().enumerate() {
            let row = sqlx::query_as::<_, PollOption>(
                r#"
                INSERT INTO poll_options (id, poll_id, option_text, display_order)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(poll_id)
            .bind(option_text)
            .bind(display_order as i32)
            .fetch_one(&mut *tx)
            .await?;
            rows.push(row);
        }
        tx.commit().await?;
        Ok(rows)
    }

    async fn delete_poll(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM polls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_poll(&self, id: Uuid) -> Result<Option<Poll>, StoreError> {
        let poll = sqlx::query_as::<_, Poll>("SELECT * FROM polls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(poll)
    }

    async fn get_poll_by_code(&self, code: &str) -> Result<Option<Poll>, StoreError> {
        let poll = sqlx::query_as::<_, Poll>("SELECT * FROM polls WHERE access_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(poll)
    }

    async fn list_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>, StoreError> {
        let options = sqlx::query_as::<_, PollOption>(
            "SELECT * FROM poll_options WHERE poll_id = $1 ORDER BY display_order ASC",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }

    async fn option_belongs_to_poll(
        &self,
        poll_id: Uuid,
        option_id: Uuid,
    ) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM poll_options WHERE id = $1 AND poll_id = $2)",
        )
        .bind(option_id)
        .bind(poll_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote, StoreError> {
        sqlx::query_as::<_, Vote>(
            r#"
            INSERT INTO votes (id, poll_id, poll_option_id, voter_name, voter_email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vote.poll_id)
        .bind(vote.poll_option_id)
        .bind(&vote.voter_name)
        .bind(&vote.voter_email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateVote
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn list_votes(&self, poll_id: Uuid) -> Result<Vec<Vote>, StoreError> {
        let votes = sqlx::query_as::<_, Vote>(
            "SELECT * FROM votes WHERE poll_id = $1 ORDER BY submitted_at ASC",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(votes)
    }
}
