use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::listing::{OrderDir, Page};
use crate::models::{Answer, AnswerRate, Question, RatedAnswer, User};

mod mem;
mod pg;

pub use mem::MemStore;
pub use pg::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (email, token, or
    /// rating pair).
    #[error("duplicate row")]
    Duplicate,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
                return StoreError::Duplicate;
            }
        }
        StoreError::Backend(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The relational store behind every component, injected into `AppState`
/// so tests can swap in [`MemStore`]. All coordination between concurrent
/// requests happens here; handlers keep no shared state of their own.
#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn create_user(&self, name: &str, email: &str, password_hash: &str)
        -> StoreResult<User>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn user_by_credentials(&self, email: &str, password_hash: &str)
        -> StoreResult<Option<User>>;
    async fn user_by_token(&self, token: &str) -> StoreResult<Option<User>>;
    async fn save_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<()>;
    /// Batch point-lookup used for owner expansion; order is unspecified.
    async fn users_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<User>>;
    /// Users ranked by how many answers they authored. Ties break on id
    /// ascending in either direction.
    async fn users_by_answer_count(&self, page: Page, dir: OrderDir) -> StoreResult<Vec<User>>;

    // questions
    async fn create_question(&self, question: &str, user_id: i64) -> StoreResult<Question>;
    async fn question_by_id(&self, id: i64) -> StoreResult<Option<Question>>;
    /// Questions ranked by attached-answer count; ties break on id ascending.
    async fn questions_by_answer_count(
        &self,
        page: Page,
        dir: OrderDir,
    ) -> StoreResult<Vec<Question>>;
    /// All answers belonging to the given questions, newest first (id desc).
    async fn answers_for_questions(&self, question_ids: &[i64]) -> StoreResult<Vec<Answer>>;

    // answers
    async fn create_answer(
        &self,
        answer: &str,
        question_id: i64,
        user_id: i64,
    ) -> StoreResult<Answer>;
    async fn answer_by_id(&self, id: i64) -> StoreResult<Option<Answer>>;
    /// Answers of one question ranked by rating count; ties break on id
    /// ascending.
    async fn answers_by_rate_count(
        &self,
        question_id: i64,
        page: Page,
        dir: OrderDir,
    ) -> StoreResult<Vec<RatedAnswer>>;

    // ratings
    async fn rate_by_answer_and_user(
        &self,
        answer_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<AnswerRate>>;
    async fn create_rate(
        &self,
        user_id: i64,
        answer_id: i64,
        question_id: i64,
        rate: i64,
    ) -> StoreResult<AnswerRate>;
}
