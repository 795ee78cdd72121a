use sqlx::FromRow;
use time::OffsetDateTime;

// Storage rows only. Public JSON shapes live in each module's dto types,
// so credentials and token state cannot end up on the wire.

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub access_token: Option<String>,
    pub token_expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Answer {
    pub id: i64,
    pub answer: String,
    pub question_id: i64,
    pub user_id: i64,
}

/// An answer together with its rating count, as produced by the by-rate
/// listing. The count is the ordering key.
#[derive(Debug, Clone, FromRow)]
pub struct RatedAnswer {
    #[sqlx(flatten)]
    pub answer: Answer,
    pub rate_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct AnswerRate {
    pub id: i64,
    pub user_id: i64,
    pub answer_id: i64,
    /// Copied from the answer at creation time, not a live reference.
    pub question_id: i64,
    pub rate: i64,
}
