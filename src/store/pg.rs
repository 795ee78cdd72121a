use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::{Store, StoreResult};
use crate::listing::{OrderDir, Page};
use crate::models::{Answer, AnswerRate, Question, RatedAnswer, User};

/// Production store over a Postgres pool. Uniqueness (email, token,
/// rating pair) is backstopped by schema constraints; violations surface
/// as `StoreError::Duplicate`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, access_token, token_expires_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, access_token, token_expires_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_credentials(
        &self,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, access_token, token_expires_at
            FROM users
            WHERE email = $1 AND password_hash = $2
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, access_token, token_expires_at
            FROM users
            WHERE access_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn save_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET access_token = $1, token_expires_at = $2
            WHERE id = $3
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn users_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, access_token, token_expires_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn users_by_answer_count(&self, page: Page, dir: OrderDir) -> StoreResult<Vec<User>> {
        let query = format!(
            r#"
            SELECT u.id, u.name, u.email, u.password_hash, u.access_token, u.token_expires_at
            FROM users u
            ORDER BY (SELECT COUNT(*) FROM answers a WHERE a.user_id = u.id) {}, u.id ASC
            LIMIT $1 OFFSET $2
            "#,
            dir.as_sql()
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create_question(&self, question: &str, user_id: i64) -> StoreResult<Question> {
        let row = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (question, user_id)
            VALUES ($1, $2)
            RETURNING id, question, user_id
            "#,
        )
        .bind(question)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn question_by_id(&self, id: i64) -> StoreResult<Option<Question>> {
        let row = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, question, user_id
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn questions_by_answer_count(
        &self,
        page: Page,
        dir: OrderDir,
    ) -> StoreResult<Vec<Question>> {
        let query = format!(
            r#"
            SELECT q.id, q.question, q.user_id
            FROM questions q
            ORDER BY (SELECT COUNT(*) FROM answers a WHERE a.question_id = q.id) {}, q.id ASC
            LIMIT $1 OFFSET $2
            "#,
            dir.as_sql()
        );
        let rows = sqlx::query_as::<_, Question>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn answers_for_questions(&self, question_ids: &[i64]) -> StoreResult<Vec<Answer>> {
        let rows = sqlx::query_as::<_, Answer>(
            r#"
            SELECT id, answer, question_id, user_id
            FROM answers
            WHERE question_id = ANY($1)
            ORDER BY id DESC
            "#,
        )
        .bind(question_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_answer(
        &self,
        answer: &str,
        question_id: i64,
        user_id: i64,
    ) -> StoreResult<Answer> {
        let row = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers (answer, question_id, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, answer, question_id, user_id
            "#,
        )
        .bind(answer)
        .bind(question_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn answer_by_id(&self, id: i64) -> StoreResult<Option<Answer>> {
        let row = sqlx::query_as::<_, Answer>(
            r#"
            SELECT id, answer, question_id, user_id
            FROM answers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn answers_by_rate_count(
        &self,
        question_id: i64,
        page: Page,
        dir: OrderDir,
    ) -> StoreResult<Vec<RatedAnswer>> {
        let query = format!(
            r#"
            SELECT a.id, a.answer, a.question_id, a.user_id,
                   (SELECT COUNT(*) FROM answer_rates r WHERE r.answer_id = a.id) AS rate_count
            FROM answers a
            WHERE a.question_id = $1
            ORDER BY rate_count {}, a.id ASC
            LIMIT $2 OFFSET $3
            "#,
            dir.as_sql()
        );
        let rows = sqlx::query_as::<_, RatedAnswer>(&query)
            .bind(question_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn rate_by_answer_and_user(
        &self,
        answer_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<AnswerRate>> {
        let row = sqlx::query_as::<_, AnswerRate>(
            r#"
            SELECT id, user_id, answer_id, question_id, rate
            FROM answer_rates
            WHERE answer_id = $1 AND user_id = $2
            "#,
        )
        .bind(answer_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_rate(
        &self,
        user_id: i64,
        answer_id: i64,
        question_id: i64,
        rate: i64,
    ) -> StoreResult<AnswerRate> {
        let row = sqlx::query_as::<_, AnswerRate>(
            r#"
            INSERT INTO answer_rates (user_id, answer_id, question_id, rate)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, answer_id, question_id, rate
            "#,
        )
        .bind(user_id)
        .bind(answer_id)
        .bind(question_id)
        .bind(rate)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
