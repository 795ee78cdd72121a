use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{Store, StoreError, StoreResult};
use crate::listing::{OrderDir, Page};
use crate::models::{Answer, AnswerRate, Question, RatedAnswer, User};

/// In-memory store used by tests in place of Postgres. Observable
/// semantics mirror [`super::PgStore`]: uniqueness of email, token, and
/// rating pair is enforced at write time, and ranked listings order by
/// derived count with ties broken on id ascending.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    rates: Vec<AnswerRate>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("mem store poisoned")
    }
}

fn rank<T>(mut scored: Vec<(i64, T)>, dir: OrderDir, id: impl Fn(&T) -> i64) -> Vec<T> {
    scored.sort_by(|(count_a, a), (count_b, b)| {
        let by_count = match dir {
            OrderDir::Desc => count_b.cmp(count_a),
            OrderDir::Asc => count_a.cmp(count_b),
        };
        by_count.then(id(a).cmp(&id(b)))
    });
    scored.into_iter().map(|(_, item)| item).collect()
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

#[async_trait]
impl Store for MemStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<User> {
        let mut inner = self.lock();
        if inner.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: inner.users.len() as i64 + 1,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            access_token: None,
            token_expires_at: None,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn user_by_credentials(
        &self,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.email == email && u.password_hash == password_hash)
            .cloned())
    }

    async fn user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.access_token.as_deref() == Some(token))
            .cloned())
    }

    async fn save_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner
            .users
            .iter()
            .any(|u| u.id != user_id && u.access_token.as_deref() == Some(token))
        {
            return Err(StoreError::Duplicate);
        }
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no such user")))?;
        user.access_token = Some(token.to_string());
        user.token_expires_at = Some(expires_at);
        Ok(())
    }

    async fn users_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn users_by_answer_count(&self, page: Page, dir: OrderDir) -> StoreResult<Vec<User>> {
        let inner = self.lock();
        let scored = inner
            .users
            .iter()
            .map(|u| {
                let count = inner.answers.iter().filter(|a| a.user_id == u.id).count() as i64;
                (count, u.clone())
            })
            .collect();
        Ok(paginate(rank(scored, dir, |u: &User| u.id), page))
    }

    async fn create_question(&self, question: &str, user_id: i64) -> StoreResult<Question> {
        let mut inner = self.lock();
        let row = Question {
            id: inner.questions.len() as i64 + 1,
            question: question.to_string(),
            user_id,
        };
        inner.questions.push(row.clone());
        Ok(row)
    }

    async fn question_by_id(&self, id: i64) -> StoreResult<Option<Question>> {
        Ok(self.lock().questions.iter().find(|q| q.id == id).cloned())
    }

    async fn questions_by_answer_count(
        &self,
        page: Page,
        dir: OrderDir,
    ) -> StoreResult<Vec<Question>> {
        let inner = self.lock();
        let scored = inner
            .questions
            .iter()
            .map(|q| {
                let count = inner.answers.iter().filter(|a| a.question_id == q.id).count() as i64;
                (count, q.clone())
            })
            .collect();
        Ok(paginate(rank(scored, dir, |q: &Question| q.id), page))
    }

    async fn answers_for_questions(&self, question_ids: &[i64]) -> StoreResult<Vec<Answer>> {
        let mut rows: Vec<Answer> = self
            .lock()
            .answers
            .iter()
            .filter(|a| question_ids.contains(&a.question_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn create_answer(
        &self,
        answer: &str,
        question_id: i64,
        user_id: i64,
    ) -> StoreResult<Answer> {
        let mut inner = self.lock();
        let row = Answer {
            id: inner.answers.len() as i64 + 1,
            answer: answer.to_string(),
            question_id,
            user_id,
        };
        inner.answers.push(row.clone());
        Ok(row)
    }

    async fn answer_by_id(&self, id: i64) -> StoreResult<Option<Answer>> {
        Ok(self.lock().answers.iter().find(|a| a.id == id).cloned())
    }

    async fn answers_by_rate_count(
        &self,
        question_id: i64,
        page: Page,
        dir: OrderDir,
    ) -> StoreResult<Vec<RatedAnswer>> {
        let inner = self.lock();
        let scored = inner
            .answers
            .iter()
            .filter(|a| a.question_id == question_id)
            .map(|a| {
                let count = inner.rates.iter().filter(|r| r.answer_id == a.id).count() as i64;
                (
                    count,
                    RatedAnswer {
                        answer: a.clone(),
                        rate_count: count,
                    },
                )
            })
            .collect();
        Ok(paginate(
            rank(scored, dir, |r: &RatedAnswer| r.answer.id),
            page,
        ))
    }

    async fn rate_by_answer_and_user(
        &self,
        answer_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<AnswerRate>> {
        Ok(self
            .lock()
            .rates
            .iter()
            .find(|r| r.answer_id == answer_id && r.user_id == user_id)
            .cloned())
    }

    async fn create_rate(
        &self,
        user_id: i64,
        answer_id: i64,
        question_id: i64,
        rate: i64,
    ) -> StoreResult<AnswerRate> {
        let mut inner = self.lock();
        if inner
            .rates
            .iter()
            .any(|r| r.answer_id == answer_id && r.user_id == user_id)
        {
            return Err(StoreError::Duplicate);
        }
        let row = AnswerRate {
            id: inner.rates.len() as i64 + 1,
            user_id,
            answer_id,
            question_id,
            rate,
        };
        inner.rates.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::PAGE_SIZE;

    async fn seeded() -> MemStore {
        let store = MemStore::new();
        // Seven users; user N authors N answers against a single question
        // owned by user 1, so the by-answer ranking is fully determined.
        let q_owner = store.create_user("u1", "u1@x.com", "h").await.unwrap();
        let question = store.create_question("q", q_owner.id).await.unwrap();
        for n in 2..=7 {
            let user = store
                .create_user(&format!("u{n}"), &format!("u{n}@x.com"), "h")
                .await
                .unwrap();
            for _ in 0..n {
                store.create_answer("a", question.id, user.id).await.unwrap();
            }
        }
        store
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_at_the_store_layer() {
        // The handler pre-check normally reports the conflict; this is the
        // constraint that closes the read-then-write race window.
        let store = MemStore::new();
        store.create_user("a", "a@x.com", "h1").await.unwrap();
        let err = store.create_user("b", "a@x.com", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn duplicate_token_is_rejected_at_the_store_layer() {
        let store = MemStore::new();
        let a = store.create_user("a", "a@x.com", "h").await.unwrap();
        let b = store.create_user("b", "b@x.com", "h").await.unwrap();
        let now = OffsetDateTime::now_utc();
        store.save_token(a.id, "t1", now).await.unwrap();
        let err = store.save_token(b.id, "t1", now).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        // Re-issuing the same user's token is an update, not a conflict.
        store.save_token(a.id, "t1", now).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_rating_pair_is_rejected_at_the_store_layer() {
        let store = MemStore::new();
        let user = store.create_user("a", "a@x.com", "h").await.unwrap();
        let q = store.create_question("q", user.id).await.unwrap();
        let answer = store.create_answer("a", q.id, user.id).await.unwrap();
        store.create_rate(user.id, answer.id, q.id, 1).await.unwrap();
        let err = store
            .create_rate(user.id, answer.id, q.id, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn users_rank_by_answer_count_in_both_directions() {
        let store = seeded().await;
        let page = Page::first(10);

        let desc = store
            .users_by_answer_count(page, OrderDir::Desc)
            .await
            .unwrap();
        let names: Vec<&str> = desc.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["u7", "u6", "u5", "u4", "u3", "u2", "u1"]);

        let asc = store
            .users_by_answer_count(page, OrderDir::Asc)
            .await
            .unwrap();
        let names: Vec<&str> = asc.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["u1", "u2", "u3", "u4", "u5", "u6", "u7"]);
    }

    #[tokio::test]
    async fn ties_break_on_id_ascending_in_either_direction() {
        let store = MemStore::new();
        let user = store.create_user("a", "a@x.com", "h").await.unwrap();
        // Three questions with one answer each, one with none.
        for _ in 0..4 {
            store.create_question("q", user.id).await.unwrap();
        }
        for qid in 1..=3 {
            store.create_answer("a", qid, user.id).await.unwrap();
        }

        let page = Page::first(10);
        let desc = store
            .questions_by_answer_count(page, OrderDir::Desc)
            .await
            .unwrap();
        let ids: Vec<i64> = desc.iter().map(|q| q.id).collect();
        assert_eq!(ids, [1, 2, 3, 4]);

        let asc = store
            .questions_by_answer_count(page, OrderDir::Asc)
            .await
            .unwrap();
        let ids: Vec<i64> = asc.iter().map(|q| q.id).collect();
        assert_eq!(ids, [4, 1, 2, 3]);
    }

    #[tokio::test]
    async fn consecutive_pages_neither_duplicate_nor_drop_rows() {
        let store = seeded().await;

        let first = store
            .users_by_answer_count(Page::new(Some(1), PAGE_SIZE), OrderDir::Desc)
            .await
            .unwrap();
        let second = store
            .users_by_answer_count(Page::new(Some(2), PAGE_SIZE), OrderDir::Desc)
            .await
            .unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 2);

        let mut seen: Vec<i64> = first.iter().chain(&second).map(|u| u.id).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 7, "pages must partition the full result set");

        // Repeating the calls yields the identical ordering.
        let again = store
            .users_by_answer_count(Page::new(Some(1), PAGE_SIZE), OrderDir::Desc)
            .await
            .unwrap();
        let ids: Vec<i64> = first.iter().map(|u| u.id).collect();
        let again_ids: Vec<i64> = again.iter().map(|u| u.id).collect();
        assert_eq!(ids, again_ids);
    }

    #[tokio::test]
    async fn pages_past_the_end_are_empty() {
        let store = seeded().await;
        let rows = store
            .users_by_answer_count(Page::new(Some(99), PAGE_SIZE), OrderDir::Desc)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn answers_for_questions_come_newest_first() {
        let store = MemStore::new();
        let user = store.create_user("a", "a@x.com", "h").await.unwrap();
        let q = store.create_question("q", user.id).await.unwrap();
        for _ in 0..3 {
            store.create_answer("a", q.id, user.id).await.unwrap();
        }
        let rows = store.answers_for_questions(&[q.id]).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|a| a.id).collect();
        assert_eq!(ids, [3, 2, 1]);
    }

    #[tokio::test]
    async fn rated_answers_carry_their_rating_count() {
        let store = MemStore::new();
        let user = store.create_user("a", "a@x.com", "h").await.unwrap();
        let rater = store.create_user("b", "b@x.com", "h").await.unwrap();
        let q = store.create_question("q", user.id).await.unwrap();
        let one = store.create_answer("a1", q.id, user.id).await.unwrap();
        let two = store.create_answer("a2", q.id, user.id).await.unwrap();
        store.create_rate(user.id, two.id, q.id, 1).await.unwrap();
        store.create_rate(rater.id, two.id, q.id, 1).await.unwrap();
        store.create_rate(rater.id, one.id, q.id, 1).await.unwrap();

        let rows = store
            .answers_by_rate_count(q.id, Page::first(PAGE_SIZE), OrderDir::Desc)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].answer.id, two.id);
        assert_eq!(rows[0].rate_count, 2);
        assert_eq!(rows[1].answer.id, one.id);
        assert_eq!(rows[1].rate_count, 1);
    }
}
