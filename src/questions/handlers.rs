use std::collections::HashMap;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{AnswerSummary, ListRequest, NewQuestionRequest, QuestionCreated, QuestionItem};
use crate::error::ApiError;
use crate::json::ApiJson;
use crate::listing::{owners_by_id, OrderDir, Page, PAGE_SIZE};
use crate::state::AppState;
use crate::store::Store;
use crate::users::extractors::AuthUser;

pub fn question_routes() -> Router<AppState> {
    Router::new()
        .route("/question/new", post(post_question))
        .route("/question/list/byanswers", get(list_by_answers))
}

#[instrument(skip(state, user, payload))]
pub async fn post_question(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<NewQuestionRequest>,
) -> Result<Json<QuestionCreated>, ApiError> {
    let question = state
        .store
        .create_question(&payload.question, user.id)
        .await?;

    info!(question_id = question.id, user_id = user.id, "question posted");
    Ok(Json(QuestionCreated { id: question.id }))
}

#[instrument(skip(state, _user, payload))]
pub async fn list_by_answers(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiJson(payload): ApiJson<ListRequest>,
) -> Result<Json<Vec<QuestionItem>>, ApiError> {
    let page = Page::new(payload.page, PAGE_SIZE);
    let questions = state
        .store
        .questions_by_answer_count(page, OrderDir::Desc)
        .await?;
    if questions.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let owners = owners_by_id(state.store.as_ref(), questions.iter().map(|q| q.user_id)).await?;

    let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let mut answers_by_question: HashMap<i64, Vec<AnswerSummary>> = HashMap::new();
    for answer in state.store.answers_for_questions(&question_ids).await? {
        answers_by_question
            .entry(answer.question_id)
            .or_default()
            .push(AnswerSummary {
                id: answer.id,
                answer: answer.answer,
                user: None,
            });
    }

    let items = questions
        .into_iter()
        .map(|q| {
            let owner = owners.get(&q.user_id).ok_or(ApiError::Internal)?;
            Ok(QuestionItem {
                id: q.id,
                question: q.question,
                user: owner.into(),
                answers: answers_by_question.remove(&q.id).unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(items))
}
