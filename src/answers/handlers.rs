use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{
    AnswerCreated, ListByRateRequest, NewAnswerRequest, RateCreated, RateRequest, RatedAnswerItem,
};
use crate::error::ApiError;
use crate::json::ApiJson;
use crate::listing::{owners_by_id, OrderDir, Page, PAGE_SIZE};
use crate::state::AppState;
use crate::store::Store;
use crate::users::extractors::AuthUser;

pub fn answer_routes() -> Router<AppState> {
    Router::new()
        .route("/answer/new", post(post_answer))
        .route("/answer/rate", post(rate_answer))
        .route("/answer/list/byrate", get(list_by_rate))
}

#[instrument(skip(state, user, payload))]
pub async fn post_answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<NewAnswerRequest>,
) -> Result<Json<AnswerCreated>, ApiError> {
    let question = state
        .store
        .question_by_id(payload.question_id)
        .await?
        .ok_or_else(|| {
            warn!(question_id = payload.question_id, "answer to unknown question");
            ApiError::BadRequest
        })?;

    let answer = state
        .store
        .create_answer(&payload.answer, question.id, user.id)
        .await?;

    info!(
        answer_id = answer.id,
        question_id = question.id,
        user_id = user.id,
        "answer posted"
    );
    Ok(Json(AnswerCreated { id: answer.id }))
}

#[instrument(skip(state, user, payload))]
pub async fn rate_answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<RateRequest>,
) -> Result<Json<RateCreated>, ApiError> {
    let answer = state
        .store
        .answer_by_id(payload.answer_id)
        .await?
        .ok_or_else(|| {
            warn!(answer_id = payload.answer_id, "rating for unknown answer");
            ApiError::BadRequest
        })?;

    if state
        .store
        .rate_by_answer_and_user(answer.id, user.id)
        .await?
        .is_some()
    {
        warn!(answer_id = answer.id, user_id = user.id, "answer already rated");
        return Err(ApiError::Conflict);
    }

    // The question id is denormalized onto the rating row at write time.
    let rate = state
        .store
        .create_rate(user.id, answer.id, answer.question_id, payload.rate)
        .await?;

    info!(rate_id = rate.id, answer_id = answer.id, user_id = user.id, "answer rated");
    Ok(Json(RateCreated { id: rate.id }))
}

#[instrument(skip(state, _user, payload))]
pub async fn list_by_rate(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ApiJson(payload): ApiJson<ListByRateRequest>,
) -> Result<Json<Vec<RatedAnswerItem>>, ApiError> {
    let question = state
        .store
        .question_by_id(payload.question_id)
        .await?
        .ok_or_else(|| {
            warn!(question_id = payload.question_id, "listing for unknown question");
            ApiError::BadRequest
        })?;

    let page = Page::new(payload.page, PAGE_SIZE);
    let rows = state
        .store
        .answers_by_rate_count(question.id, page, OrderDir::Desc)
        .await?;
    if rows.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let owners = owners_by_id(state.store.as_ref(), rows.iter().map(|r| r.answer.user_id)).await?;

    let items = rows
        .into_iter()
        .map(|row| {
            let owner = owners.get(&row.answer.user_id).ok_or(ApiError::Internal)?;
            Ok(RatedAnswerItem {
                id: row.answer.id,
                answer: row.answer.answer,
                rate: row.rate_count,
                user: owner.into(),
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(items))
}
