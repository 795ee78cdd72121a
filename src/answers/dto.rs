use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;

#[derive(Debug, Deserialize)]
pub struct NewAnswerRequest {
    pub answer: String,
    pub question_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AnswerCreated {
    pub id: i64,
}

/// The rating value is stored as given; there is deliberately no bounds
/// check on it.
#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub answer_id: i64,
    pub rate: i64,
}

#[derive(Debug, Serialize)]
pub struct RateCreated {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListByRateRequest {
    pub question_id: i64,
    pub page: Option<i64>,
}

/// A listed answer; `rate` is the rating count the listing is ordered by.
#[derive(Debug, Serialize)]
pub struct RatedAnswerItem {
    pub id: i64,
    pub answer: String,
    pub rate: i64,
    pub user: PublicUser,
}
