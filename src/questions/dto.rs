use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;

#[derive(Debug, Deserialize)]
pub struct NewQuestionRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionCreated {
    pub id: i64,
}

/// Body of the by-answers listing; pages of one or less land on page one.
#[derive(Debug, Deserialize)]
pub struct ListRequest {
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct QuestionItem {
    pub id: i64,
    pub question: String,
    pub user: PublicUser,
    pub answers: Vec<AnswerSummary>,
}

/// An answer embedded under its question. Owners are attached only to
/// primary listing rows, so `user` serializes as null here.
#[derive(Debug, Serialize)]
pub struct AnswerSummary {
    pub id: i64,
    pub answer: String,
    pub user: Option<PublicUser>,
}
