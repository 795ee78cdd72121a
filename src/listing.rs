use std::collections::HashMap;

use crate::error::ApiError;
use crate::models::User;
use crate::store::Store;

/// Every listing in the API serves five rows per page.
pub const PAGE_SIZE: i64 = 5;

/// A 1-based page over a ranked listing. Requested values of one or less
/// (or an absent value) land on the first page; pages past the end of the
/// data yield empty results, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: i64,
    size: i64,
}

impl Page {
    pub fn new(requested: Option<i64>, size: i64) -> Self {
        let number = requested.unwrap_or(1).max(1);
        Self { number, size }
    }

    pub fn first(size: i64) -> Self {
        Self::new(None, size)
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }
}

/// Direction of a ranked listing. The SQL fragment comes from this closed
/// enum, never from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    Desc,
}

impl OrderDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDir::Asc => "ASC",
            OrderDir::Desc => "DESC",
        }
    }
}

/// Owner expansion for a page of ranked rows: one batched round trip over
/// the distinct owner ids. Any missing owner fails the whole listing;
/// there is no partial result.
pub async fn owners_by_id(
    store: &dyn Store,
    ids: impl Iterator<Item = i64>,
) -> Result<HashMap<i64, User>, ApiError> {
    let mut distinct: Vec<i64> = ids.collect();
    distinct.sort_unstable();
    distinct.dedup();

    let users = store.users_by_ids(&distinct).await?;
    let owners: HashMap<i64, User> = users.into_iter().map(|u| (u.id, u)).collect();
    if owners.len() != distinct.len() {
        tracing::error!("owner lookup came back short for a listing page");
        return Err(ApiError::Internal);
    }
    Ok(owners)
}
