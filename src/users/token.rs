use rand::rngs::OsRng;
use rand::RngCore;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use crate::error::ApiError;
use crate::models::User;
use crate::store::Store;

/// Length of a serialized access token: 32 random bytes, hex-encoded.
pub const TOKEN_LEN: usize = 64;

/// A fresh random token. Uniqueness is backstopped by the store's
/// constraint on the token column.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_LEN / 2];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issue a token for `user` and persist it with its expiry on the user
/// record. The expiry is absolute; nothing extends it later.
pub async fn issue(
    store: &dyn Store,
    user: &User,
    ttl_minutes: i64,
) -> Result<(String, OffsetDateTime), ApiError> {
    let token = generate();
    let expires_at = OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes);
    store.save_token(user.id, &token, expires_at).await?;
    Ok((token, expires_at))
}

/// Resolve a presented token to its owner. The length check runs before
/// any lookup; an unknown token and an expired one are indistinguishable
/// to the caller.
pub async fn validate(store: &dyn Store, presented: &str) -> Result<User, ApiError> {
    if presented.len() != TOKEN_LEN {
        return Err(ApiError::Unauthorized);
    }

    let user = store
        .user_by_token(presented)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let expires_at = user.token_expires_at.ok_or(ApiError::Unauthorized)?;
    if OffsetDateTime::now_utc() >= expires_at {
        return Err(ApiError::Unauthorized);
    }

    Ok(user)
}

/// Expiry timestamp as it appears in the login response.
pub fn format_expiration(at: OffsetDateTime) -> Result<String, ApiError> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    at.format(&format).map_err(|e| {
        tracing::error!(error = %e, "format token expiration");
        ApiError::Internal
    })
}
