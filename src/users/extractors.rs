use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::token;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Validated caller of an authenticated endpoint. Extraction runs the
/// token validator against the `access-token` header; handlers receive
/// the resolved user and perform no further auth work.
#[derive(Debug)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get("access-token")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        let user = token::validate(state.store.as_ref(), presented).await?;
        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::users::token::TOKEN_LEN;
    use axum::http::Request;
    use time::{Duration, OffsetDateTime};

    fn parts_with_token(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(token) = token {
            builder = builder.header("access-token", token);
        }
        builder.body(()).unwrap().into_parts().0
    }

    async fn state_with_logged_in_user() -> (AppState, String) {
        let state = AppState::fake();
        let user = state
            .store
            .create_user("a", "a@x.com", "h")
            .await
            .unwrap();
        let token = token::generate();
        state
            .store
            .save_token(
                user.id,
                &token,
                OffsetDateTime::now_utc() + Duration::minutes(10),
            )
            .await
            .unwrap();
        (state, token)
    }

    #[tokio::test]
    async fn valid_token_resolves_the_user() {
        let (state, token) = state_with_logged_in_user().await;
        let mut parts = parts_with_token(Some(&token));
        let AuthUser(user) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("valid token");
        assert_eq!(user.email, "a@x.com");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let (state, _) = state_with_logged_in_user().await;
        let mut parts = parts_with_token(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
    }

    #[tokio::test]
    async fn malformed_token_is_unauthorized() {
        let (state, _) = state_with_logged_in_user().await;
        let mut parts = parts_with_token(Some("short"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let state = AppState::fake();
        let user = state
            .store
            .create_user("a", "a@x.com", "h")
            .await
            .unwrap();
        let token = "e".repeat(TOKEN_LEN);
        state
            .store
            .save_token(
                user.id,
                &token,
                OffsetDateTime::now_utc() - Duration::seconds(1),
            )
            .await
            .unwrap();

        let mut parts = parts_with_token(Some(&token));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
    }
}
