use serde::Deserialize;

// Salt carried over from the previous deployment so existing password
// hashes keep matching.
const DEFAULT_PASSWORD_SALT: &str = "CwQaBVVCcDrvb2dJ";

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub password_salt: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let auth = AuthConfig {
            password_salt: std::env::var("PASSWORD_SALT")
                .unwrap_or_else(|_| DEFAULT_PASSWORD_SALT.into()),
            token_ttl_minutes: std::env::var("TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(10),
        };
        Ok(Self { database_url, auth })
    }
}
