use serde::{Deserialize, Serialize};

use crate::models::User;

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expiration: String,
}

#[derive(Debug, Serialize)]
pub struct Registered {
    pub id: i64,
}

/// Public part of a user. Hash and token state never leave the models.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
