use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;
use crate::auth::resolver::CurrentUser;
use crate::plan::Plan;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User as returned to the client; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub plan: Plan,
    pub sermons_this_month: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub last_reset_date: OffsetDateTime,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            plan: u.plan,
            sermons_this_month: u.sermons_this_month,
            last_reset_date: u.last_reset_date,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<CurrentUser> for PublicUser {
    fn from(u: CurrentUser) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            plan: u.plan,
            sermons_this_month: u.sermons_this_month,
            last_reset_date: u.last_reset_date,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
