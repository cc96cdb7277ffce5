use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use services::AuthSession;
use study_core::model::{Level, StudentProfile, User, UserId};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub university: Option<String>,
    pub department: Option<String>,
    pub level: Option<u16>,
}

impl RegisterRequest {
    pub fn profile(&self) -> Result<StudentProfile, ApiError> {
        Ok(StudentProfile {
            university: self.university.clone(),
            department: self.department.clone(),
            level: self.level.map(Level::new).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: &'static str,
    pub university: Option<String>,
    pub department: Option<String>,
    pub level: Option<u16>,
    pub points: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        let profile = user.profile();
        Self {
            id: user.id(),
            email: user.email().as_str().to_string(),
            full_name: user.full_name().to_string(),
            role: user.role().as_str(),
            university: profile.university.clone(),
            department: profile.department.clone(),
            level: profile.level.map(Level::value),
            points: user.points(),
            current_streak: user.streak().current(),
            longest_streak: user.streak().longest(),
            last_study_date: user.last_study_date(),
            is_active: user.is_active(),
            created_at: user.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token_type: &'static str,
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user: UserResponse::from(&session.user),
            token_type: "Bearer",
            access_token: session.access_token,
            access_expires_at: session.access_expires_at,
            refresh_token: session.refresh_token,
            refresh_expires_at: session.refresh_expires_at,
        }
    }
}
