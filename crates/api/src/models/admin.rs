use serde::{Deserialize, Serialize};
use services::AdminStats;
use storage::repository::UserFilter;
use study_core::model::Role;

use super::{PageParams, non_blank};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub users: u64,
    pub active_users: u64,
    pub students: u64,
    pub admins: u64,
    pub studied_today: u64,
    pub courses: u64,
    pub materials: u64,
    pub quizzes: u64,
    pub published_quizzes: u64,
    pub attempts: u64,
    pub passed_attempts: u64,
    pub pass_rate: Option<f64>,
    pub average_percentage: Option<f64>,
}

impl From<AdminStats> for StatsResponse {
    fn from(stats: AdminStats) -> Self {
        let p = stats.platform;
        Self {
            users: p.users,
            active_users: p.active_users,
            students: p.students,
            admins: p.admins,
            studied_today: p.studied_today,
            courses: p.courses,
            materials: p.materials,
            quizzes: p.quizzes,
            published_quizzes: p.published_quizzes,
            attempts: p.attempts,
            passed_attempts: p.passed_attempts,
            pass_rate: stats.pass_rate,
            average_percentage: p.average_percentage,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl UserQuery {
    pub fn filter(&self) -> Result<UserFilter, ApiError> {
        Ok(UserFilter {
            search: non_blank(self.search.clone()),
            role: non_blank(self.role.clone())
                .map(|r| Role::parse(&r))
                .transpose()?,
        })
    }

    pub fn page(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct PointsRequest {
    pub points: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}
