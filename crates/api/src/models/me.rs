use serde::Serialize;
use services::{Dashboard, StudyActivity};

use super::{AttemptResponse, EnrolledCourseResponse, UserResponse, streak_change_label};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummaryResponse {
    pub attempts: u64,
    pub passed: u64,
    pub average_percentage: Option<f64>,
    pub best_percentage: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user: UserResponse,
    pub courses: Vec<EnrolledCourseResponse>,
    pub average_mastery: Option<f64>,
    pub attempts: AttemptSummaryResponse,
    pub recent_attempts: Vec<AttemptResponse>,
}

impl From<Dashboard> for DashboardResponse {
    fn from(dashboard: Dashboard) -> Self {
        let average_mastery = dashboard.average_mastery();
        Self {
            user: UserResponse::from(&dashboard.user),
            courses: dashboard.courses.iter().map(Into::into).collect(),
            average_mastery,
            attempts: AttemptSummaryResponse {
                attempts: dashboard.attempts.attempts,
                passed: dashboard.attempts.passed,
                average_percentage: dashboard.attempts.average_percentage,
                best_percentage: dashboard.attempts.best_percentage,
            },
            recent_attempts: dashboard
                .recent_attempts
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub streak_change: &'static str,
    pub points_awarded: u32,
    pub points: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl From<StudyActivity> for ActivityResponse {
    fn from(activity: StudyActivity) -> Self {
        Self {
            streak_change: streak_change_label(activity.change),
            points_awarded: activity.points_awarded,
            points: activity.user.points(),
            current_streak: activity.user.streak().current(),
            longest_streak: activity.user.streak().longest(),
        }
    }
}
