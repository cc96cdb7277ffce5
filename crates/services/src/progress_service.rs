use std::sync::Arc;

use storage::repository::{
    AttemptRepository, AttemptSummary, CourseRepository, EnrolledCourse, StorageError,
    StudyCredit, UserRepository,
};
use study_core::model::{PageRequest, QuizAttempt, StreakChange, User, UserId};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Points granted for the first study activity of a day.
pub const DAILY_STUDY_POINTS: u32 = 5;
const DASHBOARD_RECENT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyActivity {
    pub user: User,
    pub change: StreakChange,
    pub points_awarded: u32,
}

/// Everything the student dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub user: User,
    pub courses: Vec<EnrolledCourse>,
    pub attempts: AttemptSummary,
    pub recent_attempts: Vec<QuizAttempt>,
}

impl Dashboard {
    /// Mean mastery over enrolled courses.
    #[must_use]
    pub fn average_mastery(&self) -> Option<f64> {
        if self.courses.is_empty() {
            return None;
        }
        let sum: f64 = self.courses.iter().map(|c| c.progress.mastery.value()).sum();
        #[allow(clippy::cast_precision_loss)]
        Some(sum / self.courses.len() as f64)
    }
}

/// Streaks, points and the per-user dashboard.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    courses: Arc<dyn CourseRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        courses: Arc<dyn CourseRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            courses,
            attempts,
        }
    }

    /// Count today as a study day.
    ///
    /// The first activity of a day extends or restarts the streak and grants
    /// `DAILY_STUDY_POINTS`; repeats on the same day change nothing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UserNotFound` if the user does not exist.
    pub async fn record_study_activity(
        &self,
        user_id: UserId,
    ) -> Result<StudyActivity, ProgressServiceError> {
        let credit = StudyCredit {
            today: self.clock.today(),
            points: 0,
            daily_bonus: DAILY_STUDY_POINTS,
        };
        let update = self
            .users
            .apply_study_credit(user_id, credit)
            .await
            .map_err(user_not_found)?;
        if update.change.is_modified() {
            tracing::debug!(
                user_id = %user_id,
                streak = update.user.streak().current(),
                change = ?update.change,
                "recorded study activity"
            );
        }
        Ok(StudyActivity {
            user: update.user,
            change: update.change,
            points_awarded: update.bonus_awarded,
        })
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::UserNotFound` if the user does not exist.
    pub async fn award_points(
        &self,
        user_id: UserId,
        points: u32,
    ) -> Result<User, ProgressServiceError> {
        let user = self
            .users
            .add_points(user_id, points)
            .await
            .map_err(user_not_found)?;
        tracing::info!(user_id = %user_id, points, total = user.points(), "awarded points");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::UserNotFound` if the user does not exist.
    pub async fn dashboard(&self, user_id: UserId) -> Result<Dashboard, ProgressServiceError> {
        let user = self.load_user(user_id).await?;
        let courses = self.courses.list_enrolled(user_id).await?;
        let attempts = self.attempts.summary_for_user(user_id).await?;
        let recent_attempts = self
            .attempts
            .list_attempts(
                user_id,
                None,
                PageRequest::new(None, Some(DASHBOARD_RECENT_ATTEMPTS)).unwrap_or_default(),
            )
            .await?
            .items;
        Ok(Dashboard {
            user,
            courses,
            attempts,
            recent_attempts,
        })
    }

    async fn load_user(&self, user_id: UserId) -> Result<User, ProgressServiceError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or(ProgressServiceError::UserNotFound)
    }
}

fn user_not_found(err: StorageError) -> ProgressServiceError {
    match err {
        StorageError::NotFound => ProgressServiceError::UserNotFound,
        other => ProgressServiceError::Storage(other),
    }
}
