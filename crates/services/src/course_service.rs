use std::sync::Arc;

use storage::repository::{CourseFilter, CourseRepository, EnrolledCourse, StorageError};
use study_core::model::{
    Course, CourseDraft, CourseId, CourseProgress, Mastery, Page, PageRequest, UserId,
};

use crate::Clock;
use crate::error::CourseServiceError;

/// Course catalogue, enrolment and mastery tracking.
#[derive(Clone)]
pub struct CourseService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
}

impl CourseService {
    #[must_use]
    pub fn new(clock: Clock, courses: Arc<dyn CourseRepository>) -> Self {
        Self { clock, courses }
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<Page<Course>, CourseServiceError> {
        Ok(self.courses.list_courses(filter, page).await?)
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound` if the course does not exist.
    pub async fn get_course(&self, id: CourseId) -> Result<Course, CourseServiceError> {
        self.courses
            .get_course(id)
            .await?
            .ok_or(CourseServiceError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::Course` for validation failures and
    /// `CourseServiceError::DuplicateCode` if the code is taken.
    pub async fn create_course(
        &self,
        draft: CourseDraft,
        created_by: UserId,
    ) -> Result<Course, CourseServiceError> {
        let course = Course::new(CourseId::new(0), draft, created_by, self.clock.now())?;
        let id = self
            .courses
            .insert_course(&course)
            .await
            .map_err(map_write_err)?;
        tracing::info!(course_id = %id, code = course.code(), "created course");
        self.get_course(id).await
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound`, `CourseServiceError::Course` or
    /// `CourseServiceError::DuplicateCode`.
    pub async fn update_course(
        &self,
        id: CourseId,
        draft: CourseDraft,
    ) -> Result<Course, CourseServiceError> {
        let mut course = self.get_course(id).await?;
        course.apply(draft)?;
        self.courses
            .update_course(&course)
            .await
            .map_err(map_write_err)?;
        Ok(course)
    }

    /// Delete a course with its materials, quizzes and enrolments.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound` if the course does not exist.
    pub async fn delete_course(&self, id: CourseId) -> Result<(), CourseServiceError> {
        self.courses.delete_course(id).await.map_err(map_write_err)?;
        tracing::info!(course_id = %id, "deleted course");
        Ok(())
    }

    /// Enrol a user. Re-enrolling keeps the existing progress and touches its access time.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound` if the course does not exist.
    pub async fn enroll(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, CourseServiceError> {
        self.get_course(course_id).await?;
        let now = self.clock.now();
        let progress = match self.courses.get_progress(user_id, course_id).await? {
            Some(mut existing) => {
                existing.last_accessed_at = now;
                existing
            }
            None => CourseProgress::enrolled(user_id, course_id, now),
        };
        self.courses
            .upsert_progress(&progress)
            .await
            .map_err(map_write_err)?;
        Ok(progress)
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn enrolled_courses(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EnrolledCourse>, CourseServiceError> {
        Ok(self.courses.list_enrolled(user_id).await?)
    }

    /// Record a mastery percentage, enrolling the user first if needed.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Course` for values outside `0..=100` and
    /// `CourseServiceError::NotFound` if the course does not exist.
    pub async fn set_mastery(
        &self,
        user_id: UserId,
        course_id: CourseId,
        mastery: f64,
    ) -> Result<CourseProgress, CourseServiceError> {
        let mastery = Mastery::new(mastery)?;
        let mut progress = self.enroll(user_id, course_id).await?;
        progress.set_mastery(mastery, self.clock.now());
        self.courses
            .upsert_progress(&progress)
            .await
            .map_err(map_write_err)?;
        Ok(progress)
    }
}

fn map_write_err(err: StorageError) -> CourseServiceError {
    match err {
        StorageError::NotFound => CourseServiceError::NotFound,
        StorageError::Conflict => CourseServiceError::DuplicateCode,
        other => CourseServiceError::Storage(other),
    }
}
