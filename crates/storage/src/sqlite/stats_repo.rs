use chrono::NaiveDate;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{count_to_u64, db_err, ser};
use crate::repository::{PlatformStats, StatsRepository, StorageError};

#[async_trait::async_trait]
impl StatsRepository for SqliteRepository {
    async fn platform_stats(&self, today: NaiveDate) -> Result<PlatformStats, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM users WHERE is_active = 1) AS active_users,
                (SELECT COUNT(*) FROM users WHERE role = 'student') AS students,
                (SELECT COUNT(*) FROM users WHERE role = 'admin') AS admins,
                (SELECT COUNT(*) FROM users WHERE last_study_date = ?1) AS studied_today,
                (SELECT COUNT(*) FROM courses) AS courses,
                (SELECT COUNT(*) FROM materials) AS materials,
                (SELECT COUNT(*) FROM quizzes) AS quizzes,
                (SELECT COUNT(*) FROM quizzes WHERE is_published = 1) AS published_quizzes,
                (SELECT COUNT(*) FROM quiz_attempts) AS attempts,
                (SELECT COUNT(*) FROM quiz_attempts WHERE passed = 1) AS passed_attempts,
                (SELECT AVG(percentage) FROM quiz_attempts) AS average_percentage
            ",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let count = |name: &str| -> Result<u64, StorageError> {
            Ok(count_to_u64(row.try_get::<i64, _>(name).map_err(ser)?))
        };

        Ok(PlatformStats {
            users: count("users")?,
            active_users: count("active_users")?,
            students: count("students")?,
            admins: count("admins")?,
            courses: count("courses")?,
            materials: count("materials")?,
            quizzes: count("quizzes")?,
            published_quizzes: count("published_quizzes")?,
            attempts: count("attempts")?,
            passed_attempts: count("passed_attempts")?,
            average_percentage: row.try_get("average_percentage").map_err(ser)?,
            studied_today: count("studied_today")?,
        })
    }
}
