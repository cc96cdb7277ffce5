use sqlx::{QueryBuilder, Row, Sqlite};
use study_core::model::{AttemptId, NewQuizAttempt, Page, PageRequest, QuizAttempt, QuizId, UserId};

use super::SqliteRepository;
use super::mapping::{
    answers_to_json, attempt_id_from_i64, count_to_u64, db_err, id_to_i64, map_attempt_row, ser,
};
use super::user_repo::credit_study;
use crate::repository::{
    AttemptRepository, AttemptSummary, StorageError, StudyCredit, StudyUpdate,
};

const ATTEMPT_COLUMNS: &str = "id, user_id, quiz_id, earned_points, total_points, percentage, \
     passed, answers, submitted_at";

fn push_attempt_filters(qb: &mut QueryBuilder<'_, Sqlite>, user_id: i64, quiz_id: Option<i64>) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(quiz_id) = quiz_id {
        qb.push(" AND quiz_id = ").push_bind(quiz_id);
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn record_attempt(
        &self,
        attempt: &NewQuizAttempt,
        credit: StudyCredit,
    ) -> Result<(AttemptId, StudyUpdate), StorageError> {
        let user_id = id_to_i64("user_id", attempt.user_id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
            INSERT INTO quiz_attempts (
                user_id, quiz_id, earned_points, total_points, percentage, passed, answers, submitted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(user_id)
        .bind(id_to_i64("quiz_id", attempt.quiz_id.value())?)
        .bind(i64::from(attempt.earned_points))
        .bind(i64::from(attempt.total_points))
        .bind(attempt.percentage)
        .bind(attempt.passed)
        .bind(answers_to_json(&attempt.answers)?)
        .bind(attempt.submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let update = credit_study(&mut tx, user_id, credit).await?;

        tx.commit().await.map_err(db_err)?;
        Ok((attempt_id_from_i64(res.last_insert_rowid())?, update))
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<QuizAttempt>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = ?1"
        ))
        .bind(id_to_i64("attempt_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_attempt_row).transpose()
    }

    async fn list_attempts(
        &self,
        user_id: UserId,
        quiz_id: Option<QuizId>,
        page: PageRequest,
    ) -> Result<Page<QuizAttempt>, StorageError> {
        let user = id_to_i64("user_id", user_id.value())?;
        let quiz = quiz_id
            .map(|q| id_to_i64("quiz_id", q.value()))
            .transpose()?;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM quiz_attempts");
        push_attempt_filters(&mut count, user, quiz);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts"));
        push_attempt_filters(&mut select, user, quiz);
        select
            .push(" ORDER BY submitted_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).map_err(ser)?);
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in &rows {
            attempts.push(map_attempt_row(row)?);
        }
        Ok(Page::new(attempts, page, count_to_u64(total)))
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts ORDER BY submitted_at DESC, id DESC LIMIT ?1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in &rows {
            attempts.push(map_attempt_row(row)?);
        }
        Ok(attempts)
    }

    async fn summary_for_user(&self, user_id: UserId) -> Result<AttemptSummary, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS attempts,
                COALESCE(SUM(passed), 0) AS passed,
                AVG(percentage) AS average_percentage,
                MAX(percentage) AS best_percentage
            FROM quiz_attempts WHERE user_id = ?1
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(AttemptSummary {
            attempts: count_to_u64(row.try_get("attempts").map_err(ser)?),
            passed: count_to_u64(row.try_get("passed").map_err(ser)?),
            average_percentage: row.try_get("average_percentage").map_err(ser)?,
            best_percentage: row.try_get("best_percentage").map_err(ser)?,
        })
    }
}
