use sqlx::{QueryBuilder, Sqlite};
use study_core::model::{Course, CourseId, CourseProgress, Page, PageRequest, UserId};

use super::SqliteRepository;
use super::mapping::{
    count_to_u64, course_id_from_i64, db_err, id_to_i64, level_to_i64, like_pattern,
    map_course_row, map_progress_row, ser,
};
use crate::repository::{CourseFilter, CourseRepository, EnrolledCourse, StorageError};

const COURSE_COLUMNS: &str =
    "id, code, title, description, department, level, semester, created_by, created_at";

fn push_course_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CourseFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(department) = filter.department.as_deref().filter(|d| !d.trim().is_empty()) {
        qb.push(" AND lower(department) = ")
            .push_bind(department.trim().to_lowercase());
    }
    if let Some(level) = filter.level {
        qb.push(" AND level = ").push_bind(i64::from(level.value()));
    }
    if let Some(semester) = filter.semester {
        qb.push(" AND semester = ").push_bind(semester.as_str());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (lower(code) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(title) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn insert_course(&self, course: &Course) -> Result<CourseId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO courses (code, title, description, department, level, semester, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(course.code())
        .bind(course.title())
        .bind(course.description())
        .bind(course.department())
        .bind(level_to_i64(course.level()))
        .bind(course.semester().map(|s| s.as_str()))
        .bind(id_to_i64("user_id", course.created_by().value())?)
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        course_id_from_i64(res.last_insert_rowid())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"))
            .bind(id_to_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn update_course(&self, course: &Course) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE courses SET
                code = ?1,
                title = ?2,
                description = ?3,
                department = ?4,
                level = ?5,
                semester = ?6
            WHERE id = ?7
            ",
        )
        .bind(course.code())
        .bind(course.title())
        .bind(course.description())
        .bind(course.department())
        .bind(level_to_i64(course.level()))
        .bind(course.semester().map(|s| s.as_str()))
        .bind(id_to_i64("course_id", course.id().value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(id_to_i64("course_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<Page<Course>, StorageError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM courses");
        push_course_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {COURSE_COLUMNS} FROM courses"));
        push_course_filters(&mut select, filter);
        select
            .push(" ORDER BY code ASC, id ASC LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).map_err(ser)?);
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in &rows {
            courses.push(map_course_row(row)?);
        }
        Ok(Page::new(courses, page, count_to_u64(total)))
    }

    async fn upsert_progress(&self, progress: &CourseProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO course_enrollments (user_id, course_id, mastery, enrolled_at, last_accessed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, course_id) DO UPDATE SET
                -- enrolled_at is fixed by the first insert
                mastery = excluded.mastery,
                last_accessed_at = excluded.last_accessed_at
            ",
        )
        .bind(id_to_i64("user_id", progress.user_id.value())?)
        .bind(id_to_i64("course_id", progress.course_id.value())?)
        .bind(progress.mastery.value())
        .bind(progress.enrolled_at)
        .bind(progress.last_accessed_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, course_id, mastery, enrolled_at, last_accessed_at
            FROM course_enrollments WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_enrolled(&self, user_id: UserId) -> Result<Vec<EnrolledCourse>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.code, c.title, c.description, c.department, c.level, c.semester,
                   c.created_by, c.created_at,
                   e.user_id, e.course_id, e.mastery, e.enrolled_at, e.last_accessed_at
            FROM course_enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.user_id = ?1
            ORDER BY e.last_accessed_at DESC, c.id ASC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut enrolled = Vec::with_capacity(rows.len());
        for row in &rows {
            enrolled.push(EnrolledCourse {
                course: map_course_row(row)?,
                progress: map_progress_row(row)?,
            });
        }
        Ok(enrolled)
    }
}
