use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('student', 'admin')),
            university TEXT,
            department TEXT,
            level INTEGER CHECK (level IS NULL OR level BETWEEN 100 AND 700),
            points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
            current_streak INTEGER NOT NULL DEFAULT 0 CHECK (current_streak >= 0),
            longest_streak INTEGER NOT NULL DEFAULT 0 CHECK (longest_streak >= 0),
            last_study_date TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            issued_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            revoked_at TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT,
            department TEXT,
            level INTEGER,
            semester TEXT CHECK (semester IS NULL OR semester IN ('first', 'second')),
            created_by INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS course_enrollments (
            user_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            mastery REAL NOT NULL DEFAULT 0 CHECK (mastery BETWEEN 0 AND 100),
            enrolled_at TEXT NOT NULL,
            last_accessed_at TEXT NOT NULL,
            PRIMARY KEY (user_id, course_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS materials (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            kind TEXT NOT NULL,
            description TEXT,
            resource_url TEXT NOT NULL,
            uploaded_by INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quizzes (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            passing_score INTEGER NOT NULL CHECK (passing_score BETWEEN 0 AND 100),
            time_limit_minutes INTEGER CHECK (time_limit_minutes IS NULL OR time_limit_minutes > 0),
            is_published INTEGER NOT NULL DEFAULT 0,
            created_by INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY,
            quiz_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            points INTEGER NOT NULL CHECK (points > 0),
            position INTEGER NOT NULL,
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS answers (
            id INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            is_correct INTEGER NOT NULL,
            FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            quiz_id INTEGER NOT NULL,
            earned_points INTEGER NOT NULL CHECK (earned_points >= 0),
            total_points INTEGER NOT NULL CHECK (total_points > 0),
            percentage REAL NOT NULL,
            passed INTEGER NOT NULL,
            answers TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user
            ON refresh_tokens (user_id, revoked_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_materials_course_created
            ON materials (course_id, created_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quizzes_course
            ON quizzes (course_id, is_published);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_quiz_position
            ON questions (quiz_id, position);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_answers_question
            ON answers (question_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_attempts_user_submitted
            ON quiz_attempts (user_id, submitted_at);
    ",
];

/// Runs the versioned schema migrations.
///
/// Version 1 creates users, refresh tokens, courses, enrolments, materials,
/// quizzes with their question bank, and attempts.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
