use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::model::{
    AnswerId, AttemptId, Course, CourseDraft, CourseId, CourseProgress, Level, Mastery, Material,
    MaterialDraft, MaterialId, MaterialKind, QuestionId, Quiz, QuizAttempt, QuizDraft, QuizId,
    Role, Semester, StudentProfile, StudyStreak, User, UserId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Map driver errors, turning constraint violations into domain-level storage errors.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn count_to_u64(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn material_id_from_i64(v: i64) -> Result<MaterialId, StorageError> {
    Ok(MaterialId::new(i64_to_u64("material_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn answer_id_from_i64(v: i64) -> Result<AnswerId, StorageError> {
    Ok(AnswerId::new(i64_to_u64("answer_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

fn level_from_row(row: &SqliteRow) -> Result<Option<Level>, StorageError> {
    row.try_get::<Option<i64>, _>("level")
        .map_err(ser)?
        .map(|v| {
            let raw = u16::try_from(v).map_err(|_| ser(format!("invalid level: {v}")))?;
            Level::new(raw).map_err(ser)
        })
        .transpose()
}

pub(crate) fn level_to_i64(level: Option<Level>) -> Option<i64> {
    level.map(|l| i64::from(l.value()))
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let role: String = row.try_get("role").map_err(ser)?;
    let profile = StudentProfile {
        university: row.try_get("university").map_err(ser)?,
        department: row.try_get("department").map_err(ser)?,
        level: level_from_row(row)?,
    };
    let streak = StudyStreak::from_persisted(
        i64_to_u32("current_streak", row.try_get("current_streak").map_err(ser)?)?,
        i64_to_u32("longest_streak", row.try_get("longest_streak").map_err(ser)?)?,
        row.try_get::<Option<NaiveDate>, _>("last_study_date")
            .map_err(ser)?,
    );

    User::from_persisted(
        user_id_from_i64(row.try_get("id").map_err(ser)?)?,
        &row.try_get::<String, _>("email").map_err(ser)?,
        &row.try_get::<String, _>("full_name").map_err(ser)?,
        Role::parse(&role).map_err(ser)?,
        profile,
        i64_to_u32("points", row.try_get("points").map_err(ser)?)?,
        streak,
        row.try_get("is_active").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let semester = row
        .try_get::<Option<String>, _>("semester")
        .map_err(ser)?
        .map(|s| Semester::parse(&s).map_err(ser))
        .transpose()?;
    let draft = CourseDraft {
        code: row.try_get("code").map_err(ser)?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        department: row.try_get("department").map_err(ser)?,
        level: level_from_row(row)?,
        semester,
    };
    Course::new(
        course_id_from_i64(row.try_get("id").map_err(ser)?)?,
        draft,
        user_id_from_i64(row.try_get("created_by").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<CourseProgress, StorageError> {
    Ok(CourseProgress {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        course_id: course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        mastery: Mastery::new(row.try_get("mastery").map_err(ser)?).map_err(ser)?,
        enrolled_at: row.try_get("enrolled_at").map_err(ser)?,
        last_accessed_at: row.try_get("last_accessed_at").map_err(ser)?,
    })
}

pub(crate) fn map_material_row(row: &SqliteRow) -> Result<Material, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    let draft = MaterialDraft {
        title: row.try_get("title").map_err(ser)?,
        kind: MaterialKind::parse(&kind).map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        resource_url: row.try_get("resource_url").map_err(ser)?,
    };
    Material::new(
        material_id_from_i64(row.try_get("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        draft,
        user_id_from_i64(row.try_get("uploaded_by").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let passing: i64 = row.try_get("passing_score").map_err(ser)?;
    let draft = QuizDraft {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        passing_score: u8::try_from(passing)
            .map_err(|_| ser(format!("invalid passing_score: {passing}")))?,
        time_limit_minutes: row
            .try_get::<Option<i64>, _>("time_limit_minutes")
            .map_err(ser)?
            .map(|v| i64_to_u32("time_limit_minutes", v))
            .transpose()?,
    };
    Quiz::new(
        quiz_id_from_i64(row.try_get("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        draft,
        row.try_get("is_published").map_err(ser)?,
        user_id_from_i64(row.try_get("created_by").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

/// Attempt answers are stored as a JSON object of question id to answer id.
pub(crate) fn answers_to_json(
    answers: &HashMap<QuestionId, AnswerId>,
) -> Result<String, StorageError> {
    let ordered: BTreeMap<u64, u64> = answers
        .iter()
        .map(|(q, a)| (q.value(), a.value()))
        .collect();
    serde_json::to_string(&ordered).map_err(ser)
}

fn answers_from_json(raw: &str) -> Result<HashMap<QuestionId, AnswerId>, StorageError> {
    let ordered: BTreeMap<u64, u64> = serde_json::from_str(raw).map_err(ser)?;
    Ok(ordered
        .into_iter()
        .map(|(q, a)| (QuestionId::new(q), AnswerId::new(a)))
        .collect())
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    let submitted_at: DateTime<Utc> = row.try_get("submitted_at").map_err(ser)?;
    Ok(QuizAttempt {
        id: attempt_id_from_i64(row.try_get("id").map_err(ser)?)?,
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        quiz_id: quiz_id_from_i64(row.try_get("quiz_id").map_err(ser)?)?,
        earned_points: i64_to_u32("earned_points", row.try_get("earned_points").map_err(ser)?)?,
        total_points: i64_to_u32("total_points", row.try_get("total_points").map_err(ser)?)?,
        percentage: row.try_get("percentage").map_err(ser)?,
        passed: row.try_get("passed").map_err(ser)?,
        answers: answers_from_json(&row.try_get::<String, _>("answers").map_err(ser)?)?,
        submitted_at,
    })
}

/// `%needle%` for a case-insensitive `LIKE` against a lowercased column.
pub(crate) fn like_pattern(needle: &str) -> String {
    format!("%{}%", needle.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_json_roundtrip_is_ordered() {
        let answers: HashMap<QuestionId, AnswerId> = [(3, 30), (1, 10)]
            .into_iter()
            .map(|(q, a)| (QuestionId::new(q), AnswerId::new(a)))
            .collect();
        let json = answers_to_json(&answers).unwrap();
        assert_eq!(json, r#"{"1":10,"3":30}"#);
        assert_eq!(answers_from_json(&json).unwrap(), answers);
    }

    #[test]
    fn negative_ids_are_rejected() {
        assert!(matches!(
            user_id_from_i64(-1),
            Err(StorageError::Serialization(_))
        ));
    }
}
