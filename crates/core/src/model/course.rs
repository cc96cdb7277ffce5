use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, UserId};
use crate::model::user::Level;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course code cannot be empty")]
    EmptyCode,

    #[error("course code is longer than {max} characters")]
    CodeTooLong { max: usize },

    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("unknown semester: {0}")]
    UnknownSemester(String),

    #[error("mastery must be between 0 and 100 (got {0})")]
    InvalidMastery(f64),
}

pub const MAX_CODE_LEN: usize = 16;

/// Teaching semester of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Semester::First => "first",
            Semester::Second => "second",
        }
    }

    /// # Errors
    ///
    /// Returns `CourseError::UnknownSemester` for unrecognized values.
    pub fn parse(raw: &str) -> Result<Self, CourseError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "first" | "1" => Ok(Semester::First),
            "second" | "2" => Ok(Semester::Second),
            other => Err(CourseError::UnknownSemester(other.to_string())),
        }
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// Editable course fields, shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDraft {
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub level: Option<Level>,
    pub semester: Option<Semester>,
}

impl CourseDraft {
    /// Normalize the code to uppercase with single spaces and check required fields.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the code or title is empty or the code is too long.
    pub fn validate(self) -> Result<Self, CourseError> {
        let code = self
            .code
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        if code.is_empty() {
            return Err(CourseError::EmptyCode);
        }
        if code.chars().count() > MAX_CODE_LEN {
            return Err(CourseError::CodeTooLong { max: MAX_CODE_LEN });
        }
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        Ok(Self {
            code,
            title,
            description: trimmed(self.description),
            department: trimmed(self.department),
            level: self.level,
            semester: self.semester,
        })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    code: String,
    title: String,
    description: Option<String>,
    department: Option<String>,
    level: Option<Level>,
    semester: Option<Semester>,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Build a course from a draft; the draft is validated first.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the draft fails validation.
    pub fn new(
        id: CourseId,
        draft: CourseDraft,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let draft = draft.validate()?;
        Ok(Self {
            id,
            code: draft.code,
            title: draft.title,
            description: draft.description,
            department: draft.department,
            level: draft.level,
            semester: draft.semester,
            created_by,
            created_at,
        })
    }

    /// Replace the editable fields, keeping id and authorship.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the draft fails validation.
    pub fn apply(&mut self, draft: CourseDraft) -> Result<(), CourseError> {
        let updated = Self::new(self.id, draft, self.created_by, self.created_at)?;
        *self = updated;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    #[must_use]
    pub fn level(&self) -> Option<Level> {
        self.level
    }

    #[must_use]
    pub fn semester(&self) -> Option<Semester> {
        self.semester
    }

    #[must_use]
    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Self-reported mastery of a course, as a percentage.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Mastery(f64);

impl Mastery {
    /// # Errors
    ///
    /// Returns `CourseError::InvalidMastery` for non-finite values or values outside 0..=100.
    pub fn new(value: f64) -> Result<Self, CourseError> {
        if value.is_finite() && (0.0..=100.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CourseError::InvalidMastery(value))
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

/// A user's enrolment in a course.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseProgress {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub mastery: Mastery,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl CourseProgress {
    #[must_use]
    pub fn enrolled(user_id: UserId, course_id: CourseId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            course_id,
            mastery: Mastery::default(),
            enrolled_at: now,
            last_accessed_at: now,
        }
    }

    pub fn set_mastery(&mut self, mastery: Mastery, now: DateTime<Utc>) {
        self.mastery = mastery;
        self.last_accessed_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft(code: &str, title: &str) -> CourseDraft {
        CourseDraft {
            code: code.into(),
            title: title.into(),
            description: Some("  ".into()),
            department: Some(" Computer Science ".into()),
            level: Some(Level::new(200).unwrap()),
            semester: Some(Semester::First),
        }
    }

    #[test]
    fn code_is_normalized() {
        let course = Course::new(
            CourseId::new(1),
            draft("  csc   201 ", "Data Structures"),
            UserId::new(1),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(course.code(), "CSC 201");
        assert_eq!(course.description(), None);
        assert_eq!(course.department(), Some("Computer Science"));
    }

    #[test]
    fn empty_fields_are_rejected() {
        assert_eq!(draft(" ", "T").validate(), Err(CourseError::EmptyCode));
        assert_eq!(draft("MTH 101", "  ").validate(), Err(CourseError::EmptyTitle));
        assert_eq!(
            draft("ABCDEFGHIJKLMNOPQ", "T").validate(),
            Err(CourseError::CodeTooLong { max: MAX_CODE_LEN })
        );
    }

    #[test]
    fn apply_keeps_authorship() {
        let mut course = Course::new(
            CourseId::new(4),
            draft("PHY 101", "Mechanics"),
            UserId::new(9),
            fixed_now(),
        )
        .unwrap();
        course.apply(draft("PHY 102", "Waves")).unwrap();
        assert_eq!(course.id(), CourseId::new(4));
        assert_eq!(course.created_by(), UserId::new(9));
        assert_eq!(course.title(), "Waves");
    }

    #[test]
    fn semester_parse_accepts_numbers() {
        assert_eq!(Semester::parse("2").unwrap(), Semester::Second);
        assert_eq!(Semester::parse("First").unwrap(), Semester::First);
        assert!(Semester::parse("summer").is_err());
    }

    #[test]
    fn mastery_bounds() {
        assert!(Mastery::new(0.0).is_ok());
        assert!(Mastery::new(100.0).is_ok());
        assert!(Mastery::new(100.5).is_err());
        assert!(Mastery::new(-1.0).is_err());
        assert!(Mastery::new(f64::NAN).is_err());
    }
}
