use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::ids::UserId;
use crate::model::streak::{StreakChange, StudyStreak};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("email address is invalid")]
    InvalidEmail,

    #[error("full name cannot be empty")]
    EmptyName,

    #[error("full name is longer than {max} characters")]
    NameTooLong { max: usize },

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("level must be one of 100, 200, ... 700 (got {0})")]
    InvalidLevel(u16),
}

//
// ─── VALUE TYPES ───────────────────────────────────────────────────────────────
//

pub const MAX_NAME_LEN: usize = 120;

/// A lowercase email address with a non-empty local part and domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Normalize and validate an email address.
    ///
    /// # Errors
    ///
    /// Returns `UserError::InvalidEmail` when the address has no `@`, an empty
    /// side, or embedded whitespace.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, UserError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        let (local, domain) = normalized
            .split_once('@')
            .ok_or(UserError::InvalidEmail)?;
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || normalized.chars().any(char::is_whitespace)
        {
            return Err(UserError::InvalidEmail);
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    /// # Errors
    ///
    /// Returns `UserError::UnknownRole` for anything but `student`/`admin`.
    pub fn parse(raw: &str) -> Result<Self, UserError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(UserError::UnknownRole(other.to_string())),
        }
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// University study level (100 for first year up to 700).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Level(u16);

impl Level {
    /// # Errors
    ///
    /// Returns `UserError::InvalidLevel` unless the value is a multiple of 100 in 100..=700.
    pub fn new(value: u16) -> Result<Self, UserError> {
        if (100..=700).contains(&value) && value % 100 == 0 {
            Ok(Self(value))
        } else {
            Err(UserError::InvalidLevel(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u16 {
        self.0
    }
}

/// Optional academic details a student fills in at registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudentProfile {
    pub university: Option<String>,
    pub department: Option<String>,
    pub level: Option<Level>,
}

impl StudentProfile {
    /// Trim text fields, dropping empty ones.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            university: non_empty(self.university),
            department: non_empty(self.department),
            level: self.level,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn validate_name(raw: &str) -> Result<String, UserError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(UserError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(UserError::NameTooLong { max: MAX_NAME_LEN });
    }
    Ok(name.to_string())
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// Validated registration data, before an id is assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: Email,
    pub full_name: String,
    pub role: Role,
    pub profile: StudentProfile,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// # Errors
    ///
    /// Returns `UserError` when the email or name are invalid.
    pub fn new(
        email: &str,
        full_name: &str,
        role: Role,
        profile: StudentProfile,
        now: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        Ok(Self {
            email: Email::parse(email)?,
            full_name: validate_name(full_name)?,
            role,
            profile: profile.normalized(),
            created_at: now,
        })
    }
}

/// A registered account with its study statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    email: Email,
    full_name: String,
    role: Role,
    profile: StudentProfile,
    points: u32,
    streak: StudyStreak,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl User {
    /// Rehydrate a user from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the stored email or name no longer validate.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: UserId,
        email: &str,
        full_name: &str,
        role: Role,
        profile: StudentProfile,
        points: u32,
        streak: StudyStreak,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        Ok(Self {
            id,
            email: Email::parse(email)?,
            full_name: validate_name(full_name)?,
            role,
            profile,
            points,
            streak,
            is_active,
            created_at,
        })
    }

    #[must_use]
    pub fn from_new(id: UserId, new: NewUser) -> Self {
        Self {
            id,
            email: new.email,
            full_name: new.full_name,
            role: new.role,
            profile: new.profile,
            points: 0,
            streak: StudyStreak::default(),
            is_active: true,
            created_at: new.created_at,
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn email(&self) -> &Email {
        &self.email
    }

    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn profile(&self) -> &StudentProfile {
        &self.profile
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn streak(&self) -> &StudyStreak {
        &self.streak
    }

    #[must_use]
    pub fn last_study_date(&self) -> Option<NaiveDate> {
        self.streak.last_study_date()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // Mutators

    pub fn record_study(&mut self, today: NaiveDate) -> StreakChange {
        self.streak.record_activity(today)
    }

    pub fn award_points(&mut self, points: u32) {
        self.points = self.points.saturating_add(points);
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// # Errors
    ///
    /// Returns `UserError` if the new name is invalid.
    pub fn update_profile(
        &mut self,
        full_name: &str,
        profile: StudentProfile,
    ) -> Result<(), UserError> {
        self.full_name = validate_name(full_name)?;
        self.profile = profile.normalized();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn email_is_normalized() {
        let email = Email::parse("  Ada.Obi@UNILAG.edu.ng ").unwrap();
        assert_eq!(email.as_str(), "ada.obi@unilag.edu.ng");
    }

    #[test]
    fn email_rejects_bad_shapes() {
        for raw in ["", "no-at-sign", "@unilag.edu.ng", "ada@", "ada@localhost", "a b@x.ng"] {
            assert_eq!(Email::parse(raw), Err(UserError::InvalidEmail), "{raw}");
        }
    }

    #[test]
    fn level_must_be_hundreds() {
        assert_eq!(Level::new(300).unwrap().value(), 300);
        assert_eq!(Level::new(250), Err(UserError::InvalidLevel(250)));
        assert_eq!(Level::new(800), Err(UserError::InvalidLevel(800)));
        assert_eq!(Level::new(0), Err(UserError::InvalidLevel(0)));
    }

    #[test]
    fn role_parse_roundtrip() {
        assert_eq!(Role::parse("ADMIN").unwrap(), Role::Admin);
        assert_eq!(Role::parse(Role::Student.as_str()).unwrap(), Role::Student);
        assert!(matches!(Role::parse("lecturer"), Err(UserError::UnknownRole(_))));
    }

    #[test]
    fn new_user_trims_profile_and_name() {
        let profile = StudentProfile {
            university: Some("  UNN ".into()),
            department: Some("   ".into()),
            level: None,
        };
        let new = NewUser::new("x@y.ng", "  Chidi  ", Role::Student, profile, fixed_now()).unwrap();
        assert_eq!(new.full_name, "Chidi");
        assert_eq!(new.profile.university.as_deref(), Some("UNN"));
        assert_eq!(new.profile.department, None);
    }

    #[test]
    fn from_new_starts_with_clean_stats() {
        let new = NewUser::new(
            "x@y.ng",
            "Chidi",
            Role::Student,
            StudentProfile::default(),
            fixed_now(),
        )
        .unwrap();
        let mut user = User::from_new(UserId::new(3), new);
        assert_eq!(user.points(), 0);
        assert!(user.is_active());
        user.award_points(u32::MAX);
        user.award_points(5);
        assert_eq!(user.points(), u32::MAX);
    }

    #[test]
    fn long_names_are_rejected() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        let err = NewUser::new("x@y.ng", &name, Role::Student, StudentProfile::default(), fixed_now())
            .unwrap_err();
        assert_eq!(err, UserError::NameTooLong { max: MAX_NAME_LEN });
    }
}
