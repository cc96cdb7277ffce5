use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self::new).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

define_id!(
    /// Unique identifier for a registered user
    UserId
);
define_id!(
    /// Unique identifier for a Course
    CourseId
);
define_id!(
    /// Unique identifier for a study Material
    MaterialId
);
define_id!(
    /// Unique identifier for a Quiz
    QuizId
);
define_id!(
    /// Unique identifier for a Question within a quiz
    QuestionId
);
define_id!(
    /// Unique identifier for an Answer option of a question
    AnswerId
);
define_id!(
    /// Unique identifier for a submitted quiz attempt
    AttemptId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display() {
        let id = UserId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "UserId(42)");
    }

    #[test]
    fn test_quiz_id_from_str() {
        let id: QuizId = "123".parse().unwrap();
        assert_eq!(id, QuizId::new(123));
    }

    #[test]
    fn test_answer_id_from_str_invalid() {
        let err = "not-a-number".parse::<AnswerId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse AnswerId from string");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&QuestionId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: QuestionId = serde_json::from_str("7").unwrap();
        assert_eq!(back, QuestionId::new(7));
    }
}
