use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::{CourseId, MaterialId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MaterialError {
    #[error("material title cannot be empty")]
    EmptyTitle,

    #[error("resource url is invalid: {0}")]
    InvalidUrl(String),

    #[error("resource url must use http or https")]
    UnsupportedScheme,

    #[error("unknown material kind: {0}")]
    UnknownKind(String),
}

/// What sort of resource a material points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Note,
    PastQuestion,
    Slide,
    Video,
    Link,
}

impl MaterialKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialKind::Note => "note",
            MaterialKind::PastQuestion => "past_question",
            MaterialKind::Slide => "slide",
            MaterialKind::Video => "video",
            MaterialKind::Link => "link",
        }
    }

    /// # Errors
    ///
    /// Returns `MaterialError::UnknownKind` for unrecognized values.
    pub fn parse(raw: &str) -> Result<Self, MaterialError> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "note" => Ok(MaterialKind::Note),
            "past_question" | "pastquestion" => Ok(MaterialKind::PastQuestion),
            "slide" => Ok(MaterialKind::Slide),
            "video" => Ok(MaterialKind::Video),
            "link" => Ok(MaterialKind::Link),
            other => Err(MaterialError::UnknownKind(other.to_string())),
        }
    }
}

/// Editable material fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialDraft {
    pub title: String,
    pub kind: MaterialKind,
    pub description: Option<String>,
    pub resource_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    id: MaterialId,
    course_id: CourseId,
    title: String,
    kind: MaterialKind,
    description: Option<String>,
    resource_url: Url,
    uploaded_by: UserId,
    created_at: DateTime<Utc>,
}

impl Material {
    /// # Errors
    ///
    /// Returns `MaterialError` if the title is empty or the url is not absolute http(s).
    pub fn new(
        id: MaterialId,
        course_id: CourseId,
        draft: MaterialDraft,
        uploaded_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, MaterialError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(MaterialError::EmptyTitle);
        }
        let resource_url = parse_resource_url(&draft.resource_url)?;
        Ok(Self {
            id,
            course_id,
            title,
            kind: draft.kind,
            description: draft
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            resource_url,
            uploaded_by,
            created_at,
        })
    }

    /// # Errors
    ///
    /// Returns `MaterialError` if the draft fails validation.
    pub fn apply(&mut self, draft: MaterialDraft) -> Result<(), MaterialError> {
        *self = Self::new(
            self.id,
            self.course_id,
            draft,
            self.uploaded_by,
            self.created_at,
        )?;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> MaterialId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn resource_url(&self) -> &Url {
        &self.resource_url
    }

    #[must_use]
    pub fn uploaded_by(&self) -> UserId {
        self.uploaded_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn parse_resource_url(raw: &str) -> Result<Url, MaterialError> {
    let url = Url::parse(raw.trim()).map_err(|e| MaterialError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(MaterialError::UnsupportedScheme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft(url: &str) -> MaterialDraft {
        MaterialDraft {
            title: " Lecture 1 ".into(),
            kind: MaterialKind::Slide,
            description: None,
            resource_url: url.into(),
        }
    }

    #[test]
    fn accepts_https_resource() {
        let material = Material::new(
            MaterialId::new(1),
            CourseId::new(2),
            draft("https://files.example.ng/csc201/lecture1.pdf"),
            UserId::new(3),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(material.title(), "Lecture 1");
        assert_eq!(material.resource_url().host_str(), Some("files.example.ng"));
    }

    #[test]
    fn rejects_relative_and_non_http_urls() {
        let relative = Material::new(
            MaterialId::new(1),
            CourseId::new(2),
            draft("/uploads/a.pdf"),
            UserId::new(3),
            fixed_now(),
        );
        assert!(matches!(relative, Err(MaterialError::InvalidUrl(_))));

        let ftp = Material::new(
            MaterialId::new(1),
            CourseId::new(2),
            draft("ftp://files.example.ng/a.pdf"),
            UserId::new(3),
            fixed_now(),
        );
        assert_eq!(ftp, Err(MaterialError::UnsupportedScheme));
    }

    #[test]
    fn kind_parse_accepts_dashes() {
        assert_eq!(
            MaterialKind::parse("past-question").unwrap(),
            MaterialKind::PastQuestion
        );
        assert!(MaterialKind::parse("podcast").is_err());
    }
}
