use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::repository::{CourseFilter, EnrolledCourse};
use study_core::model::{
    Course, CourseDraft, CourseId, CourseProgress, Level, Material, MaterialDraft, MaterialId,
    MaterialKind, Semester, UserId,
};

use super::{PageParams, non_blank};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct CourseQuery {
    pub department: Option<String>,
    pub level: Option<u16>,
    pub semester: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl CourseQuery {
    pub fn page(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    pub fn filter(&self) -> Result<CourseFilter, ApiError> {
        Ok(CourseFilter {
            department: non_blank(self.department.clone()),
            level: self.level.map(Level::new).transpose()?,
            semester: non_blank(self.semester.clone())
                .map(|s| Semester::parse(&s))
                .transpose()?,
            search: non_blank(self.search.clone()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub level: Option<u16>,
    pub semester: Option<String>,
}

impl CourseRequest {
    pub fn into_draft(self) -> Result<CourseDraft, ApiError> {
        Ok(CourseDraft {
            code: self.code,
            title: self.title,
            description: self.description,
            department: self.department,
            level: self.level.map(Level::new).transpose()?,
            semester: non_blank(self.semester)
                .map(|s| Semester::parse(&s))
                .transpose()?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: CourseId,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub level: Option<u16>,
    pub semester: Option<&'static str>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<&Course> for CourseResponse {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id(),
            code: course.code().to_string(),
            title: course.title().to_string(),
            description: course.description().map(str::to_string),
            department: course.department().map(str::to_string),
            level: course.level().map(Level::value),
            semester: course.semester().map(Semester::as_str),
            created_by: course.created_by(),
            created_at: course.created_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub mastery: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub course_id: CourseId,
    pub mastery: f64,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl From<&CourseProgress> for ProgressResponse {
    fn from(progress: &CourseProgress) -> Self {
        Self {
            course_id: progress.course_id,
            mastery: progress.mastery.value(),
            enrolled_at: progress.enrolled_at,
            last_accessed_at: progress.last_accessed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrolledCourseResponse {
    pub course: CourseResponse,
    pub progress: ProgressResponse,
}

impl From<&EnrolledCourse> for EnrolledCourseResponse {
    fn from(enrolled: &EnrolledCourse) -> Self {
        Self {
            course: CourseResponse::from(&enrolled.course),
            progress: ProgressResponse::from(&enrolled.progress),
        }
    }
}

//
// ─── MATERIALS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Default, Deserialize)]
pub struct MaterialQuery {
    pub kind: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl MaterialQuery {
    pub fn page(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    pub fn kind(&self) -> Result<Option<MaterialKind>, ApiError> {
        Ok(non_blank(self.kind.clone())
            .map(|k| MaterialKind::parse(&k))
            .transpose()?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequest {
    pub title: String,
    pub kind: String,
    pub description: Option<String>,
    pub resource_url: String,
}

impl MaterialRequest {
    pub fn into_draft(self) -> Result<MaterialDraft, ApiError> {
        Ok(MaterialDraft {
            title: self.title,
            kind: MaterialKind::parse(&self.kind)?,
            description: self.description,
            resource_url: self.resource_url,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialResponse {
    pub id: MaterialId,
    pub course_id: CourseId,
    pub title: String,
    pub kind: &'static str,
    pub description: Option<String>,
    pub resource_url: String,
    pub uploaded_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<&Material> for MaterialResponse {
    fn from(material: &Material) -> Self {
        Self {
            id: material.id(),
            course_id: material.course_id(),
            title: material.title().to_string(),
            kind: material.kind().as_str(),
            description: material.description().map(str::to_string),
            resource_url: material.resource_url().to_string(),
            uploaded_by: material.uploaded_by(),
            created_at: material.created_at(),
        }
    }
}
