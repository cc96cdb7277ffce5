use std::sync::Arc;

use storage::repository::{CourseRepository, MaterialRepository, StorageError};
use study_core::model::{
    CourseId, Material, MaterialDraft, MaterialId, MaterialKind, Page, PageRequest, UserId,
};

use crate::Clock;
use crate::error::MaterialServiceError;

#[derive(Clone)]
pub struct MaterialService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    materials: Arc<dyn MaterialRepository>,
}

impl MaterialService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        materials: Arc<dyn MaterialRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            materials,
        }
    }

    /// # Errors
    ///
    /// Returns `MaterialServiceError::CourseNotFound` if the course does not exist.
    pub async fn list_materials(
        &self,
        course_id: CourseId,
        kind: Option<MaterialKind>,
        page: PageRequest,
    ) -> Result<Page<Material>, MaterialServiceError> {
        self.ensure_course(course_id).await?;
        Ok(self.materials.list_materials(course_id, kind, page).await?)
    }

    /// # Errors
    ///
    /// Returns `MaterialServiceError::NotFound` if the material does not exist.
    pub async fn get_material(&self, id: MaterialId) -> Result<Material, MaterialServiceError> {
        self.materials
            .get_material(id)
            .await?
            .ok_or(MaterialServiceError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `MaterialServiceError::Material` for invalid drafts and
    /// `MaterialServiceError::CourseNotFound` for an unknown course.
    pub async fn create_material(
        &self,
        course_id: CourseId,
        draft: MaterialDraft,
        uploaded_by: UserId,
    ) -> Result<Material, MaterialServiceError> {
        let material = Material::new(
            MaterialId::new(0),
            course_id,
            draft,
            uploaded_by,
            self.clock.now(),
        )?;
        let id = match self.materials.insert_material(&material).await {
            Ok(id) => id,
            Err(StorageError::NotFound) => return Err(MaterialServiceError::CourseNotFound),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(material_id = %id, course_id = %course_id, "created material");
        self.get_material(id).await
    }

    /// # Errors
    ///
    /// Returns `MaterialServiceError::NotFound` or `MaterialServiceError::Material`.
    pub async fn update_material(
        &self,
        id: MaterialId,
        draft: MaterialDraft,
    ) -> Result<Material, MaterialServiceError> {
        let mut material = self.get_material(id).await?;
        material.apply(draft)?;
        match self.materials.update_material(&material).await {
            Ok(()) => Ok(material),
            Err(StorageError::NotFound) => Err(MaterialServiceError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `MaterialServiceError::NotFound` if the material does not exist.
    pub async fn delete_material(&self, id: MaterialId) -> Result<(), MaterialServiceError> {
        match self.materials.delete_material(id).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(MaterialServiceError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_course(&self, course_id: CourseId) -> Result<(), MaterialServiceError> {
        self.courses
            .get_course(course_id)
            .await?
            .map(|_| ())
            .ok_or(MaterialServiceError::CourseNotFound)
    }
}
