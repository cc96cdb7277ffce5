use sqlx::{QueryBuilder, Sqlite};
use study_core::model::{CourseId, Material, MaterialId, MaterialKind, Page, PageRequest};

use super::SqliteRepository;
use super::mapping::{
    count_to_u64, db_err, id_to_i64, map_material_row, material_id_from_i64, ser,
};
use crate::repository::{MaterialRepository, StorageError};

const MATERIAL_COLUMNS: &str =
    "id, course_id, title, kind, description, resource_url, uploaded_by, created_at";

fn push_material_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    course_id: i64,
    kind: Option<MaterialKind>,
) {
    qb.push(" WHERE course_id = ").push_bind(course_id);
    if let Some(kind) = kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
}

#[async_trait::async_trait]
impl MaterialRepository for SqliteRepository {
    async fn insert_material(&self, material: &Material) -> Result<MaterialId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO materials (course_id, title, kind, description, resource_url, uploaded_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_to_i64("course_id", material.course_id().value())?)
        .bind(material.title())
        .bind(material.kind().as_str())
        .bind(material.description())
        .bind(material.resource_url().as_str())
        .bind(id_to_i64("user_id", material.uploaded_by().value())?)
        .bind(material.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        material_id_from_i64(res.last_insert_rowid())
    }

    async fn get_material(&self, id: MaterialId) -> Result<Option<Material>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ?1"
        ))
        .bind(id_to_i64("material_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_material_row).transpose()
    }

    async fn update_material(&self, material: &Material) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE materials SET
                title = ?1,
                kind = ?2,
                description = ?3,
                resource_url = ?4
            WHERE id = ?5
            ",
        )
        .bind(material.title())
        .bind(material.kind().as_str())
        .bind(material.description())
        .bind(material.resource_url().as_str())
        .bind(id_to_i64("material_id", material.id().value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_material(&self, id: MaterialId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM materials WHERE id = ?1")
            .bind(id_to_i64("material_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_materials(
        &self,
        course_id: CourseId,
        kind: Option<MaterialKind>,
        page: PageRequest,
    ) -> Result<Page<Material>, StorageError> {
        let course = id_to_i64("course_id", course_id.value())?;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM materials");
        push_material_filters(&mut count, course, kind);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {MATERIAL_COLUMNS} FROM materials"));
        push_material_filters(&mut select, course, kind);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).map_err(ser)?);
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut materials = Vec::with_capacity(rows.len());
        for row in &rows {
            materials.push(map_material_row(row)?);
        }
        Ok(Page::new(materials, page, count_to_u64(total)))
    }
}
