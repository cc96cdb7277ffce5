use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use study_core::model::{Email, NewUser, Page, PageRequest, Role, User, UserId};

use super::SqliteRepository;
use super::mapping::{
    count_to_u64, db_err, id_to_i64, level_to_i64, like_pattern, map_user_row, ser,
    user_id_from_i64,
};
use crate::repository::{
    StorageError, StudyCredit, StudyUpdate, UserCredentials, UserFilter, UserRepository,
};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, university, department, \
     level, points, current_streak, longest_streak, last_study_date, is_active, created_at";

fn push_user_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (lower(email) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(full_name) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
}

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(
        &self,
        user: &NewUser,
        password_hash: &str,
    ) -> Result<UserId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (email, password_hash, full_name, role, university, department, level, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(user.email.as_str())
        .bind(password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.profile.university.as_deref())
        .bind(user.profile.department.as_deref())
        .bind(level_to_i64(user.profile.level))
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        user_id_from_i64(res.last_insert_rowid())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id_to_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(credentials_from_row).transpose()
    }

    async fn get_credentials(&self, id: UserId) -> Result<Option<UserCredentials>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id_to_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(credentials_from_row).transpose()
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(password_hash)
            .bind(id_to_i64("user_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE users SET role = ?1 WHERE id = ?2")
            .bind(role.as_str())
            .bind(id_to_i64("user_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE users SET is_active = ?1 WHERE id = ?2")
            .bind(active)
            .bind(id_to_i64("user_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn add_points(&self, id: UserId, points: u32) -> Result<User, StorageError> {
        let user_id = id_to_i64("user_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        increment_points(&mut tx, user_id, points).await?;
        let user = fetch_user(&mut tx, user_id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(user)
    }

    async fn apply_study_credit(
        &self,
        id: UserId,
        credit: StudyCredit,
    ) -> Result<StudyUpdate, StorageError> {
        let user_id = id_to_i64("user_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let update = credit_study(&mut tx, user_id, credit).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(update)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id_to_i64("user_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, StorageError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_user_filters(&mut select, filter);
        select
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).map_err(ser)?);
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            users.push(map_user_row(row)?);
        }
        Ok(Page::new(users, page, count_to_u64(total)))
    }
}

fn credentials_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserCredentials, StorageError> {
    Ok(UserCredentials {
        user: map_user_row(row)?,
        password_hash: row.try_get("password_hash").map_err(ser)?,
    })
}

/// Add points relative to the stored total, saturating at `u32::MAX`.
async fn increment_points(
    conn: &mut SqliteConnection,
    user_id: i64,
    points: u32,
) -> Result<(), StorageError> {
    let res = sqlx::query("UPDATE users SET points = MIN(points + ?1, ?2) WHERE id = ?3")
        .bind(i64::from(points))
        .bind(i64::from(u32::MAX))
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

async fn fetch_user(conn: &mut SqliteConnection, user_id: i64) -> Result<User, StorageError> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;
    map_user_row(&row)
}

/// Apply a `StudyCredit` inside an open transaction.
///
/// The points write runs first, so the transaction already holds the write
/// lock when the streak is read back.
pub(super) async fn credit_study(
    conn: &mut SqliteConnection,
    user_id: i64,
    credit: StudyCredit,
) -> Result<StudyUpdate, StorageError> {
    increment_points(conn, user_id, credit.points).await?;
    let mut user = fetch_user(conn, user_id).await?;

    let change = user.record_study(credit.today);
    if !change.is_modified() {
        return Ok(StudyUpdate {
            user,
            change,
            bonus_awarded: 0,
        });
    }

    user.award_points(credit.daily_bonus);
    sqlx::query(
        r"
        UPDATE users SET
            points = ?1,
            current_streak = ?2,
            longest_streak = ?3,
            last_study_date = ?4
        WHERE id = ?5
        ",
    )
    .bind(i64::from(user.points()))
    .bind(i64::from(user.streak().current()))
    .bind(i64::from(user.streak().longest()))
    .bind(user.streak().last_study_date())
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    Ok(StudyUpdate {
        user,
        change,
        bonus_awarded: credit.daily_bonus,
    })
}
