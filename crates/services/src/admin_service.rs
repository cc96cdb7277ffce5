use std::sync::Arc;

use storage::repository::{
    AttemptRepository, PlatformStats, RefreshTokenRepository, StatsRepository, StorageError,
    UserFilter, UserRepository,
};
use study_core::model::{Page, PageRequest, QuizAttempt, Role, User, UserId};

use crate::Clock;
use crate::auth::Principal;
use crate::error::AdminServiceError;

/// Platform totals plus derived rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdminStats {
    pub platform: PlatformStats,
    /// Share of attempts that passed, as a percentage.
    pub pass_rate: Option<f64>,
}

/// User administration and platform statistics.
#[derive(Clone)]
pub struct AdminService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn RefreshTokenRepository>,
    attempts: Arc<dyn AttemptRepository>,
    stats: Arc<dyn StatsRepository>,
}

impl AdminService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn RefreshTokenRepository>,
        attempts: Arc<dyn AttemptRepository>,
        stats: Arc<dyn StatsRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            tokens,
            attempts,
            stats,
        }
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Storage` if repository access fails.
    pub async fn stats(&self) -> Result<AdminStats, AdminServiceError> {
        let platform = self.stats.platform_stats(self.clock.today()).await?;
        #[allow(clippy::cast_precision_loss)]
        let pass_rate = (platform.attempts > 0)
            .then(|| 100.0 * platform.passed_attempts as f64 / platform.attempts as f64);
        Ok(AdminStats {
            platform,
            pass_rate,
        })
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Storage` if repository access fails.
    pub async fn recent_attempts(&self, limit: u32) -> Result<Vec<QuizAttempt>, AdminServiceError> {
        Ok(self.attempts.list_recent(limit).await?)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::Storage` if repository access fails.
    pub async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, AdminServiceError> {
        Ok(self.users.list_users(filter, page).await?)
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::SelfModification` when an admin demotes
    /// themselves and `AdminServiceError::UserNotFound` for unknown users.
    pub async fn set_role(
        &self,
        actor: &Principal,
        target: UserId,
        role: Role,
    ) -> Result<User, AdminServiceError> {
        if actor.user_id == target && !role.is_admin() {
            return Err(AdminServiceError::SelfModification);
        }
        self.users.set_role(target, role).await.map_err(user_not_found)?;
        let user = self.load_user(target).await?;
        tracing::info!(actor = %actor.user_id, user_id = %target, role = role.as_str(), "changed role");
        Ok(user)
    }

    /// Deactivating a user also revokes their refresh tokens.
    ///
    /// # Errors
    ///
    /// Returns `AdminServiceError::SelfModification` when an admin deactivates
    /// themselves and `AdminServiceError::UserNotFound` for unknown users.
    pub async fn set_active(
        &self,
        actor: &Principal,
        target: UserId,
        active: bool,
    ) -> Result<User, AdminServiceError> {
        if actor.user_id == target && !active {
            return Err(AdminServiceError::SelfModification);
        }
        self.users
            .set_active(target, active)
            .await
            .map_err(user_not_found)?;
        if !active {
            self.tokens
                .revoke_all_for_user(target, self.clock.now())
                .await?;
        }
        tracing::info!(actor = %actor.user_id, user_id = %target, active, "changed account status");
        self.load_user(target).await
    }

    /// # Errors
    ///
    /// Returns `AdminServiceError::SelfModification` when an admin deletes
    /// themselves and `AdminServiceError::UserNotFound` for unknown users.
    pub async fn delete_user(
        &self,
        actor: &Principal,
        target: UserId,
    ) -> Result<(), AdminServiceError> {
        if actor.user_id == target {
            return Err(AdminServiceError::SelfModification);
        }
        self.users.delete_user(target).await.map_err(user_not_found)?;
        tracing::info!(actor = %actor.user_id, user_id = %target, "deleted user");
        Ok(())
    }

    async fn load_user(&self, id: UserId) -> Result<User, AdminServiceError> {
        self.users
            .get_user(id)
            .await?
            .ok_or(AdminServiceError::UserNotFound)
    }
}

fn user_not_found(err: StorageError) -> AdminServiceError {
    match err {
        StorageError::NotFound => AdminServiceError::UserNotFound,
        other => AdminServiceError::Storage(other),
    }
}
