use std::sync::Arc;

use chrono::{DateTime, Utc};
use storage::repository::{
    NewRefreshToken, RefreshTokenRepository, StorageError, UserRepository,
};
use study_core::model::{Email, NewUser, Role, StudentProfile, User, UserId};

use super::password::PasswordHasher;
use super::tokens::{Principal, TokenIssuer, hash_refresh_token};
use crate::Clock;
use crate::error::AuthError;

/// Input for self-service registration. New accounts are always students.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub profile: StudentProfile,
}

/// A signed-in user with a fresh access/refresh pair.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Outcome of `AuthService::seed_admin`.
#[derive(Debug, Clone)]
pub struct SeededAdmin {
    pub user: User,
    pub created: bool,
}

/// Registration, login and token lifecycle.
#[derive(Clone)]
pub struct AuthService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn RefreshTokenRepository>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
}

impl AuthService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn RefreshTokenRepository>,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            clock,
            users,
            tokens,
            hasher,
            issuer,
        }
    }

    /// Create a student account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailTaken` for a registered email, `AuthError::User`
    /// for invalid profile input and `AuthError::PasswordLength` for a weak password.
    pub async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError> {
        PasswordHasher::check_policy(&registration.password)?;
        let now = self.clock.now();
        let new_user = NewUser::new(
            &registration.email,
            &registration.full_name,
            Role::Student,
            registration.profile,
            now,
        )?;
        let hash = self.hasher.hash(&registration.password).await?;

        let id = match self.users.insert_user(&new_user, &hash).await {
            Ok(id) => id,
            Err(StorageError::Conflict) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        };
        let user = User::from_new(id, new_user);
        tracing::info!(user_id = %id, "registered user");
        self.open_session(user, now).await
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or wrong
    /// password, and `AuthError::AccountDisabled` for deactivated accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let Some(credentials) = self.users.find_credentials(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !self
            .hasher
            .verify(password, &credentials.password_hash)
            .await?
        {
            tracing::debug!(user_id = %credentials.user.id(), "login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        if !credentials.user.is_active() {
            return Err(AuthError::AccountDisabled);
        }
        self.open_session(credentials.user, self.clock.now()).await
    }

    /// Rotate a refresh token: the presented token is consumed and a new pair issued.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for unknown tokens, `AuthError::TokenExpired`
    /// for expired ones and `AuthError::TokenReused` when a revoked token is replayed.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let now = self.clock.now();
        let hash = hash_refresh_token(refresh_token);
        let Some(record) = self.tokens.find_by_hash(&hash).await? else {
            return Err(AuthError::InvalidToken);
        };

        // An expired token is rejected before it can count as a replay.
        if record.is_expired(now) {
            return Err(AuthError::TokenExpired);
        }
        if record.is_revoked() || !self.tokens.revoke(record.id, now).await? {
            let revoked = self.tokens.revoke_all_for_user(record.user_id, now).await?;
            tracing::warn!(
                user_id = %record.user_id,
                revoked,
                "refresh token replayed; revoked all sessions"
            );
            return Err(AuthError::TokenReused);
        }

        let user = self
            .users
            .get_user(record.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active() {
            return Err(AuthError::AccountDisabled);
        }
        self.open_session(user, now).await
    }

    /// Revoke a refresh token. Unknown or already revoked tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if repository access fails.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let hash = hash_refresh_token(refresh_token);
        if let Some(record) = self.tokens.find_by_hash(&hash).await? {
            self.tokens.revoke(record.id, self.clock.now()).await?;
        }
        Ok(())
    }

    /// Replace the password after checking the current one; every session is revoked.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` does not match.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        PasswordHasher::check_policy(new_password)?;
        let credentials = self
            .users
            .get_credentials(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !self
            .hasher
            .verify(current, &credentials.password_hash)
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        let hash = self.hasher.hash(new_password).await?;
        self.users.update_password(user_id, &hash).await?;
        let revoked = self
            .tokens
            .revoke_all_for_user(user_id, self.clock.now())
            .await?;
        tracing::info!(user_id = %user_id, revoked, "password changed");
        Ok(())
    }

    /// Resolve an access token to the current principal.
    ///
    /// The role comes from storage so role changes and deactivation apply immediately.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken`, `AuthError::TokenExpired` or
    /// `AuthError::AccountDisabled`.
    pub async fn authenticate(&self, access_token: &str) -> Result<Principal, AuthError> {
        let claimed = self.issuer.verify_access(access_token, self.clock.now())?;
        let user = self
            .users
            .get_user(claimed.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active() {
            return Err(AuthError::AccountDisabled);
        }
        Ok(Principal {
            user_id: user.id(),
            role: user.role(),
        })
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the user no longer exists.
    pub async fn current_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Create an admin account, or promote an existing one and reset its password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::User` for invalid input and `AuthError::PasswordLength`
    /// for a weak password.
    pub async fn seed_admin(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SeededAdmin, AuthError> {
        PasswordHasher::check_policy(password)?;
        let new_user = NewUser::new(
            email,
            full_name,
            Role::Admin,
            StudentProfile::default(),
            self.clock.now(),
        )?;
        let hash = self.hasher.hash(password).await?;

        if let Some(existing) = self.users.find_credentials(&new_user.email).await? {
            let mut user = existing.user;
            self.users.set_role(user.id(), Role::Admin).await?;
            self.users.set_active(user.id(), true).await?;
            self.users.update_password(user.id(), &hash).await?;
            user.set_role(Role::Admin);
            user.set_active(true);
            tracing::info!(user_id = %user.id(), "promoted existing user to admin");
            return Ok(SeededAdmin {
                user,
                created: false,
            });
        }

        let id = self.users.insert_user(&new_user, &hash).await?;
        tracing::info!(user_id = %id, "created admin user");
        Ok(SeededAdmin {
            user: User::from_new(id, new_user),
            created: true,
        })
    }

    async fn open_session(&self, user: User, now: DateTime<Utc>) -> Result<AuthSession, AuthError> {
        let access = self.issuer.issue_access(user.id(), user.role(), now)?;
        let refresh = self.issuer.issue_refresh(now);
        self.tokens
            .insert_token(&NewRefreshToken {
                user_id: user.id(),
                token_hash: refresh.hash,
                issued_at: now,
                expires_at: refresh.expires_at,
            })
            .await?;

        Ok(AuthSession {
            user,
            access_token: access.token,
            access_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
        })
    }
}
