use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;
/// bcrypt ignores everything past 72 bytes.
pub const MAX_PASSWORD_LEN: usize = 72;
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// bcrypt hashing on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher {
    /// Costs outside bcrypt's accepted range are clamped into it.
    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(4, 31),
        }
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// # Errors
    ///
    /// Returns `AuthError::PasswordLength` when the password is too short or too long.
    pub fn check_policy(password: &str) -> Result<(), AuthError> {
        let len = password.len();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
            return Err(AuthError::PasswordLength {
                min: MIN_PASSWORD_LEN,
                max: MAX_PASSWORD_LEN,
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AuthError::Hashing` if bcrypt fails or the blocking task panics.
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let cost = self.cost;
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// A malformed stored hash verifies as `false`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hashing` if the blocking task panics.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(verified.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_bounds() {
        assert!(PasswordHasher::check_policy("short").is_err());
        assert!(PasswordHasher::check_policy("long enough").is_ok());
        assert!(PasswordHasher::check_policy(&"x".repeat(73)).is_err());
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(PasswordHasher::new(1).cost(), 4);
        assert_eq!(PasswordHasher::new(99).cost(), 31);
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("correct horse").await.unwrap();
        assert!(hasher.verify("correct horse", &hash).await.unwrap());
        assert!(!hasher.verify("wrong horse", &hash).await.unwrap());
        assert!(!hasher.verify("correct horse", "not-a-hash").await.unwrap());
    }
}
