mod password;
mod service;
mod tokens;

pub use password::{
    DEFAULT_BCRYPT_COST, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN, PasswordHasher,
};
pub use service::{AuthService, AuthSession, Registration, SeededAdmin};
pub use tokens::{
    AccessToken, DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS, MIN_SECRET_LEN, Principal,
    RefreshToken, TokenConfig, TokenIssuer, hash_refresh_token,
};
