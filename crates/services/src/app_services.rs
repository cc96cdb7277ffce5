use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::admin_service::AdminService;
use crate::auth::{AuthService, PasswordHasher, TokenConfig, TokenIssuer};
use crate::course_service::CourseService;
use crate::error::AppServicesError;
use crate::material_service::MaterialService;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::tutor_service::{TutorConfig, TutorService};

/// Settings needed to wire the services together.
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub tokens: TokenConfig,
    pub bcrypt_cost: u32,
    pub tutor: Option<TutorConfig>,
}

/// Assembles every service over one `Storage`.
#[derive(Clone)]
pub struct AppServices {
    auth: Arc<AuthService>,
    courses: Arc<CourseService>,
    materials: Arc<MaterialService>,
    quizzes: Arc<QuizService>,
    progress: Arc<ProgressService>,
    admin: Arc<AdminService>,
    tutor: Arc<TutorService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// token secret is too weak.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: ServicesConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(&storage, clock, config)
    }

    /// # Errors
    ///
    /// Returns `AppServicesError::Auth` if the token secret is too weak.
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        config: ServicesConfig,
    ) -> Result<Self, AppServicesError> {
        let issuer = TokenIssuer::new(&config.tokens)?;
        let auth = Arc::new(AuthService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.refresh_tokens),
            PasswordHasher::new(config.bcrypt_cost),
            issuer,
        ));
        let courses = Arc::new(CourseService::new(clock, Arc::clone(&storage.courses)));
        let materials = Arc::new(MaterialService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.materials),
        ));
        let quizzes = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.attempts),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.courses),
            Arc::clone(&storage.attempts),
        ));
        let admin = Arc::new(AdminService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.refresh_tokens),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.stats),
        ));
        let tutor = Arc::new(TutorService::new(
            config.tutor,
            Arc::clone(&storage.courses),
        ));

        Ok(Self {
            auth,
            courses,
            materials,
            quizzes,
            progress,
            admin,
            tutor,
        })
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn courses(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    #[must_use]
    pub fn materials(&self) -> Arc<MaterialService> {
        Arc::clone(&self.materials)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminService> {
        Arc::clone(&self.admin)
    }

    #[must_use]
    pub fn tutor(&self) -> Arc<TutorService> {
        Arc::clone(&self.tutor)
    }
}
