#![forbid(unsafe_code)]

pub mod admin_service;
pub mod app_services;
pub mod auth;
pub mod course_service;
pub mod error;
pub mod material_service;
pub mod progress_service;
pub mod quiz_service;
pub mod tutor_service;

pub use study_core::Clock;

pub use admin_service::{AdminService, AdminStats};
pub use app_services::{AppServices, ServicesConfig};
pub use auth::{AuthService, AuthSession, PasswordHasher, Principal, Registration, TokenConfig};
pub use course_service::CourseService;
pub use error::{
    AdminServiceError, AppServicesError, AuthError, CourseServiceError, MaterialServiceError,
    ProgressServiceError, QuizServiceError, TutorError,
};
pub use material_service::MaterialService;
pub use progress_service::{DAILY_STUDY_POINTS, Dashboard, ProgressService, StudyActivity};
pub use quiz_service::{
    PaperOption, PaperQuestion, QuizDetail, QuizPaper, QuizService, SubmissionOutcome,
};
pub use tutor_service::{ChatTurn, TurnRole, TutorConfig, TutorReply, TutorService};
