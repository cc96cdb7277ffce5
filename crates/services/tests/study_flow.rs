use std::collections::HashMap;

use chrono::Duration;
use services::auth::Registration;
use services::{
    AdminServiceError, AppServices, Clock, CourseServiceError, Principal, QuizServiceError,
    ServicesConfig, TokenConfig,
};
use storage::repository::{CourseFilter, Storage, UserFilter, UserRepository};
use study_core::model::{
    AnswerDraft, CourseDraft, Level, MaterialDraft, MaterialKind, PageRequest, QuestionDraft,
    QuizDraft, Role, Semester, StreakChange, StudentProfile,
};
use study_core::time::fixed_now;

async fn app(name: &str, clock: Clock) -> (AppServices, Storage) {
    let storage = Storage::sqlite(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect sqlite");
    let config = ServicesConfig {
        tokens: TokenConfig::new("test-secret-test-secret-test-secret"),
        bcrypt_cost: 4,
        tutor: None,
    };
    let services = AppServices::from_storage(&storage, clock, config).expect("services");
    (services, storage)
}

async fn register(services: &AppServices, email: &str) -> Principal {
    let session = services
        .auth()
        .register(Registration {
            email: email.into(),
            password: "s3cret-pass".into(),
            full_name: "Funke Adebayo".into(),
            profile: StudentProfile::default(),
        })
        .await
        .expect("register");
    Principal {
        user_id: session.user.id(),
        role: session.user.role(),
    }
}

async fn admin(services: &AppServices) -> Principal {
    let seeded = services
        .auth()
        .seed_admin("admin@unilag.edu.ng", "admin-pass-123", "Platform Admin")
        .await
        .expect("seed admin");
    Principal {
        user_id: seeded.user.id(),
        role: Role::Admin,
    }
}

fn course_draft(code: &str) -> CourseDraft {
    CourseDraft {
        code: code.into(),
        title: "Introduction to Programming".into(),
        description: Some("Basics".into()),
        department: Some("Computer Science".into()),
        level: Some(Level::new(100).unwrap()),
        semester: Some(Semester::First),
    }
}

fn quiz_draft() -> QuizDraft {
    QuizDraft {
        title: "Loops".into(),
        description: None,
        passing_score: 60,
        time_limit_minutes: None,
    }
}

fn bank() -> Vec<QuestionDraft> {
    let q = |text: &str, points| QuestionDraft {
        text: text.into(),
        points,
        answers: vec![
            AnswerDraft {
                text: "yes".into(),
                is_correct: true,
            },
            AnswerDraft {
                text: "no".into(),
                is_correct: false,
            },
        ],
    };
    vec![q("Is a for loop a loop?", 2), q("Is while a loop?", 2)]
}

#[tokio::test]
async fn submission_scores_awards_points_and_extends_streak() {
    let (services, _) = app("memdb_flow_submit", Clock::fixed(fixed_now())).await;
    let admin = admin(&services).await;
    let student = register(&services, "funke@unilag.edu.ng").await;

    let course = services
        .courses()
        .create_course(course_draft("csc101"), admin.user_id)
        .await
        .unwrap();
    let detail = services
        .quizzes()
        .create_quiz(course.id(), quiz_draft(), bank(), true, admin.user_id)
        .await
        .unwrap();

    let paper = services
        .quizzes()
        .get_for_taking(detail.quiz.id(), &student)
        .await
        .unwrap();
    assert_eq!(paper.questions.len(), 2);
    assert_eq!(paper.questions[0].options.len(), 2);

    // One right, one wrong: 50% against a 60% bar.
    let first = &detail.questions[0];
    let second = &detail.questions[1];
    let wrong = second.answers.iter().find(|a| !a.is_correct).unwrap().id;
    let answers = HashMap::from([
        (first.id, first.correct_answer_ids().next().unwrap()),
        (second.id, wrong),
    ]);
    let outcome = services
        .quizzes()
        .submit(&student, detail.quiz.id(), answers)
        .await
        .unwrap();
    assert_eq!(outcome.score.earned_points, 2);
    assert_eq!(outcome.score.total_points, 4);
    assert!(!outcome.score.passed);
    assert_eq!(outcome.total_user_points, 2);
    assert_eq!(outcome.streak_change, StreakChange::Started);

    let dashboard = services.progress().dashboard(student.user_id).await.unwrap();
    assert_eq!(dashboard.user.points(), 2);
    assert_eq!(dashboard.attempts.attempts, 1);
    assert_eq!(dashboard.recent_attempts.len(), 1);

    let fetched = services
        .quizzes()
        .get_attempt(outcome.attempt.id, &student)
        .await
        .unwrap();
    assert_eq!(fetched.id, outcome.attempt.id);
    assert!(services
        .quizzes()
        .get_attempt(outcome.attempt.id, &admin)
        .await
        .is_ok());

    let stranger = register(&services, "tunde@unilag.edu.ng").await;
    assert!(matches!(
        services
            .quizzes()
            .get_attempt(outcome.attempt.id, &stranger)
            .await,
        Err(QuizServiceError::Forbidden)
    ));
}

#[tokio::test]
async fn unpublished_quizzes_are_hidden_from_students() {
    let (services, _) = app("memdb_flow_publish", Clock::fixed(fixed_now())).await;
    let admin = admin(&services).await;
    let student = register(&services, "funke@unilag.edu.ng").await;
    let course = services
        .courses()
        .create_course(course_draft("CSC102"), admin.user_id)
        .await
        .unwrap();
    let detail = services
        .quizzes()
        .create_quiz(course.id(), quiz_draft(), bank(), false, admin.user_id)
        .await
        .unwrap();

    let listed = services
        .quizzes()
        .list_quizzes(course.id(), &student, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
    assert!(matches!(
        services
            .quizzes()
            .get_for_taking(detail.quiz.id(), &student)
            .await,
        Err(QuizServiceError::NotFound)
    ));
    assert!(matches!(
        services
            .quizzes()
            .submit(&student, detail.quiz.id(), HashMap::new())
            .await,
        Err(QuizServiceError::NotFound)
    ));

    services
        .quizzes()
        .set_published(detail.quiz.id(), true)
        .await
        .unwrap();
    let listed = services
        .quizzes()
        .list_quizzes(course.id(), &student, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);

    let updated = services
        .quizzes()
        .update_quiz(detail.quiz.id(), quiz_draft(), Some(bank()[..1].to_vec()))
        .await
        .unwrap();
    assert_eq!(updated.questions.len(), 1);
    assert!(updated.quiz.is_published());

    services.quizzes().delete_quiz(detail.quiz.id()).await.unwrap();
    assert!(matches!(
        services.quizzes().get_full(detail.quiz.id()).await,
        Err(QuizServiceError::NotFound)
    ));
}

#[tokio::test]
async fn courses_materials_and_mastery() {
    let (services, _) = app("memdb_flow_courses", Clock::fixed(fixed_now())).await;
    let admin = admin(&services).await;
    let student = register(&services, "funke@unilag.edu.ng").await;

    let course = services
        .courses()
        .create_course(course_draft("CSC103"), admin.user_id)
        .await
        .unwrap();
    assert!(matches!(
        services
            .courses()
            .create_course(course_draft("csc103"), admin.user_id)
            .await,
        Err(CourseServiceError::DuplicateCode)
    ));

    let mut draft = course_draft("CSC103");
    draft.title = "Programming I".into();
    let updated = services
        .courses()
        .update_course(course.id(), draft)
        .await
        .unwrap();
    assert_eq!(updated.title(), "Programming I");

    let listed = services
        .courses()
        .list_courses(
            &CourseFilter {
                level: Some(Level::new(100).unwrap()),
                ..CourseFilter::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(listed.total, 1);

    let material = services
        .materials()
        .create_material(
            course.id(),
            MaterialDraft {
                title: "2019 exam".into(),
                kind: MaterialKind::PastQuestion,
                description: None,
                resource_url: "https://files.unilag.edu.ng/csc103-2019.pdf".into(),
            },
            admin.user_id,
        )
        .await
        .unwrap();
    let materials = services
        .materials()
        .list_materials(course.id(), None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(materials.items, vec![material.clone()]);

    services.courses().enroll(student.user_id, course.id()).await.unwrap();
    let progress = services
        .courses()
        .set_mastery(student.user_id, course.id(), 75.0)
        .await
        .unwrap();
    assert_eq!(progress.mastery.value(), 75.0);
    assert!(matches!(
        services
            .courses()
            .set_mastery(student.user_id, course.id(), 101.0)
            .await,
        Err(CourseServiceError::Course(_))
    ));

    let dashboard = services.progress().dashboard(student.user_id).await.unwrap();
    assert_eq!(dashboard.courses.len(), 1);
    assert_eq!(dashboard.average_mastery(), Some(75.0));

    services.courses().delete_course(course.id()).await.unwrap();
    assert!(services
        .materials()
        .get_material(material.id())
        .await
        .is_err());
}

#[tokio::test]
async fn study_activity_counts_once_per_day() {
    let start = fixed_now();
    let (services, storage) = app("memdb_flow_streak", Clock::fixed(start)).await;
    let student = register(&services, "funke@unilag.edu.ng").await;

    let first = services
        .progress()
        .record_study_activity(student.user_id)
        .await
        .unwrap();
    assert_eq!(first.change, StreakChange::Started);
    assert_eq!(first.points_awarded, services::DAILY_STUDY_POINTS);

    let again = services
        .progress()
        .record_study_activity(student.user_id)
        .await
        .unwrap();
    assert_eq!(again.change, StreakChange::Unchanged);
    assert_eq!(again.points_awarded, 0);

    let config = ServicesConfig {
        tokens: TokenConfig::new("test-secret-test-secret-test-secret"),
        bcrypt_cost: 4,
        tutor: None,
    };
    let tomorrow = AppServices::from_storage(
        &storage,
        Clock::fixed(start + Duration::days(1)),
        config,
    )
    .unwrap();
    let next = tomorrow
        .progress()
        .record_study_activity(student.user_id)
        .await
        .unwrap();
    assert_eq!(next.change, StreakChange::Extended);
    assert_eq!(next.user.streak().current(), 2);
    assert_eq!(next.user.points(), 2 * services::DAILY_STUDY_POINTS);
}

#[tokio::test]
async fn admins_manage_users_but_not_themselves() {
    let (services, _) = app("memdb_flow_admin", Clock::fixed(fixed_now())).await;
    let admin = admin(&services).await;
    let student = register(&services, "funke@unilag.edu.ng").await;

    assert!(matches!(
        services
            .admin()
            .set_role(&admin, admin.user_id, Role::Student)
            .await,
        Err(AdminServiceError::SelfModification)
    ));
    assert!(matches!(
        services.admin().set_active(&admin, admin.user_id, false).await,
        Err(AdminServiceError::SelfModification)
    ));

    let promoted = services
        .admin()
        .set_role(&admin, student.user_id, Role::Admin)
        .await
        .unwrap();
    assert!(promoted.role().is_admin());

    let deactivated = services
        .admin()
        .set_active(&admin, student.user_id, false)
        .await
        .unwrap();
    assert!(!deactivated.is_active());

    let stats = services.admin().stats().await.unwrap();
    assert_eq!(stats.platform.users, 2);
    assert_eq!(stats.platform.active_users, 1);
    assert_eq!(stats.pass_rate, None);

    let users = services
        .admin()
        .list_users(&UserFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(users.total, 2);

    services
        .progress()
        .award_points(student.user_id, 15)
        .await
        .unwrap();
    services
        .admin()
        .delete_user(&admin, student.user_id)
        .await
        .unwrap();
    assert!(matches!(
        services.admin().delete_user(&admin, student.user_id).await,
        Err(AdminServiceError::UserNotFound)
    ));
    assert!(services.admin().recent_attempts(10).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_keep_every_award() {
    let (services, storage) = app("memdb_flow_concurrent", Clock::fixed(fixed_now())).await;
    let admin = admin(&services).await;
    let student = register(&services, "funke@unilag.edu.ng").await;
    let course = services
        .courses()
        .create_course(course_draft("CSC104"), admin.user_id)
        .await
        .unwrap();
    let detail = services
        .quizzes()
        .create_quiz(course.id(), quiz_draft(), bank(), true, admin.user_id)
        .await
        .unwrap();
    let answers: HashMap<_, _> = detail
        .questions
        .iter()
        .map(|q| (q.id, q.correct_answer_ids().next().unwrap()))
        .collect();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let quizzes = services.quizzes();
        let answers = answers.clone();
        let quiz_id = detail.quiz.id();
        handles.push(tokio::spawn(async move {
            quizzes.submit(&student, quiz_id, answers).await
        }));
    }
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.score.earned_points, 4);
    }

    let user = storage.users.get_user(student.user_id).await.unwrap().unwrap();
    assert_eq!(user.points(), 32);
    assert_eq!(user.streak().current(), 1);
    let attempts = services
        .quizzes()
        .list_attempts(student.user_id, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(attempts.total, 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn admin_changes_do_not_clobber_student_progress() {
    let (services, storage) = app("memdb_flow_admin_race", Clock::fixed(fixed_now())).await;
    let admin = admin(&services).await;
    let student = register(&services, "funke@unilag.edu.ng").await;

    let progress = services.progress();
    let admin_service = services.admin();
    let (activity, awarded, promoted) = tokio::join!(
        progress.record_study_activity(student.user_id),
        progress.award_points(student.user_id, 10),
        admin_service.set_role(&admin, student.user_id, Role::Admin),
    );
    activity.unwrap();
    awarded.unwrap();
    promoted.unwrap();

    let (deactivated, again) = tokio::join!(
        admin_service.set_active(&admin, student.user_id, false),
        progress.award_points(student.user_id, 7),
    );
    deactivated.unwrap();
    again.unwrap();

    let user = storage.users.get_user(student.user_id).await.unwrap().unwrap();
    assert!(user.role().is_admin());
    assert!(!user.is_active());
    assert_eq!(user.points(), services::DAILY_STUDY_POINTS + 17);
    assert_eq!(user.streak().current(), 1);
}
