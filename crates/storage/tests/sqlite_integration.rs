use std::collections::HashMap;

use chrono::Duration;
use storage::repository::{
    AttemptRepository, CourseFilter, CourseRepository, MaterialRepository, NewRefreshToken,
    QuizRepository, RefreshTokenRepository, StatsRepository, StorageError, StudyCredit,
    UserFilter, UserRepository,
};
use storage::sqlite::SqliteRepository;
use study_core::model::{
    AnswerDraft, Course, CourseDraft, CourseId, CourseProgress, Level, Mastery, Material,
    MaterialDraft, MaterialId, MaterialKind, NewQuizAttempt, NewUser, PageRequest, QuestionDraft,
    Quiz, QuizDraft, QuizId, Role, Semester, StreakChange, StudentProfile, User, UserId,
    score_submission,
};
use study_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn insert_student(repo: &SqliteRepository, email: &str) -> User {
    let new = NewUser::new(
        email,
        "Ada Obi",
        Role::Student,
        StudentProfile {
            university: Some("UNILAG".into()),
            department: Some("Computer Science".into()),
            level: Some(Level::new(300).unwrap()),
        },
        fixed_now(),
    )
    .unwrap();
    let id = repo.insert_user(&new, "hash").await.expect("insert user");
    repo.get_user(id).await.unwrap().expect("user exists")
}

async fn insert_course(repo: &SqliteRepository, code: &str, author: UserId) -> Course {
    let draft = CourseDraft {
        code: code.into(),
        title: format!("{code} title"),
        description: None,
        department: Some("Computer Science".into()),
        level: Some(Level::new(300).unwrap()),
        semester: Some(Semester::First),
    };
    let course = Course::new(CourseId::new(0), draft, author, fixed_now()).unwrap();
    let id = repo.insert_course(&course).await.expect("insert course");
    repo.get_course(id).await.unwrap().expect("course exists")
}

fn two_question_bank() -> Vec<QuestionDraft> {
    let question = |text: &str, points| QuestionDraft {
        text: text.into(),
        points,
        answers: vec![
            AnswerDraft {
                text: "right".into(),
                is_correct: true,
            },
            AnswerDraft {
                text: "wrong".into(),
                is_correct: false,
            },
        ],
    };
    vec![question("first?", 2), question("second?", 3)]
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let repo = connect("memdb_dup_email").await;
    insert_student(&repo, "ada@unilag.edu.ng").await;

    let again = NewUser::new(
        "ADA@unilag.edu.ng",
        "Someone Else",
        Role::Student,
        StudentProfile::default(),
        fixed_now(),
    )
    .unwrap();
    let err = repo.insert_user(&again, "hash").await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn user_updates_and_filters_roundtrip() {
    let repo = connect("memdb_users").await;
    let mut user = insert_student(&repo, "ada@unilag.edu.ng").await;
    insert_student(&repo, "bola@unilag.edu.ng").await;

    let awarded = repo.add_points(user.id(), 40).await.unwrap();
    assert_eq!(awarded.points(), 40);
    let credited = repo
        .apply_study_credit(
            user.id(),
            StudyCredit {
                today: fixed_now().date_naive(),
                points: 0,
                daily_bonus: 5,
            },
        )
        .await
        .unwrap();
    assert_eq!(credited.change, StreakChange::Started);
    assert_eq!(credited.bonus_awarded, 5);
    repo.set_role(user.id(), Role::Admin).await.unwrap();

    user.award_points(45);
    user.record_study(fixed_now().date_naive());
    user.set_role(Role::Admin);
    let stored = repo.get_user(user.id()).await.unwrap().unwrap();
    assert_eq!(stored, user);

    assert!(matches!(
        repo.set_active(UserId::new(999), false).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.add_points(UserId::new(999), 1).await,
        Err(StorageError::NotFound)
    ));

    let creds = repo.find_credentials(user.email()).await.unwrap().unwrap();
    assert_eq!(creds.password_hash, "hash");
    repo.update_password(user.id(), "new-hash").await.unwrap();
    let creds = repo.get_credentials(user.id()).await.unwrap().unwrap();
    assert_eq!(creds.password_hash, "new-hash");

    let admins = repo
        .list_users(
            &UserFilter {
                search: None,
                role: Some(Role::Admin),
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(admins.total, 1);

    let searched = repo
        .list_users(
            &UserFilter {
                search: Some("BOLA".into()),
                role: None,
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(searched.items.len(), 1);
    assert_eq!(searched.items[0].email().as_str(), "bola@unilag.edu.ng");

    repo.delete_user(user.id()).await.unwrap();
    assert!(matches!(
        repo.delete_user(user.id()).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn refresh_tokens_revoke_once() {
    let repo = connect("memdb_tokens").await;
    let user = insert_student(&repo, "ada@unilag.edu.ng").await;
    let now = fixed_now();

    for hash in ["a", "b"] {
        repo.insert_token(&NewRefreshToken {
            user_id: user.id(),
            token_hash: hash.into(),
            issued_at: now,
            expires_at: now + Duration::days(7),
        })
        .await
        .unwrap();
    }

    let record = repo.find_by_hash("a").await.unwrap().unwrap();
    assert!(!record.is_revoked());
    assert!(repo.revoke(record.id, now).await.unwrap());
    assert!(!repo.revoke(record.id, now).await.unwrap());
    assert!(repo.find_by_hash("a").await.unwrap().unwrap().is_revoked());

    assert_eq!(repo.revoke_all_for_user(user.id(), now).await.unwrap(), 1);
    assert!(repo.find_by_hash("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn courses_filter_and_track_progress() {
    let repo = connect("memdb_courses").await;
    let user = insert_student(&repo, "ada@unilag.edu.ng").await;
    let csc = insert_course(&repo, "csc 301", user.id()).await;
    insert_course(&repo, "MTH201", user.id()).await;
    assert_eq!(csc.code(), "CSC 301");

    let dup = Course::new(
        CourseId::new(0),
        CourseDraft {
            code: "csc 301".into(),
            title: "Again".into(),
            description: None,
            department: None,
            level: None,
            semester: None,
        },
        user.id(),
        fixed_now(),
    )
    .unwrap();
    assert!(matches!(
        repo.insert_course(&dup).await,
        Err(StorageError::Conflict)
    ));

    let filtered = repo
        .list_courses(
            &CourseFilter {
                search: Some("csc".into()),
                ..CourseFilter::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(filtered.total, 1);

    let mut progress = CourseProgress::enrolled(user.id(), csc.id(), fixed_now());
    repo.upsert_progress(&progress).await.unwrap();
    progress.set_mastery(
        Mastery::new(62.5).unwrap(),
        fixed_now() + Duration::hours(1),
    );
    repo.upsert_progress(&progress).await.unwrap();

    let stored = repo.get_progress(user.id(), csc.id()).await.unwrap().unwrap();
    assert_eq!(stored.mastery.value(), 62.5);
    assert_eq!(stored.enrolled_at, fixed_now());

    let enrolled = repo.list_enrolled(user.id()).await.unwrap();
    assert_eq!(enrolled.len(), 1);
    assert_eq!(enrolled[0].course.id(), csc.id());
}

#[tokio::test]
async fn materials_page_by_kind() {
    let repo = connect("memdb_materials").await;
    let user = insert_student(&repo, "ada@unilag.edu.ng").await;
    let course = insert_course(&repo, "CSC301", user.id()).await;

    for (i, kind) in [MaterialKind::Note, MaterialKind::Slide, MaterialKind::Note]
        .into_iter()
        .enumerate()
    {
        let material = Material::new(
            MaterialId::new(0),
            course.id(),
            MaterialDraft {
                title: format!("Item {i}"),
                kind,
                description: None,
                resource_url: format!("https://files.example.ng/{i}.pdf"),
            },
            user.id(),
            fixed_now() + Duration::minutes(i64::try_from(i).unwrap()),
        )
        .unwrap();
        repo.insert_material(&material).await.unwrap();
    }

    let notes = repo
        .list_materials(course.id(), Some(MaterialKind::Note), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(notes.total, 2);
    assert_eq!(notes.items[0].title(), "Item 2");

    let orphan = Material::new(
        MaterialId::new(0),
        CourseId::new(999),
        MaterialDraft {
            title: "Orphan".into(),
            kind: MaterialKind::Link,
            description: None,
            resource_url: "https://example.ng".into(),
        },
        user.id(),
        fixed_now(),
    )
    .unwrap();
    assert!(matches!(
        repo.insert_material(&orphan).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn quiz_bank_replace_and_attempt_write_back() {
    let repo = connect("memdb_quiz_flow").await;
    let user = insert_student(&repo, "ada@unilag.edu.ng").await;
    let course = insert_course(&repo, "CSC301", user.id()).await;

    let quiz = Quiz::new(
        QuizId::new(0),
        course.id(),
        QuizDraft {
            title: "Week 1".into(),
            description: None,
            passing_score: 50,
            time_limit_minutes: Some(10),
        },
        true,
        user.id(),
        fixed_now(),
    )
    .unwrap();
    let quiz_id = repo.insert_quiz(&quiz, &two_question_bank()).await.unwrap();

    let questions = repo.get_questions(quiz_id).await.unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].position, 1);
    assert_eq!(questions[1].answers.len(), 2);

    let mut submission = HashMap::new();
    let first = &questions[1];
    let right = first.correct_answer_ids().next().unwrap();
    submission.insert(first.id, right);
    let score = score_submission(&questions, &submission, 50).unwrap();
    assert_eq!(score.earned_points, 3);

    let today = fixed_now().date_naive();
    let credit = StudyCredit {
        today,
        points: score.earned_points,
        daily_bonus: 0,
    };
    let attempt = NewQuizAttempt::from_score(user.id(), quiz_id, &score, submission, fixed_now());
    let (attempt_id, update) = repo.record_attempt(&attempt, credit).await.unwrap();
    assert_eq!(update.user.points(), 3);
    assert_eq!(update.change, StreakChange::Started);

    let stored = repo.get_attempt(attempt_id).await.unwrap().unwrap();
    assert_eq!(stored, attempt.assign_id(attempt_id));

    let reloaded = repo.get_user(user.id()).await.unwrap().unwrap();
    assert_eq!(reloaded.points(), 3);
    assert_eq!(reloaded.streak().current(), 1);

    let summary = repo.summary_for_user(user.id()).await.unwrap();
    assert_eq!(summary.attempts, 1);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.best_percentage, Some(60.0));

    let page = repo
        .list_attempts(user.id(), Some(quiz_id), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(repo.list_recent(5).await.unwrap().len(), 1);

    let stats = repo.platform_stats(today).await.unwrap();
    assert_eq!(stats.users, 1);
    assert_eq!(stats.published_quizzes, 1);
    assert_eq!(stats.studied_today, 1);
    assert_eq!(stats.average_percentage, Some(60.0));

    repo.replace_questions(quiz_id, &two_question_bank()[..1])
        .await
        .unwrap();
    let questions = repo.get_questions(quiz_id).await.unwrap();
    assert_eq!(questions.len(), 1);

    assert!(matches!(
        repo.replace_questions(QuizId::new(999), &two_question_bank())
            .await,
        Err(StorageError::NotFound)
    ));

    let drafts = repo
        .list_quizzes(course.id(), true, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(drafts.total, 1);
}
