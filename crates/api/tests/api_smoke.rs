use api::{AppState, build_router, cors_layer};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use services::{AppServices, Clock, ServicesConfig, TokenConfig};
use storage::repository::Storage;
use study_core::time::fixed_now;
use tower::ServiceExt;

async fn app(name: &str) -> (Router, AppServices) {
    let storage = Storage::sqlite(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect sqlite");
    let config = ServicesConfig {
        tokens: TokenConfig::new("api-test-secret-api-test-secret-0123"),
        bcrypt_cost: 4,
        tutor: None,
    };
    let services =
        AppServices::from_storage(&storage, Clock::fixed(fixed_now()), config).expect("services");
    let router = build_router(AppState::new(services.clone()), cors_layer(None));
    (router, services)
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(router: &Router, email: &str) -> String {
    let (status, body) = send(
        router,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "s3cret-pass",
            "fullName": "Amaka Eze",
            "university": "UNN",
            "level": 200
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["tokenType"], "Bearer");
    body["accessToken"].as_str().unwrap().to_string()
}

async fn admin_token(router: &Router, services: &AppServices) -> String {
    services
        .auth()
        .seed_admin("admin@unn.edu.ng", "admin-pass-123", "Admin")
        .await
        .unwrap();
    let (status, body) = send(
        router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "admin@unn.edu.ng", "password": "admin-pass-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["accessToken"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let (router, _) = app("memdb_api_health").await;
    let (status, body) = send(&router, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["tutor"], false);
}

#[tokio::test]
async fn register_then_read_profile() {
    let (router, _) = app("memdb_api_register").await;
    let token = register(&router, "amaka@unn.edu.ng").await;

    let (status, body) = send(&router, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "amaka@unn.edu.ng");
    assert_eq!(body["role"], "student");
    assert_eq!(body["level"], 200);

    let (status, body) = send(&router, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &router,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "email": "AMAKA@unn.edu.ng",
            "password": "s3cret-pass",
            "fullName": "Someone Else"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn students_cannot_use_admin_routes() {
    let (router, _) = app("memdb_api_forbidden").await;
    let token = register(&router, "amaka@unn.edu.ng").await;

    let (status, _) = send(
        &router,
        "POST",
        "/api/courses",
        Some(&token),
        Some(json!({ "code": "MTH101", "title": "Calculus" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&router, "GET", "/api/admin/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let (router, _) = app("memdb_api_malformed").await;
    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "missing-password@unn.edu.ng" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let token = register(&router, "amaka@unn.edu.ng").await;
    let (status, _) = send(&router, "GET", "/api/courses/abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quiz_round_trip_through_http() {
    let (router, services) = app("memdb_api_quiz").await;
    let admin = admin_token(&router, &services).await;
    let student = register(&router, "amaka@unn.edu.ng").await;

    let (status, course) = send(
        &router,
        "POST",
        "/api/courses",
        Some(&admin),
        Some(json!({
            "code": "mth101",
            "title": "Calculus I",
            "department": "Mathematics",
            "level": 100,
            "semester": "first"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{course}");
    assert_eq!(course["code"], "MTH101");
    let course_id = course["id"].as_u64().unwrap();

    let (status, quiz) = send(
        &router,
        "POST",
        &format!("/api/courses/{course_id}/quizzes"),
        Some(&admin),
        Some(json!({
            "title": "Limits",
            "passingScore": 50,
            "published": true,
            "questions": [
                {
                    "text": "lim x->0 of sin(x)/x",
                    "points": 3,
                    "answers": [
                        { "text": "1", "isCorrect": true },
                        { "text": "0" }
                    ]
                }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{quiz}");
    let quiz_id = quiz["quiz"]["id"].as_u64().unwrap();
    let question = &quiz["questions"][0];
    let question_id = question["id"].as_u64().unwrap();
    let correct = question["answers"][0]["id"].as_u64().unwrap();
    assert_eq!(question["answers"][0]["isCorrect"], true);

    // Students never see the key.
    let (status, paper) = send(
        &router,
        "GET",
        &format!("/api/quizzes/{quiz_id}"),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(paper["questions"][0].get("answers").is_none());
    assert_eq!(paper["questions"][0]["options"].as_array().unwrap().len(), 2);

    let (status, outcome) = send(
        &router,
        "POST",
        &format!("/api/quizzes/{quiz_id}/submit"),
        Some(&student),
        Some(json!({ "answers": { question_id.to_string(): correct } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["earnedPoints"], 3);
    assert_eq!(outcome["percentage"], 100.0);
    assert_eq!(outcome["passed"], true);
    assert_eq!(outcome["correctCount"], 1);
    assert_eq!(outcome["totalUserPoints"], 3);
    assert_eq!(outcome["currentStreak"], 1);
    assert_eq!(outcome["streakChange"], "started");
    let attempt_id = outcome["attemptId"].as_u64().unwrap();

    let (status, attempts) =
        send(&router, "GET", "/api/me/attempts", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attempts["total"], 1);
    assert_eq!(attempts["items"][0]["id"], attempt_id);

    let (status, dashboard) =
        send(&router, "GET", "/api/me/dashboard", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["user"]["points"], 3);
    assert_eq!(dashboard["attempts"]["passed"], 1);

    let (status, stats) = send(&router, "GET", "/api/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["attempts"], 1);
    assert_eq!(stats["passRate"], 100.0);

    let (status, _) = send(
        &router,
        "POST",
        &format!("/api/quizzes/{quiz_id}/publish"),
        Some(&admin),
        Some(json!({ "published": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &router,
        "GET",
        &format!("/api/quizzes/{quiz_id}"),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tutor_reports_unavailable_without_config() {
    let (router, _) = app("memdb_api_tutor").await;
    let token = register(&router, "amaka@unn.edu.ng").await;
    let (status, body) = send(
        &router,
        "POST",
        "/api/tutor/chat",
        Some(&token),
        Some(json!({ "message": "What is a derivative?" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn editing_a_quiz_keeps_its_visibility() {
    let (router, services) = app("memdb_api_quiz_edit").await;
    let admin = admin_token(&router, &services).await;
    let student = register(&router, "amaka@unn.edu.ng").await;

    let (status, course) = send(
        &router,
        "POST",
        "/api/courses",
        Some(&admin),
        Some(json!({ "code": "PHY101", "title": "Mechanics" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{course}");
    let course_id = course["id"].as_u64().unwrap();

    let (status, quiz) = send(
        &router,
        "POST",
        &format!("/api/courses/{course_id}/quizzes"),
        Some(&admin),
        Some(json!({
            "title": "Kinematics",
            "published": true,
            "questions": [
                {
                    "text": "Unit of velocity",
                    "answers": [
                        { "text": "m/s", "isCorrect": true },
                        { "text": "kg" }
                    ]
                }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{quiz}");
    let uri = format!("/api/quizzes/{}", quiz["quiz"]["id"].as_u64().unwrap());

    let (status, edited) = send(
        &router,
        "PUT",
        &uri,
        Some(&admin),
        Some(json!({ "title": "Kinematics, revised" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{edited}");
    assert_eq!(edited["quiz"]["isPublished"], true);

    let (status, paper) = send(&router, "GET", &uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paper["quiz"]["title"], "Kinematics, revised");
    assert_eq!(paper["questions"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &router,
        "PUT",
        &uri,
        Some(&admin),
        Some(json!({ "title": "Kinematics, revised", "published": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&router, "GET", &uri, Some(&student), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
