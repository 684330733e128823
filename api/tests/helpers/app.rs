use api::{auth::Role, auth::generate_jwt, routes::routes, state::AppState};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, TimeZone, Utc};
use db::models::class_member::{Model as ClassMember, Role as MemberRole};
use db::test_utils::setup_test_db;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use util::clock::ManualClock;
use util::config::{AppConfig, SessionPolicy};
use util::ids::RandomIds;
use util::policy::UniquenessPolicy;

pub const TEST_JWT_SECRET: &str = "attendance-test-secret";

pub const TEACHER: i64 = 1;
pub const OTHER_TEACHER: i64 = 2;
pub const CLASS: i64 = 100;
pub const OTHER_CLASS: i64 = 200;
pub const STUDENT: i64 = 10;
pub const STUDENT_2: i64 = 11;
pub const STUDENT_3: i64 = 12;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

/// Every test in this binary shares the global config; they all agree on it.
pub fn init_test_config() {
    AppConfig::set_jwt_secret(TEST_JWT_SECRET);
    AppConfig::set_jwt_duration_minutes(60);
}

/// A fresh in-memory database with a small roster: `TEACHER` owns `CLASS`,
/// `OTHER_TEACHER` owns `OTHER_CLASS`, and three students are enrolled in `CLASS`.
pub async fn make_test_app() -> TestApp {
    init_test_config();

    let db = setup_test_db().await;
    ClassMember::assign(&db, TEACHER, CLASS, MemberRole::Teacher).await.unwrap();
    ClassMember::assign(&db, OTHER_TEACHER, OTHER_CLASS, MemberRole::Teacher)
        .await
        .unwrap();
    for student in [STUDENT, STUDENT_2, STUDENT_3] {
        ClassMember::assign(&db, student, CLASS, MemberRole::Student).await.unwrap();
    }

    let clock = Arc::new(ManualClock::new(t0()));
    let state = AppState::new(
        db,
        clock.clone(),
        Arc::new(RandomIds),
        SessionPolicy::default(),
        UniquenessPolicy::PerSession,
    );
    let router = Router::new().nest("/api", routes(state.clone()));

    TestApp {
        router,
        state,
        clock,
    }
}

pub fn token_for(user_id: i64, role: Role) -> String {
    generate_jwt(user_id, role).unwrap().0
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    /// Opens a session for `CLASS` as `TEACHER`; returns `(sessionId, currentToken)`.
    pub async fn open_session(&self) -> (String, String) {
        let teacher = token_for(TEACHER, Role::Teacher);
        let (status, json) = self
            .send(json_request(
                "POST",
                "/api/attendance/sessions",
                Some(&teacher),
                Some(serde_json::json!({ "classId": CLASS, "durationMinutes": 10 })),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        (
            json["data"]["sessionId"].as_str().unwrap().to_string(),
            json["data"]["currentToken"].as_str().unwrap().to_string(),
        )
    }
}
