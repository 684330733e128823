#[cfg(test)]
mod tests {
    use crate::helpers::app::{
        CLASS, OTHER_CLASS, OTHER_TEACHER, STUDENT, STUDENT_2, STUDENT_3, TEACHER, json_request,
        make_test_app, token_for,
    };
    use api::auth::Role;
    use axum::http::StatusCode;
    use chrono::Duration;
    use serde_json::{Value, json};

    fn teacher() -> String {
        token_for(TEACHER, Role::Teacher)
    }

    fn student(id: i64) -> String {
        token_for(id, Role::Student)
    }

    fn scan(token: &str) -> Value {
        json!({
            "token": token,
            "coordinates": { "latitude": -25.7545, "longitude": 28.2314 },
            "proofOfLiveness": true,
        })
    }

    // ---------------------------
    // create_session
    // ---------------------------

    #[tokio::test]
    async fn test_create_session_returns_client_payload() {
        let app = make_test_app().await;

        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/sessions",
                Some(&teacher()),
                Some(json!({ "classId": CLASS, "durationMinutes": 10, "scheduleId": 4 })),
            ))
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["success"], true);
        let data = &json["data"];
        assert!(data["sessionId"].as_str().is_some());
        assert_eq!(data["currentToken"].as_str().unwrap().len(), 32);
        assert_eq!(data["pollIntervalSeconds"], 15);
        assert_eq!(data["classId"], CLASS);
        assert_eq!(data["scheduleId"], 4);
        assert!(data["sessionExpiresAt"].as_str().unwrap().starts_with("2025-09-08T10:10:00"));
    }

    #[tokio::test]
    async fn test_create_session_requires_teacher_owning_class() {
        let app = make_test_app().await;
        let body = || Some(json!({ "classId": CLASS, "durationMinutes": 10 }));

        let (status, _) = app
            .send(json_request("POST", "/api/attendance/sessions", None, body()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(json_request(
                "POST",
                "/api/attendance/sessions",
                Some(&student(STUDENT)),
                body(),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/sessions",
                Some(&teacher()),
                Some(json!({ "classId": OTHER_CLASS })),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error_kind"], "unauthorized");
    }

    #[tokio::test]
    async fn test_create_session_rejects_zero_duration() {
        let app = make_test_app().await;
        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/sessions",
                Some(&teacher()),
                Some(json!({ "classId": CLASS, "durationMinutes": 0 })),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_kind"], "invalid_input");
    }

    // ---------------------------
    // rotate / validate
    // ---------------------------

    #[tokio::test]
    async fn test_rotate_by_other_teacher_is_not_found() {
        let app = make_test_app().await;
        let (session_id, _) = app.open_session().await;

        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/sessions/rotate",
                Some(&token_for(OTHER_TEACHER, Role::Teacher)),
                Some(json!({ "sessionId": session_id })),
            ))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error_kind"], "not_found");
    }

    #[tokio::test]
    async fn test_rotated_out_token_is_reported_as_superseded() {
        let app = make_test_app().await;
        let (session_id, first) = app.open_session().await;

        app.clock.advance(Duration::seconds(15));
        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/sessions/rotate",
                Some(&teacher()),
                Some(json!({ "sessionId": session_id })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        let second = json["data"]["currentToken"].as_str().unwrap().to_string();
        assert_ne!(second, first);

        let validate = |token: &str| {
            json_request(
                "POST",
                "/api/attendance/validate",
                Some(&student(STUDENT)),
                Some(json!({ "token": token })),
            )
        };

        let (status, json) = app.send(validate(&first)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["classId"], CLASS);
        assert_eq!(json["data"]["teacherId"], TEACHER);

        app.clock.advance(Duration::seconds(10));
        let (status, json) = app.send(validate(&first)).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(json["error_kind"], "token_superseded");

        let (status, _) = app.send(validate(&second)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = app.send(validate("0000")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_kind"], "invalid_or_expired_session");
    }

    // ---------------------------
    // submit
    // ---------------------------

    #[tokio::test]
    async fn test_submit_records_once() {
        let app = make_test_app().await;
        let (session_id, token) = app.open_session().await;

        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/submit",
                Some(&student(STUDENT)),
                Some(scan(&token)),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["data"]["studentId"], STUDENT);
        assert_eq!(json["data"]["sessionId"], session_id);
        assert_eq!(json["data"]["verificationMethod"], "qr_face");
        assert_eq!(json["data"]["manualEntry"], false);
        assert_eq!(json["data"]["latitude"], -25.7545);

        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/submit",
                Some(&student(STUDENT)),
                Some(scan(&token)),
            ))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error_kind"], "already_recorded");
    }

    #[tokio::test]
    async fn test_submit_rejects_other_students_and_missing_liveness() {
        let app = make_test_app().await;
        let (_, token) = app.open_session().await;

        let mut impersonation = scan(&token);
        impersonation["studentId"] = json!(STUDENT_2);
        let (status, _) = app
            .send(json_request(
                "POST",
                "/api/attendance/submit",
                Some(&student(STUDENT)),
                Some(impersonation),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let mut unverified = scan(&token);
        unverified["proofOfLiveness"] = json!(false);
        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/submit",
                Some(&student(STUDENT)),
                Some(unverified),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error_kind"], "liveness_not_verified");

        let (status, _) = app
            .send(json_request(
                "POST",
                "/api/attendance/submit",
                Some(&teacher()),
                Some(scan(&token)),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_submit_after_grace_is_expired() {
        let app = make_test_app().await;
        let (_, token) = app.open_session().await;

        app.clock.advance(Duration::seconds(21));
        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/submit",
                Some(&student(STUDENT)),
                Some(scan(&token)),
            ))
            .await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(json["error_kind"], "expired");
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_coordinates() {
        let app = make_test_app().await;
        let (_, token) = app.open_session().await;

        let mut body = scan(&token);
        body["coordinates"]["latitude"] = json!(123.0);
        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/submit",
                Some(&student(STUDENT)),
                Some(body),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_kind"], "invalid_input");
    }

    // ---------------------------
    // manual
    // ---------------------------

    #[tokio::test]
    async fn test_manual_batch_with_one_duplicate_is_partial_success() {
        let app = make_test_app().await;
        let manual = |ids: Vec<i64>| {
            json_request(
                "POST",
                "/api/attendance/manual",
                Some(&teacher()),
                Some(json!({ "classId": CLASS, "studentIds": ids })),
            )
        };

        let (status, _) = app.send(manual(vec![STUDENT_2])).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = app.send(manual(vec![STUDENT, STUDENT_2, STUDENT_3])).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["succeeded"].as_array().unwrap().len(), 2);
        let failed = json["data"]["failed"].as_array().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0]["studentId"], STUDENT_2);
        assert_eq!(failed[0]["errorKind"], "already_recorded");
        assert_eq!(
            json["data"]["succeeded"][0]["notes"],
            "Manual attendance entry by teacher"
        );

        let (status, json) = app.send(manual(vec![STUDENT, STUDENT_3])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["failed"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_manual_entry_after_qr_scan_is_already_recorded() {
        let app = make_test_app().await;
        let (_, token) = app.open_session().await;

        let (status, _) = app
            .send(json_request(
                "POST",
                "/api/attendance/submit",
                Some(&student(STUDENT)),
                Some(scan(&token)),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        app.clock.advance(Duration::hours(1));
        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/manual",
                Some(&teacher()),
                Some(json!({ "classId": CLASS, "studentIds": [STUDENT] })),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let failed = json["data"]["failed"].as_array().unwrap();
        assert_eq!(failed[0]["studentId"], STUDENT);
        assert_eq!(failed[0]["errorKind"], "already_recorded");
    }

    #[tokio::test]
    async fn test_manual_batch_rejects_empty_list() {
        let app = make_test_app().await;
        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/manual",
                Some(&teacher()),
                Some(json!({ "classId": CLASS, "studentIds": [] })),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_kind"], "invalid_input");
    }

    // ---------------------------
    // terminate
    // ---------------------------

    #[tokio::test]
    async fn test_terminate_is_idempotent() {
        let app = make_test_app().await;
        let (session_id, token) = app.open_session().await;
        let terminate = || {
            json_request(
                "POST",
                "/api/attendance/sessions/terminate",
                Some(&teacher()),
                Some(json!({ "sessionId": session_id })),
            )
        };

        let (status, json) = app.send(terminate()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["terminatedCount"], 1);

        let (status, json) = app.send(terminate()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["terminatedCount"], 0);

        let (status, _) = app
            .send(json_request(
                "POST",
                "/api/attendance/submit",
                Some(&student(STUDENT)),
                Some(scan(&token)),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_terminate_all_counts_callers_sessions() {
        let app = make_test_app().await;
        app.open_session().await;

        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/sessions/terminate-all",
                Some(&teacher()),
                None,
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["terminatedCount"], 1);
    }
}
