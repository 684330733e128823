#[cfg(test)]
mod tests {
    use crate::helpers::app::{
        CLASS, OTHER_TEACHER, STUDENT, TEACHER, TestApp, json_request, make_test_app, token_for,
    };
    use api::auth::Role;
    use axum::http::StatusCode;
    use serde_json::json;

    async fn manual_record(app: &TestApp) -> i64 {
        let (status, json) = app
            .send(json_request(
                "POST",
                "/api/attendance/manual",
                Some(&token_for(TEACHER, Role::Teacher)),
                Some(json!({ "classId": CLASS, "studentIds": [STUDENT] })),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["data"]["succeeded"][0]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_update_attendance_changes_notes_and_schedule() {
        let app = make_test_app().await;
        let record_id = manual_record(&app).await;

        let (status, json) = app
            .send(json_request(
                "PUT",
                &format!("/api/attendance/records/{record_id}"),
                Some(&token_for(TEACHER, Role::Teacher)),
                Some(json!({ "notes": "Arrived after roll call", "scheduleId": 9 })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["data"]["notes"], "Arrived after roll call");
        assert_eq!(json["data"]["scheduleId"], 9);
        assert_eq!(json["data"]["studentId"], STUDENT);
        assert_eq!(json["data"]["manualEntry"], true);
    }

    #[tokio::test]
    async fn test_update_attendance_hides_other_teachers_records() {
        let app = make_test_app().await;
        let record_id = manual_record(&app).await;

        let (status, json) = app
            .send(json_request(
                "PUT",
                &format!("/api/attendance/records/{record_id}"),
                Some(&token_for(OTHER_TEACHER, Role::Teacher)),
                Some(json!({ "notes": "nope" })),
            ))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error_kind"], "not_found");

        let (status, _) = app
            .send(json_request(
                "PUT",
                "/api/attendance/records/999999",
                Some(&token_for(TEACHER, Role::Teacher)),
                Some(json!({ "notes": "missing" })),
            ))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_attendance_requires_a_field() {
        let app = make_test_app().await;
        let record_id = manual_record(&app).await;

        let (status, json) = app
            .send(json_request(
                "PUT",
                &format!("/api/attendance/records/{record_id}"),
                Some(&token_for(TEACHER, Role::Teacher)),
                Some(json!({})),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_kind"], "invalid_input");
    }
}
