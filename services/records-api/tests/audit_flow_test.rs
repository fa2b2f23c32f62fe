//! 审计集成测试：成功变更恰好一条记录，失败零条，存储故障不影响响应

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{CLIENT_IP, PASSWORD, TestApp, USER_AGENT};
use medrec_auth_core::Role;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_create_emits_one_record_with_payload() {
    let app = TestApp::new();
    let (clerk, token) = app.login_as("records.clerk", Role::RecordsStaff).await;

    let (status, body) = app
        .post(
            "/api/patients",
            Some(&token),
            json!({
                "mrn": "MRN-0001",
                "firstName": "Grace",
                "lastName": "Hopper",
                "dateOfBirth": "1956-12-09"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);

    let records = app.audit.records();
    assert_eq!(records.len(), 1);
    let entry = &records[0].entry;
    assert_eq!(entry.action, "create");
    assert_eq!(entry.entity_type, "patient");
    assert_eq!(entry.entity_id.as_deref(), body["data"]["id"].as_str());
    assert_eq!(entry.after_value.as_ref(), Some(&body["data"]));
    assert!(entry.before_value.is_none());
    assert_eq!(entry.actor_id, Some(clerk.id));
    assert_eq!(entry.ip_address.as_deref(), Some(CLIENT_IP));
    assert_eq!(entry.user_agent.as_deref(), Some(USER_AGENT));
    assert!(entry.success);
}

#[tokio::test]
async fn test_forged_client_headers_do_not_break_audit() {
    let app = TestApp::new();
    let (_, token) = app.login_as("records.clerk", Role::RecordsStaff).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/patients")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "z".repeat(70))
        .header(header::USER_AGENT, "u".repeat(2000))
        .body(Body::from(
            json!({
                "mrn": "MRN-0099",
                "firstName": "Mallory",
                "lastName": "Spoof",
                "dateOfBirth": "1990-01-01"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let records = app.audit.with_action("create");
    assert_eq!(records.len(), 1);
    let entry = &records[0].entry;
    assert!(entry.ip_address.is_none());
    assert_eq!(entry.user_agent.as_ref().map(String::len), Some(512));
}

#[tokio::test]
async fn test_update_records_before_and_after() {
    let app = TestApp::new();
    let (_, token) = app.login_as("dr.who", Role::Clinician).await;
    let patient_id = app.create_patient(&token, "MRN-0002").await;
    app.audit.clear();

    let (status, _) = app
        .put(
            &format!("/api/patients/{}", patient_id),
            Some(&token),
            json!({"lastName": "Byron"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let records = app.audit.with_action("update");
    assert_eq!(records.len(), 1);
    let entry = &records[0].entry;
    assert_eq!(entry.entity_id.as_deref(), Some(patient_id.as_str()));
    assert_eq!(entry.before_value.as_ref().unwrap()["lastName"], "Lovelace");
    assert_eq!(entry.after_value.as_ref().unwrap()["lastName"], "Byron");
}

#[tokio::test]
async fn test_failed_mutation_emits_nothing() {
    let app = TestApp::new();
    let (_, token) = app.login_as("records.clerk", Role::RecordsStaff).await;

    // 校验失败
    let (status, _) = app
        .post(
            "/api/patients",
            Some(&token),
            json!({
                "mrn": "MRN-0003",
                "firstName": "  ",
                "lastName": "Nobody",
                "dateOfBirth": "1990-01-01"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 资源不存在
    let (status, _) = app
        .put(
            &format!("/api/patients/{}", uuid::Uuid::now_v7()),
            Some(&token),
            json!({"lastName": "Ghost"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // 授权拒绝
    let (status, _) = app
        .post(
            "/api/clinical-notes",
            Some(&token),
            json!({"patientId": uuid::Uuid::now_v7(), "noteType": "progress", "content": "x"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(app.audit.records().is_empty());
}

#[tokio::test]
async fn test_audit_store_failure_keeps_response() {
    let app = TestApp::new();
    let (_, token) = app.login_as("records.clerk", Role::RecordsStaff).await;
    app.audit.fail_writes(true);

    let (status, body) = app
        .post(
            "/api/patients",
            Some(&token),
            json!({
                "mrn": "MRN-0004",
                "firstName": "Katherine",
                "lastName": "Johnson",
                "dateOfBirth": "1968-08-26"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["mrn"], "MRN-0004");
    assert!(app.audit.records().is_empty());
}

#[tokio::test]
async fn test_wrong_password_login_records_single_failure() {
    let app = TestApp::new();
    let user = app.seed_user("dr.strange", Role::Clinician).await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"username": "dr.strange", "password": "definitely-wrong"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_credentials");

    let records = app.audit.records();
    assert_eq!(records.len(), 1);
    let entry = &records[0].entry;
    assert_eq!(entry.action, "login");
    assert!(!entry.success);
    assert!(entry.actor_id.is_none());
    assert_eq!(entry.entity_id, Some(user.id.to_string()));
    assert_eq!(entry.after_value.as_ref().unwrap()["reason"], "invalid_credentials");
    assert!(app.audit.with_action("logout").is_empty());
}

#[tokio::test]
async fn test_unknown_user_login_is_audited() {
    let app = TestApp::new();

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({"username": "nobody", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let records = app.audit.with_action("login");
    assert_eq!(records.len(), 1);
    assert!(records[0].entry.entity_id.is_none());
    assert_eq!(records[0].entry.after_value.as_ref().unwrap()["username"], "nobody");
}

#[tokio::test]
async fn test_login_and_logout_round() {
    let app = TestApp::new();
    let user = app.seed_user("dr.quinn", Role::Clinician).await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"username": "dr.quinn", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tokenType"], "Bearer");
    assert_eq!(body["data"]["user"]["role"], "clinician");
    let token = body["data"]["accessToken"].as_str().unwrap().to_string();

    let (status, me) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["id"], user.id.to_string());

    let (status, body) = app.post("/api/auth/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["loggedOut"], true);

    let login = app.audit.with_action("login");
    let logout = app.audit.with_action("logout");
    assert_eq!(login.len(), 1);
    assert_eq!(logout.len(), 1);
    assert!(login[0].entry.success);
    assert_eq!(login[0].entry.actor_id, Some(user.id.clone()));
    assert!(logout[0].entry.success);
    assert_eq!(logout[0].entry.actor_id, Some(user.id));
}

#[tokio::test]
async fn test_logout_without_token_is_audited_as_failure() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/auth/logout", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "missing_credentials");

    let records = app.audit.with_action("logout");
    assert_eq!(records.len(), 1);
    assert!(!records[0].entry.success);
    assert_eq!(
        records[0].entry.after_value.as_ref().unwrap()["reason"],
        "missing_credentials"
    );
}

#[tokio::test]
async fn test_inactive_login_is_rejected() {
    let app = TestApp::new();
    let mut user = app.seed_user("dr.retired", Role::Clinician).await;
    user.deactivate().unwrap();
    app.save_user(&user).await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"username": "dr.retired", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "account_inactive");
    assert_eq!(
        app.audit.with_action("login")[0].entry.after_value.as_ref().unwrap()["reason"],
        "account_inactive"
    );
}

#[tokio::test]
async fn test_snapshots_never_contain_credentials() {
    let app = TestApp::new();
    let (_, admin) = app.login_as("admin", Role::Admin).await;

    let (status, created) = app
        .post(
            "/api/users",
            Some(&admin),
            json!({
                "username": "lab.new",
                "password": "a-fresh-password",
                "fullName": "New Lab Tech",
                "role": "lab_tech"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .put(
            &format!("/api/users/{}", created["data"]["id"].as_str().unwrap()),
            Some(&admin),
            json!({"password": "another-password"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({"username": "lab.new", "password": "a-fresh-password"}),
        )
        .await;

    let dump = serde_json::to_string(&app.audit.records()).unwrap();
    assert!(!dump.contains("a-fresh-password"));
    assert!(!dump.contains("another-password"));
    assert!(!dump.contains("$argon2"));
}

#[tokio::test]
async fn test_audit_log_query() {
    let app = TestApp::new();
    let (_, manager) = app.login_as("data.manager", Role::DataManager).await;
    let (_, viewer) = app.login_as("viewer", Role::Viewer).await;

    for _ in 0..3 {
        app.post(
            "/api/auth/login",
            None,
            json!({"username": "viewer", "password": "wrong-password"}),
        )
        .await;
    }

    let (status, body) = app
        .get("/api/audit-logs?action=login&pageSize=2", Some(&manager))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["items"][0]["success"], false);

    let (status, _) = app.get("/api/audit-logs", Some(&viewer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
