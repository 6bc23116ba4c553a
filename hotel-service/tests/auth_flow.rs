mod support;

use axum::http::{Method, StatusCode};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use common_auth::{AccountKind, EmployeeRole, TokenSubject};
use common_store::bson::doc;
use common_store::DocumentStore;
use hotel_service::accounts::EMPLOYEES;
use serde_json::{json, Value};
use support::{TestApp, PIN};

fn jwt_claims(token: &str) -> Value {
    let payload = token.split('.').nth(1).unwrap();
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
}

fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().to_owned()
}

#[tokio::test]
async fn login_sets_three_cookies_and_returns_tokens() {
    let app = TestApp::new();
    let id = app.seed_employee("0911000001", &[EmployeeRole::Issue]).await;

    let resp = app
        .send(
            Method::POST,
            "/api/auth/employee/login",
            None,
            Some(json!({ "phone_number": "0911000001", "password": PIN })),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["success"], true);
    assert_eq!(resp.body["employee"]["id"], id.to_hex());
    assert!(resp.body["employee"].get("password").is_none());
    assert!(resp.body["access_token"].as_str().is_some());
    assert!(resp.body["refresh_token"].as_str().is_some());

    let claims = jwt_claims(resp.body["access_token"].as_str().unwrap());
    assert_eq!(claims["sub"], id.to_hex());
    assert_eq!(claims["type"], "access");
    assert_eq!(claims["acc"], "employee");
    assert_eq!(
        claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
        7200
    );

    let cookies = resp.set_cookies();
    assert_eq!(cookies.len(), 3);
    let access = resp.cookie("access_token").unwrap();
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("Max-Age=7200"));
    assert!(resp.cookie("refresh_token").unwrap().contains("Max-Age=36000"));
    let logged_in = resp.cookie("logged_in").unwrap();
    assert!(logged_in.starts_with("logged_in=True"));
    assert!(!logged_in.contains("HttpOnly"));

    assert_eq!(app.metrics.login_attempts("employee", "success"), 1);
}

#[tokio::test]
async fn wrong_password_is_not_found_without_cookies() {
    let app = TestApp::new();
    app.seed_employee("0911000002", &[]).await;

    let resp = app
        .send(
            Method::POST,
            "/api/auth/employee/login",
            None,
            Some(json!({ "phone_number": "0911000002", "password": "99999" })),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_type(), "not found");
    assert_eq!(
        resp.body["errors"][0]["message"],
        "invalid/incorrect phone number or password"
    );
    assert!(resp.set_cookies().is_empty());
    assert!(resp.body.get("access_token").is_none());
    assert_eq!(app.metrics.login_attempts("employee", "invalid_credentials"), 1);
}

#[tokio::test]
async fn unknown_phone_number_is_not_found() {
    let app = TestApp::new();
    let resp = app
        .send(
            Method::POST,
            "/api/auth/customer/login",
            None,
            Some(json!({ "phone_number": "0911999999", "password": PIN })),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["errors"][0]["message"], "no customer with this phone number.");
    assert_eq!(resp.error_location(), &json!(["request body", "phone_number"]));
}

#[tokio::test]
async fn deactivated_account_cannot_log_in() {
    let app = TestApp::new();
    let id = app.seed_employee("0911000003", &[]).await;
    app.store
        .update_one(EMPLOYEES, doc! { "_id": id }, doc! { "$set": { "is_active": false } })
        .await
        .unwrap();

    let resp = app
        .send(
            Method::POST,
            "/api/auth/employee/login",
            None,
            Some(json!({ "phone_number": "0911000003", "password": PIN })),
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.set_cookies().is_empty());
}

#[tokio::test]
async fn malformed_login_body_is_unprocessable() {
    let app = TestApp::new();
    let resp = app
        .send(
            Method::POST,
            "/api/auth/employee/login",
            None,
            Some(json!({ "phone_number": "0911000004" })),
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.error_type(), "unprocessable value");
    assert_eq!(resp.error_location(), &json!(["request body"]));
}

#[tokio::test]
async fn refresh_issues_new_access_cookie() {
    let app = TestApp::new();
    app.seed_customer("0911000005").await;

    let login = app
        .send(
            Method::POST,
            "/api/auth/customer/login",
            None,
            Some(json!({ "phone_number": "0911000005", "password": PIN })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let refresh_cookie = cookie_pair(&login.cookie("refresh_token").unwrap());

    let resp = app
        .get("/api/auth/customer/refresh_token", &refresh_cookie)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body["access_token"].as_str().is_some());
    assert!(resp.cookie("access_token").is_some());
    assert!(resp.cookie("logged_in").is_some());
    assert!(resp.cookie("refresh_token").is_none());
}

#[tokio::test]
async fn access_token_cannot_refresh() {
    let app = TestApp::new();
    let id = app.seed_customer("0911000006").await;
    let access = app.access_cookie(id, AccountKind::Customer);
    let as_refresh = access.replacen("access_token", "refresh_token", 1);

    let resp = app
        .get("/api/auth/customer/refresh_token", &as_refresh)
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_location(), &json!(["cookies", "refresh_token"]));
}

#[tokio::test]
async fn employee_refresh_token_is_rejected_by_customer_route() {
    let app = TestApp::new();
    let id = app.seed_employee("0911000007", &[]).await;
    let subject = TokenSubject::new(id.to_hex(), AccountKind::Employee);
    let refresh = app
        .signer
        .issue_refresh(&subject, Duration::minutes(5))
        .unwrap();

    let resp = app
        .get(
            "/api/auth/customer/refresh_token",
            &format!("refresh_token={}", refresh.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_expires_every_session_cookie() {
    let app = TestApp::new();
    let (_, cookie) = app.employee_with("0911000008", &[]).await;

    let resp = app.get("/api/auth/employee/logout", &cookie).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, json!({ "success": true }));
    assert!(resp.cookie("access_token").unwrap().starts_with("access_token=; Max-Age=0"));
    assert!(resp.cookie("refresh_token").unwrap().starts_with("refresh_token=; Max-Age=0"));
    assert!(resp.cookie("logged_in").unwrap().contains("Max-Age=-1"));
}

#[tokio::test]
async fn register_requires_manage_role_and_unique_phone() {
    let app = TestApp::new();
    let (_, viewer) = app
        .employee_with("0911000009", &[EmployeeRole::ViewEmployees])
        .await;
    let (_, manager) = app
        .employee_with("0911000010", &[EmployeeRole::ManageEmployees])
        .await;
    let new_employee = json!({
        "first_name": "Tigist",
        "phone_number": "+251911000011",
        "roles": ["issue", "issue", "view issue"],
        "password": "54321",
    });

    let denied = app
        .post("/api/auth/employee/register", &viewer, new_employee.clone())
        .await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let created = app
        .post("/api/auth/employee/register", &manager, new_employee.clone())
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["employee"]["first_name"], "tigist");
    assert_eq!(created.body["employee"]["roles"], json!(["issue", "view issue"]));

    let duplicate = app
        .post("/api/auth/employee/register", &manager, new_employee)
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.error_type(), "duplicated entry");
}

#[tokio::test]
async fn register_validates_pin_code() {
    let app = TestApp::new();
    let (_, manager) = app
        .employee_with("0911000012", &[EmployeeRole::ManageCustomers])
        .await;

    let resp = app
        .post(
            "/api/auth/customer/register",
            &manager,
            json!({
                "first_name": "john",
                "nationality": "kenyan",
                "passport_number": "K998877",
                "phone_number": "0911000013",
                "password": "12ab",
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.error_location(), &json!(["request body", "password"]));
}
