use axum::body::Body;
use axum::http::{ header, Method, Request, StatusCode };
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{ json, Value };
use tower::ServiceExt;

use remittance_api::api::{ self, AppState };
use remittance_api::db::Repositories;
use remittance_api::Config;

const USER_PHONE: &str = "+573001234567";
const ADMIN_PHONE: &str = "+584141234567";

async fn app() -> Router {
    let mut config = Config::for_memory("integration-test-secret-0123456789");
    config.admin_phones = vec![ADMIN_PHONE.to_string()];

    let state = AppState::new(config, Repositories::in_memory());
    state.seed_defaults().await.unwrap();
    api::router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) =>
            builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

async fn register(app: &Router, phone: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "phone": phone, "password": password }))
    ).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let code = body["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 4);

    let (status, _) = send(
        app,
        Method::POST,
        "/api/auth/register/verify",
        None,
        Some(json!({ "phone": phone, "code": code }))
    ).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register/complete",
        None,
        Some(
            json!({
                "phone": phone,
                "code": code,
                "first_name": "Ana",
                "last_name": "Pérez"
            })
        )
    ).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_transfer_lifecycle_over_http() {
    let app = app().await;
    let user = register(&app, USER_PHONE, "secreto1").await;
    let admin = register(&app, ADMIN_PHONE, "admin-secreto").await;

    let (status, quote) = send(
        &app,
        Method::GET,
        "/api/quote?origin=VE&destination=CO&amount=1000000",
        None,
        None
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["receivedAmount"], 80);
    assert_eq!(quote["currency"], "COP");

    let (status, tx) = send(
        &app,
        Method::POST,
        "/api/transactions",
        Some(&user),
        Some(json!({ "origin_country": "VE", "destination_country": "CO", "amount": 1000000 }))
    ).await;
    assert_eq!(status, StatusCode::CREATED, "{}", tx);
    assert_eq!(tx["status"], "Creando");
    assert_eq!(tx["received_amount"], 80);
    let tx_id = tx["id"].as_str().unwrap().to_string();

    let (_, origin_methods) = send(
        &app,
        Method::GET,
        "/api/payment-methods/origin?country=VE",
        None,
        None
    ).await;
    let origin_id = origin_methods[0]["id"].as_str().unwrap().to_string();

    let (status, tx) = send(
        &app,
        Method::PUT,
        &format!("/api/transactions/{}/origin-method", tx_id),
        Some(&user),
        Some(json!({ "method_id": origin_id }))
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["status"], "Método seleccionado");

    let (status, method) = send(
        &app,
        Method::POST,
        "/api/payment-methods",
        Some(&user),
        Some(
            json!({
                "country_code": "CO",
                "method": "Bancolombia",
                "holder_name": "Ana Pérez",
                "document_type": "CC",
                "document_number": "1020304050",
                "account_number": "00123456789",
                "account_type": "Ahorros"
            })
        )
    ).await;
    assert_eq!(status, StatusCode::CREATED, "{}", method);
    assert_eq!(method["data"]["kind"], "bank_transfer");
    assert_eq!(method["data"]["bank"], "Bancolombia");
    let method_id = method["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/transactions/{}/destination-method", tx_id),
        Some(&user),
        Some(json!({ "method_id": method_id }))
    ).await;
    assert_eq!(status, StatusCode::OK);

    let (status, tx) = send(
        &app,
        Method::POST,
        &format!("/api/transactions/{}/confirm", tx_id),
        Some(&user),
        None
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["status"], "en pago");

    let (status, tx) = send(
        &app,
        Method::POST,
        &format!("/api/transactions/{}/payment-reference", tx_id),
        Some(&user),
        Some(json!({ "reference": "REF123" }))
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["status"], "Procesando");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/transactions/{}/status", tx_id),
        Some(&user),
        Some(json!({ "status": "Completado" }))
    ).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, tx) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/transactions/{}/status", tx_id),
        Some(&admin),
        Some(json!({ "status": "Completado", "destination_reference_number": "ADM-REF-9" }))
    ).await;
    assert_eq!(status, StatusCode::OK, "{}", tx);
    assert_eq!(tx["status"], "Completado");
    assert_eq!(tx["destination_reference_number"], "ADM-REF-9");

    let (status, audit) = send(
        &app,
        Method::GET,
        &format!("/api/admin/transactions/{}/audit", tx_id),
        Some(&admin),
        None
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit.as_array().unwrap().len(), 1);
    assert!(audit[0]["action"].as_str().unwrap().contains("Completado"));

    let (status, dashboard) = send(&app, Method::GET, "/api/admin/dashboard", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["users"], 2);
    assert_eq!(dashboard["completed"], 1);
}

#[tokio::test]
async fn test_auth_is_required() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/transactions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/api/transactions", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_quote_without_route_is_not_found() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/quote?origin=VE&destination=VE&amount=100",
        None,
        None
    ).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NO_ROUTE");
}

#[tokio::test]
async fn test_standalone_verification_contract() {
    let app = app().await;
    let phone = "+51987654321";

    let (status, issued) = send(
        &app,
        Method::POST,
        "/api/resend-code",
        None,
        Some(json!({ "phone": phone }))
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issued["success"], true);
    assert_eq!(issued["expiresInMinutes"], 5);
    let code = issued["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    let wrong = if code == "123456" { "654321" } else { "123456" };
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/verify-code",
        None,
        Some(json!({ "phone": phone, "code": wrong }))
    ).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_CODE");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/verify-code",
        None,
        Some(json!({ "phone": phone, "code": code }))
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // The code is spent once verified
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/verify-code",
        None,
        Some(json!({ "phone": phone, "code": code }))
    ).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let app = app().await;
    register(&app, USER_PHONE, "secreto1").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "phone": USER_PHONE, "password": "secreto1" }))
    ).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_reset_codes_stay_out_of_responses() {
    let app = app().await;
    register(&app, USER_PHONE, "secreto1").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/password/forgot",
        None,
        Some(json!({ "phone": USER_PHONE }))
    ).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body.get("code").is_none());

    // The legacy resend keeps the reset purpose, so it must not leak either
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/resend-code",
        None,
        Some(json!({ "phone": USER_PHONE }))
    ).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body.get("code").is_none());
}

#[tokio::test]
async fn test_codes_are_not_echoed_when_disabled() {
    let mut config = Config::for_memory("integration-test-secret-0123456789");
    config.echo_verification_codes = false;
    let app = api::router(AppState::new(config, Repositories::in_memory()));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "phone": USER_PHONE, "password": "secreto1" }))
    ).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body.get("code").is_none());
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_signed_in_password_change() {
    let app = app().await;
    let token = register(&app, USER_PHONE, "secreto1").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/profile/password",
        None,
        Some(json!({ "current_password": "secreto1", "new_password": "otro-secreto" }))
    ).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/profile/password",
        Some(&token),
        Some(json!({ "current_password": "secreto1", "new_password": "otro-secreto" }))
    ).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "identifier": USER_PHONE, "password": "otro-secreto" }))
    ).await;
    assert_eq!(status, StatusCode::OK);
}
