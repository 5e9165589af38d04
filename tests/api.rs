// tests/api.rs
//
// Autenticação, usuários, minas e política de leitura pela API HTTP.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::test_app;

#[tokio::test]
async fn health_reports_ok_without_a_token() {
    let app = test_app();
    let res = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ok");
    assert!(res.body["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let app = test_app();

    let missing = app.json(Method::GET, "/batches", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"], "unauthenticated");

    let garbage = app.get("/batches", "not-a-jwt").await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let basic = app
        .send(
            Request::get("/mines")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(basic.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_usernames_are_rejected() {
    let app = test_app();
    app.user("kwame", "asm").await;

    let again = app
        .json(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "kwame", "password": "another1" })),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["error"], "conflict");
}

#[tokio::test]
async fn login_distinguishes_unknown_user_from_bad_password() {
    let app = test_app();
    app.user("kwame", "asm").await;

    let unknown = app
        .json(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "nobody", "password": "secret1" })),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let wrong = app
        .json(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "kwame", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_cookie_issues_a_new_access_token() {
    let app = test_app();
    app.user("kwame", "asm").await;

    let login = app
        .json(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "kwame", "password": "secret1" })),
        )
        .await;
    let set_cookie = login.headers[header::SET_COOKIE].to_str().unwrap().to_owned();
    assert!(set_cookie.starts_with("refreshToken="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/auth"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Secure"));
    assert!(set_cookie.contains("Max-Age=604800"));

    let pair = set_cookie.split(';').next().unwrap().to_owned();
    let refreshed = app
        .send(
            Request::post("/auth/refresh")
                .header(header::COOKIE, pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);

    let token = refreshed.body["token"].as_str().unwrap();
    let me = app.get("/user/me", token).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "kwame");
    assert_eq!(me.body["role"], "asm");

    let no_cookie = app.json(Method::POST, "/auth/refresh", None, None).await;
    assert_eq!(no_cookie.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bodies_and_ids_are_validation_errors() {
    let app = test_app();
    let asm = app.user("kwame", "asm").await;

    let no_password = app
        .json(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "esi" })),
        )
        .await;
    assert_eq!(no_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_password.body["error"], "validation_error");
    assert!(no_password.body["message"].is_string());

    let no_type = app
        .json(
            Method::POST,
            "/mines",
            Some(asm.as_str()),
            Some(json!({ "name": "Tarkwa East", "location": "Tarkwa", "license_number": "MC-1" })),
        )
        .await;
    assert_eq!(no_type.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_type.body["error"], "validation_error");

    let mine = app.create_mine(&asm, "Obuasi North Pit").await;
    let batch = app.register_batch(&asm, mine).await;
    let id = batch.body["id"].as_i64().unwrap();
    let empty_invite = app
        .json(
            Method::POST,
            &format!("/batches/{id}/invite-dealer"),
            Some(asm.as_str()),
            Some(json!({})),
        )
        .await;
    assert_eq!(empty_invite.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty_invite.body["error"], "validation_error");

    let not_json = app
        .send(
            Request::post("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(not_json.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_json.body["error"], "validation_error");

    let bad_id = app.get("/batches/abc", &asm).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.body["error"], "validation_error");

    let bad_invitation_id = app
        .json(Method::PATCH, "/dealer-invitations/abc/accept", Some(asm.as_str()), None)
        .await;
    assert_eq!(bad_invitation_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_invitation_id.body["error"], "validation_error");
}

#[tokio::test]
async fn users_can_be_looked_up_by_id_and_name() {
    let app = test_app();
    let token = app.user("kwame", "asm").await;
    app.user("ama", "dealer").await;

    let by_name = app.get("/user/by-username/ama", &token).await;
    assert_eq!(by_name.status, StatusCode::OK);
    assert_eq!(by_name.body["role"], "dealer");
    assert!(by_name.body.get("password_hash").is_none());

    let id = by_name.body["id"].as_i64().unwrap();
    let by_id = app.get(&format!("/user/by-id/{id}"), &token).await;
    assert_eq!(by_id.body["username"], "ama");

    let missing = app.get("/user/by-username/ghost", &token).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_asm_users_create_mines() {
    let app = test_app();
    let dealer = app.user("ama", "dealer").await;

    let res = app
        .json(
            Method::POST,
            "/mines",
            Some(dealer.as_str()),
            Some(json!({
                "name": "Tarkwa East",
                "type": "open pit",
                "location": "Tarkwa",
                "license_number": "MC-1",
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn blank_mine_fields_fail_validation() {
    let app = test_app();
    let asm = app.user("kwame", "asm").await;

    let res = app
        .json(
            Method::POST,
            "/mines",
            Some(asm.as_str()),
            Some(json!({
                "name": "   ",
                "type": "alluvial",
                "location": "Obuasi",
                "license_number": "MC-1",
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "validation_error");
    assert!(res.body["details"]["name"].is_array());
}

#[tokio::test]
async fn miners_see_only_their_own_mines() {
    let app = test_app();
    let kwame = app.user("kwame", "asm").await;
    let esi = app.user("esi", "asm").await;
    let dealer = app.user("ama", "dealer").await;

    let own = app.create_mine(&kwame, "Obuasi North Pit").await;
    app.create_mine(&esi, "Prestea Ridge").await;

    let listed = app.get("/mines", &kwame).await;
    let names: Vec<&str> = listed.body.as_array().unwrap().iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Obuasi North Pit"]);
    assert_eq!(listed.body[0]["type"], "alluvial");

    let all = app.get("/mines", &dealer).await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let foreign = app.get(&format!("/mines/{own}"), &esi).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    let missing = app.get("/mines/9999", &kwame).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batches_are_hidden_from_unrelated_users() {
    let app = test_app();
    let kwame = app.user("kwame", "asm").await;
    let esi = app.user("esi", "asm").await;
    let dealer = app.user("ama", "dealer").await;

    let mine = app.create_mine(&kwame, "Obuasi North Pit").await;
    let batch = app.register_batch(&kwame, mine).await;
    let id = batch.body["id"].as_i64().unwrap();

    assert_eq!(app.get(&format!("/batches/{id}"), &esi).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&format!("/batches/{id}"), &dealer).await.status, StatusCode::FORBIDDEN);
    assert!(app.get("/batches", &esi).await.body.as_array().unwrap().is_empty());
    assert!(app.get("/batches", &dealer).await.body.as_array().unwrap().is_empty());

    // Convite pendente já libera a leitura do lote, mas não a listagem
    app.invite_dealer(&kwame, id, "ama").await;
    assert_eq!(app.get(&format!("/batches/{id}"), &dealer).await.status, StatusCode::OK);
    assert!(app.get("/batches", &dealer).await.body.as_array().unwrap().is_empty());

    let missing = app.get("/batches/4242", &kwame).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = test_app();
    let res = app
        .send(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["paths"]["/batches/{id}/transport"].is_object());
}
