use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Utc;

use super::{
    helpers::{issue_token, issue_token_with_expiry, TestContext},
    mocks::silent_gateway,
};
use crate::auth::Role;

#[actix_web::test]
async fn missing_token() {
    let ctx = TestContext::new(silent_gateway()).await;
    let (status, body) = ctx.send(TestRequest::get().uri("/api/orders")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No bearer token was provided"));
    let req = TestRequest::get().uri("/api/orders").insert_header(("Authorization", "Basic dXNlcjpwYXNz"));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn expired_token() {
    let ctx = TestContext::new(silent_gateway()).await;
    let token = issue_token_with_expiry("payer-1", &[Role::User], Utc::now().timestamp() - 3600);
    let req = TestRequest::get().uri("/api/orders").insert_header(("Authorization", format!("Bearer {token}")));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"));
    ctx.tear_down().await;
}

#[actix_web::test]
async fn tampered_token() {
    let ctx = TestContext::new(silent_gateway()).await;
    let mut token = issue_token("payer-1", &[Role::User]);
    let n = token.len();
    token.replace_range(n - 6..n - 1, "AAAAA");
    let req = TestRequest::get().uri("/api/orders").insert_header(("Authorization", format!("Bearer {token}")));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn not_a_jwt() {
    let ctx = TestContext::new(silent_gateway()).await;
    let req = TestRequest::get().uri("/api/orders").insert_header(("Authorization", "Bearer let-me-in"));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn public_routes_need_no_token() {
    let ctx = TestContext::new(silent_gateway()).await;
    let (status, body) = ctx.send(TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
    ctx.tear_down().await;
}
