use actix_web::{http::StatusCode, test::TestRequest};
use pesa_common::Amount;
use pesa_engine::{db_types::PaymentStatus, traits::PaymentStore, DEFAULT_FAILURE_REASON};
use pesa_gateway::{GatewayError, GatewayResult, QueryOutcome, ResultCode};
use serde_json::json as json_value;

use super::{
    helpers::{bearer, issue_token, json, TestContext},
    mocks::{accepted, silent_gateway, MockGateway},
};
use crate::auth::Role;

fn new_payment(order_ref: &str) -> serde_json::Value {
    json_value!({ "phone": "0712345678", "amount": 100, "orderRef": order_ref, "description": "Two mangoes" })
}

fn post_payment(token: &str, body: serde_json::Value) -> TestRequest {
    TestRequest::post().uri("/api/payments").insert_header(bearer(token)).set_json(body)
}

#[actix_web::test]
async fn initiate_payment() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_initiate_push()
        .withf(|req| req.phone.as_str() == "254712345678" && req.amount == Amount::from(100))
        .times(1)
        .returning(|_| Ok(accepted("ws_CO_0001")));
    let ctx = TestContext::new(gateway).await;
    let token = issue_token("payer-1", &[Role::User]);
    let (status, body) = ctx.send(post_payment(&token, new_payment("ORD-1"))).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["correlationId"], "ws_CO_0001");
    assert_eq!(body["status"], "Pending");
    let payment = ctx.db.fetch_payment_request("ws_CO_0001").await.unwrap().expect("payment was not stored");
    assert_eq!(payment.payer_id, "payer-1");
    assert_eq!(payment.order_ref, "ORD-1");
    assert_eq!(payment.phone.as_str(), "254712345678");
    assert_eq!(payment.status, PaymentStatus::Pending);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn duplicate_payment_returns_original_correlation_id() {
    let mut gateway = MockGateway::new();
    gateway.expect_initiate_push().times(1).returning(|_| Ok(accepted("ws_CO_0002")));
    let ctx = TestContext::new(gateway).await;
    let token = issue_token("payer-1", &[Role::User]);
    let (status, _) = ctx.send(post_payment(&token, new_payment("ORD-2"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = ctx.send(post_payment(&token, new_payment("ORD-2"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)["correlationId"], "ws_CO_0002");
    assert_eq!(ctx.db.payments_for_payer("payer-1").await.unwrap().len(), 1);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn invalid_phone_and_amount_never_reach_the_gateway() {
    let ctx = TestContext::new(silent_gateway()).await;
    let token = issue_token("payer-1", &[Role::User]);
    let bad_phone = json_value!({ "phone": "12345", "amount": 100, "orderRef": "ORD-3" });
    let (status, body) = ctx.send(post_payment(&token, bad_phone)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].is_string());
    let zero = json_value!({ "phone": "0712345678", "amount": 0, "orderRef": "ORD-3" });
    let (status, _) = ctx.send(post_payment(&token, zero)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let no_ref = json_value!({ "phone": "0712345678", "amount": 10, "orderRef": "  " });
    let (status, _) = ctx.send(post_payment(&token, no_ref)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(ctx.db.payments_for_payer("payer-1").await.unwrap().is_empty());
    ctx.tear_down().await;
}

#[actix_web::test]
async fn malformed_body() {
    let ctx = TestContext::new(silent_gateway()).await;
    let token = issue_token("payer-1", &[Role::User]);
    let req = TestRequest::post()
        .uri("/api/payments")
        .insert_header(bearer(&token))
        .insert_header(("content-type", "application/json"))
        .set_payload("{ not json");
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Could not read request body"));
    ctx.tear_down().await;
}

async fn gateway_failure(error: GatewayError) -> StatusCode {
    let mut gateway = MockGateway::new();
    gateway.expect_initiate_push().times(1).returning(move |_| Err(error.clone()));
    let ctx = TestContext::new(gateway).await;
    let token = issue_token("payer-1", &[Role::User]);
    let (status, _) = ctx.send(post_payment(&token, new_payment("ORD-4"))).await;
    assert!(ctx.db.payments_for_payer("payer-1").await.unwrap().is_empty());
    ctx.tear_down().await;
    status
}

#[actix_web::test]
async fn gateway_errors_map_to_status_codes() {
    let rejected = GatewayError::Rejected { code: "400.002.02".into(), description: "Invalid Amount".into() };
    assert_eq!(gateway_failure(rejected).await, StatusCode::BAD_GATEWAY);
    assert_eq!(gateway_failure(GatewayError::Timeout).await, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(gateway_failure(GatewayError::AuthFailed("bad key".into())).await, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn payment_routes_need_the_user_role() {
    let ctx = TestContext::new(silent_gateway()).await;
    let token = issue_token("admin", &[Role::ReadAll]);
    let (status, body) = ctx.send(post_payment(&token, new_payment("ORD-5"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Insufficient Permissions"));
    ctx.tear_down().await;
}

#[actix_web::test]
async fn status_of_unknown_payment() {
    let ctx = TestContext::new(silent_gateway()).await;
    let (status, _) = ctx.send(TestRequest::get().uri("/payments/ws_CO_nope/status")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn status_of_terminal_payment_does_not_query_the_gateway() {
    let ctx = TestContext::new(silent_gateway()).await;
    ctx.seed_completed_payment("ws_CO_0006", "payer-1", 100).await;
    let (status, body) = ctx.send(TestRequest::get().uri("/payments/ws_CO_0006/status")).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "Completed");
    assert_eq!(body["resultCode"], 0);
    assert_eq!(body["receiptRef"], "RCPTws_CO_0006");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn status_poll_settles_through_the_gateway() {
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().withf(|id| id == "ws_CO_0007").times(1).returning(|_| {
        Ok(QueryOutcome::Terminal(GatewayResult {
            result_code: ResultCode::new(1032),
            description: "Request cancelled by user".into(),
            receipt_ref: None,
        }))
    });
    let ctx = TestContext::new(gateway).await;
    ctx.seed_payment("ws_CO_0007", "payer-1", 100).await;
    let (status, body) = ctx.send(TestRequest::get().uri("/payments/ws_CO_0007/status")).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "Failed");
    assert_eq!(body["resultCode"], 1032);
    assert_eq!(body["resultDescription"], "Request cancelled by user");
    assert!(body.get("receiptRef").is_none());
    // Terminal now, so the second poll is answered from the store
    let (status, body) = ctx.send(TestRequest::get().uri("/payments/ws_CO_0007/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "Failed");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn status_poll_stays_pending_when_the_gateway_is_down() {
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().times(1).returning(|_| Err(GatewayError::Timeout));
    let ctx = TestContext::new(gateway).await;
    ctx.seed_payment("ws_CO_0008", "payer-1", 100).await;
    let (status, body) = ctx.send(TestRequest::get().uri("/payments/ws_CO_0008/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "Pending");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn report_failure() {
    let ctx = TestContext::new(silent_gateway()).await;
    ctx.seed_payment("ws_CO_0009", "payer-1", 100).await;
    let uri = "/api/payments/ws_CO_0009/report-failure";

    let intruder = issue_token("payer-2", &[Role::User]);
    let (status, _) = ctx.send(TestRequest::post().uri(uri).insert_header(bearer(&intruder))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = issue_token("payer-1", &[Role::User]);
    let (status, body) = ctx.send(TestRequest::post().uri(uri).insert_header(bearer(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "Failed");
    assert_eq!(body["resultDescription"], DEFAULT_FAILURE_REASON);

    let (status, _) = ctx.send(TestRequest::post().uri(uri).insert_header(bearer(&owner))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn admin_can_report_failure_with_a_reason() {
    let ctx = TestContext::new(silent_gateway()).await;
    ctx.seed_payment("ws_CO_0010", "payer-1", 100).await;
    let admin = issue_token("ops", &[Role::Write]);
    let req = TestRequest::post()
        .uri("/api/payments/ws_CO_0010/report-failure")
        .insert_header(bearer(&admin))
        .set_json(json_value!({ "reason": "Customer called support" }));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["resultDescription"], "Customer called support");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn my_payments_only_lists_my_own() {
    let ctx = TestContext::new(silent_gateway()).await;
    ctx.seed_payment("ws_CO_0011", "payer-1", 100).await;
    ctx.seed_payment("ws_CO_0012", "payer-2", 250).await;
    let token = issue_token("payer-1", &[Role::User]);
    let (status, body) = ctx.send(TestRequest::get().uri("/api/payments").insert_header(bearer(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let payments = body.as_array().expect("expected a list");
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["id"], "ws_CO_0011");
    ctx.tear_down().await;
}
