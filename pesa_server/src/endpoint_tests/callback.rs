use actix_web::{http::StatusCode, test::TestRequest};
use pesa_gateway::PaymentOutcome;

use super::{
    helpers::{json, test_flow_config, TestContext},
    mocks::silent_gateway,
};
use crate::config::ServerOptions;

const SUCCESS: &str = r#"{"Body":{"stkCallback":{"MerchantRequestID":"29115-34620561-1",
    "CheckoutRequestID":"ws_CO_0100","ResultCode":0,
    "ResultDesc":"The service request is processed successfully.",
    "CallbackMetadata":{"Item":[{"Name":"Amount","Value":100},{"Name":"MpesaReceiptNumber","Value":"QWE123"},
    {"Name":"PhoneNumber","Value":254712345678}]}}}}"#;

fn post_callback(body: &str) -> TestRequest {
    TestRequest::post()
        .uri("/payments/callback")
        .insert_header(("content-type", "application/json"))
        .set_payload(body.to_string())
}

#[actix_web::test]
async fn valid_callback_is_queued_and_acknowledged() {
    let mut ctx = TestContext::new(silent_gateway()).await;
    let (status, body) = ctx.send(post_callback(SUCCESS)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["ResultCode"], 0);
    assert_eq!(body["ResultDesc"], "Accepted");
    let queued = ctx.callbacks.try_recv().expect("callback was not queued");
    assert_eq!(queued.correlation_id, "ws_CO_0100");
    assert_eq!(queued.result.result_code.outcome(), PaymentOutcome::Completed);
    assert_eq!(queued.result.receipt_ref.as_deref(), Some("QWE123"));
    ctx.tear_down().await;
}

#[actix_web::test]
async fn malformed_callbacks_are_acknowledged_and_dropped() {
    let mut ctx = TestContext::new(silent_gateway()).await;
    let no_id = r#"{"Body":{"stkCallback":{"ResultCode":0,"ResultDesc":"ok"}}}"#;
    let no_code = r#"{"Body":{"stkCallback":{"CheckoutRequestID":"ws_CO_0101","ResultDesc":"ok"}}}"#;
    for body in [no_id, no_code, "this is not json", ""] {
        let (status, ack) = ctx.send(post_callback(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack, r#"{"ResultCode":0,"ResultDesc":"Accepted"}"#);
    }
    assert!(ctx.callbacks.try_recv().is_err());
    ctx.tear_down().await;
}

#[actix_web::test]
async fn whitelist_acknowledges_but_drops_unknown_peers() {
    let options = ServerOptions {
        callback_whitelist: Some(vec!["196.201.214.200".parse().unwrap()]),
        ..ServerOptions::default()
    };
    let mut ctx = TestContext::with_config(silent_gateway(), test_flow_config(), options).await;

    let req = post_callback(SUCCESS).peer_addr("10.0.0.1:5000".parse().unwrap());
    let (status, ack) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, r#"{"ResultCode":0,"ResultDesc":"Accepted"}"#);
    assert!(ctx.callbacks.try_recv().is_err());

    // No peer address at all is treated the same way
    let (status, ack) = ctx.send(post_callback(SUCCESS)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, r#"{"ResultCode":0,"ResultDesc":"Accepted"}"#);
    assert!(ctx.callbacks.try_recv().is_err());

    let req = post_callback(SUCCESS).peer_addr("196.201.214.200:443".parse().unwrap());
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.callbacks.try_recv().is_ok());
    ctx.tear_down().await;
}

#[actix_web::test]
async fn whitelist_honours_forwarded_for_when_enabled() {
    let options = ServerOptions {
        use_x_forwarded_for: true,
        use_forwarded: false,
        callback_whitelist: Some(vec!["196.201.214.206".parse().unwrap()]),
    };
    let mut ctx = TestContext::with_config(silent_gateway(), test_flow_config(), options).await;
    let req = post_callback(SUCCESS)
        .peer_addr("10.0.0.1:5000".parse().unwrap())
        .insert_header(("X-Forwarded-For", "196.201.214.206"));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.callbacks.try_recv().is_ok());
    ctx.tear_down().await;
}
