use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Utc;
use pesa_engine::traits::OrderStore;

use super::{
    helpers::{bearer, issue_token, json, TestContext},
    mocks::silent_gateway,
};
use crate::auth::Role;

#[actix_web::test]
async fn reconcile_reports_unmatched_payments() {
    let ctx = TestContext::new(silent_gateway()).await;
    for i in 0..3 {
        let id = format!("ws_CO_030{i}");
        ctx.seed_completed_payment(&id, "payer-1", 100 + i).await;
        if i > 0 {
            ctx.payments.finalize_by_id(&id).await.expect("finalize failed");
        }
    }
    let today = Utc::now().date_naive();
    let admin = issue_token("auditor", &[Role::ReadAll]);
    let uri = format!("/api/admin/reconcile?date={today}");
    let (status, body) = ctx.send(TestRequest::get().uri(&uri).insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    let report = json(&body);
    assert_eq!(report["total_payments"], 3);
    assert_eq!(report["matched_count"], 2);
    assert_eq!(report["unmatched_count"], 1);
    let unmatched = report["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .filter(|e| e["matched"] == false)
        .map(|e| e["payment_ref"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    assert_eq!(unmatched, vec!["ws_CO_0300".to_string()]);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn reconcile_needs_a_valid_date_and_role() {
    let ctx = TestContext::new(silent_gateway()).await;
    let admin = issue_token("auditor", &[Role::ReadAll]);
    let (status, _) =
        ctx.send(TestRequest::get().uri("/api/admin/reconcile?date=yesterday").insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = ctx.send(TestRequest::get().uri("/api/admin/reconcile").insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let payer = issue_token("payer-1", &[Role::User]);
    let (status, _) =
        ctx.send(TestRequest::get().uri("/api/admin/reconcile?date=2024-01-01").insert_header(bearer(&payer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn manual_finalize_is_idempotent() {
    let ctx = TestContext::new(silent_gateway()).await;
    ctx.seed_completed_payment("ws_CO_0400", "payer-1", 250).await;
    let admin = issue_token("ops", &[Role::Write]);
    let uri = "/api/admin/payments/ws_CO_0400/finalize";

    let (status, body) = ctx.send(TestRequest::post().uri(uri).insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    let first = json(&body);
    assert_eq!(first["created"], true);
    assert_eq!(first["order"]["payment_ref"], "ws_CO_0400");

    let (status, body) = ctx.send(TestRequest::post().uri(uri).insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    let second = json(&body);
    assert_eq!(second["created"], false);
    assert_eq!(second["order"]["id"], first["order"]["id"]);
    assert_eq!(ctx.db.orders_for_payer("payer-1").await.unwrap().len(), 1);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn pending_payments_cannot_be_finalized() {
    let ctx = TestContext::new(silent_gateway()).await;
    ctx.seed_payment("ws_CO_0401", "payer-1", 250).await;
    let admin = issue_token("ops", &[Role::Write]);
    let req = TestRequest::post().uri("/api/admin/payments/ws_CO_0401/finalize").insert_header(bearer(&admin));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let req = TestRequest::post().uri("/api/admin/payments/ws_CO_none/finalize").insert_header(bearer(&admin));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn admin_payment_lookup() {
    let ctx = TestContext::new(silent_gateway()).await;
    ctx.seed_payment("ws_CO_0402", "payer-7", 75).await;
    let admin = issue_token("auditor", &[Role::ReadAll]);
    let (status, body) =
        ctx.send(TestRequest::get().uri("/api/admin/payments/ws_CO_0402").insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    let payment = json(&body);
    assert_eq!(payment["payer_id"], "payer-7");
    assert_eq!(payment["amount"], 75);
    assert_eq!(payment["status"], "Pending");
    let (status, _) =
        ctx.send(TestRequest::get().uri("/api/admin/payments/ws_CO_none").insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    ctx.tear_down().await;
}
