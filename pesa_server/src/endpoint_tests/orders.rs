use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json as json_value;

use super::{
    helpers::{bearer, issue_token, json, TestContext},
    mocks::silent_gateway,
};
use crate::auth::Role;

fn manual_order() -> serde_json::Value {
    json_value!({
        "orderRef": "INV-100",
        "payerId": "payer-1",
        "lineItems": [
            { "productRef": "SKU-MANGO", "quantity": 3, "unitPrice": 50 },
            { "productRef": "SKU-PAWPAW", "quantity": 1, "unitPrice": 120 }
        ],
        "shippingFee": 0
    })
}

#[actix_web::test]
async fn manual_order_lifecycle() {
    let ctx = TestContext::new(silent_gateway()).await;
    let admin = issue_token("ops", &[Role::ReadAll, Role::Write]);

    let req = TestRequest::post().uri("/api/admin/orders").insert_header(bearer(&admin)).set_json(manual_order());
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::CREATED);
    let order = json(&body);
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["subtotal"], 270);
    assert_eq!(order["total"], 270);
    assert!(order["payment_ref"].is_null());
    let id = order["id"].as_i64().expect("order id");

    let uri = format!("/api/admin/orders/{id}");
    let (status, body) = ctx.send(TestRequest::get().uri(&uri).insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["line_items"].as_array().map(Vec::len), Some(2));

    let status_uri = format!("/api/admin/orders/{id}/status");
    let req =
        TestRequest::patch().uri(&status_uri).insert_header(bearer(&admin)).set_json(json_value!({"status": "Paid"}));
    let (status, body) = ctx.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "Paid");

    let req = TestRequest::patch()
        .uri(&status_uri)
        .insert_header(bearer(&admin))
        .set_json(json_value!({"status": "Delivered"}));
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx.send(TestRequest::delete().uri(&uri).insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["success"], true);

    let (status, _) = ctx.send(TestRequest::get().uri(&uri).insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = ctx.send(TestRequest::delete().uri(&uri).insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn invalid_manual_orders_are_rejected() {
    let ctx = TestContext::new(silent_gateway()).await;
    let admin = issue_token("ops", &[Role::Write]);
    let empty = json_value!({ "orderRef": "INV-101", "payerId": "payer-1", "lineItems": [] });
    let req = TestRequest::post().uri("/api/admin/orders").insert_header(bearer(&admin)).set_json(empty);
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let negative = json_value!({
        "orderRef": "INV-102",
        "payerId": "payer-1",
        "lineItems": [{ "productRef": "SKU-MANGO", "quantity": -1, "unitPrice": 50 }]
    });
    let req = TestRequest::post().uri("/api/admin/orders").insert_header(bearer(&admin)).set_json(negative);
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn order_admin_needs_the_right_roles() {
    let ctx = TestContext::new(silent_gateway()).await;
    let payer = issue_token("payer-1", &[Role::User]);
    let req = TestRequest::post().uri("/api/admin/orders").insert_header(bearer(&payer)).set_json(manual_order());
    let (status, _) = ctx.send(req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let reader = issue_token("auditor", &[Role::ReadAll]);
    let (status, _) = ctx.send(TestRequest::delete().uri("/api/admin/orders/1").insert_header(bearer(&reader))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn bad_order_id() {
    let ctx = TestContext::new(silent_gateway()).await;
    let admin = issue_token("ops", &[Role::ReadAll]);
    let (status, body) =
        ctx.send(TestRequest::get().uri("/api/admin/orders/not-a-number").insert_header(bearer(&admin))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Could not read request path"));
    ctx.tear_down().await;
}

#[actix_web::test]
async fn my_orders() {
    let ctx = TestContext::new(silent_gateway()).await;
    let payment = ctx.seed_completed_payment("ws_CO_0200", "payer-1", 400).await;
    ctx.payments.finalize(&payment).await.expect("finalize failed");
    ctx.seed_completed_payment("ws_CO_0201", "payer-2", 900).await;
    ctx.payments.finalize_by_id("ws_CO_0201").await.expect("finalize failed");

    let token = issue_token("payer-1", &[Role::User]);
    let (status, body) = ctx.send(TestRequest::get().uri("/api/orders").insert_header(bearer(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let orders = body.as_array().expect("expected a list");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["payment_ref"], "ws_CO_0200");
    assert_eq!(orders[0]["status"], "Paid");
    assert_eq!(orders[0]["total"], 600);
    ctx.tear_down().await;
}
