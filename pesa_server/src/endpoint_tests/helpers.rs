use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::debug;
use pesa_common::{normalize_phone, Amount, Secret};
use pesa_engine::{
    db_types::{NewPaymentRequest, PaymentRequest, PaymentSettlement},
    events::EventNotifier,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::PaymentStore,
    CallbackQueue,
    FlowConfig,
    OrderApi,
    PaymentFlowApi,
    ReconciliationApi,
    SqliteDatabase,
};
use pesa_gateway::CallbackPayload;
use tokio::sync::mpsc;

use super::mocks::MockGateway;
use crate::{
    auth::{JwtClaims, Role, TokenVerifier},
    config::{AuthConfig, ServerOptions},
    routes::PaymentApi,
    server::configure_routes,
};

// DO NOT re-use this secret anywhere.
const TEST_JWT_SECRET: &str = "e7d1c2b0a9f84c3e9b5d6a7f8e9d0c1b";

pub fn auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()) }
}

pub fn issue_token_with_expiry(sub: &str, roles: &[Role], exp: i64) -> String {
    let claims = JwtClaims { sub: sub.to_string(), roles: roles.to_vec(), exp: exp as u64 };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()))
        .expect("Failed to sign token")
}

pub fn issue_token(sub: &str, roles: &[Role]) -> String {
    issue_token_with_expiry(sub, roles, Utc::now().timestamp() + 3600)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Test flow settings. Status polls always go to the gateway, and retries don't sleep.
pub fn test_flow_config() -> FlowConfig {
    FlowConfig {
        status_grace: chrono::Duration::zero(),
        retry: pesa_engine::helpers::RetryPolicy::immediate(2),
        ..FlowConfig::default()
    }
}

/// The app state for one test: a fresh database, the flow APIs on top of it with a mock gateway, and the receiving
/// end of the callback queue.
pub struct TestContext {
    pub db: SqliteDatabase,
    pub payments: web::Data<PaymentApi<MockGateway>>,
    pub orders: web::Data<OrderApi<SqliteDatabase>>,
    pub queue: web::Data<CallbackQueue>,
    pub reconciler: web::Data<ReconciliationApi<SqliteDatabase>>,
    pub options: ServerOptions,
    pub callbacks: mpsc::Receiver<CallbackPayload>,
}

impl TestContext {
    pub async fn new(gateway: MockGateway) -> Self {
        Self::with_config(gateway, test_flow_config(), ServerOptions::default()).await
    }

    pub async fn with_config(gateway: MockGateway, flow: FlowConfig, options: ServerOptions) -> Self {
        let _ = env_logger::try_init();
        let db = prepare_test_env(&random_db_path()).await;
        let orders = OrderApi::new(db.clone(), flow.shipping_fee);
        let payments = PaymentFlowApi::new(db.clone(), gateway, EventNotifier::default(), flow);
        let reconciler = ReconciliationApi::new(db.clone());
        let (queue, callbacks) = CallbackQueue::new(8);
        Self {
            db,
            payments: web::Data::new(payments),
            orders: web::Data::new(orders),
            queue: web::Data::new(queue),
            reconciler: web::Data::new(reconciler),
            options,
            callbacks,
        }
    }

    /// Runs a single request through a freshly configured app and returns the status and body.
    pub async fn send(&self, req: TestRequest) -> (StatusCode, String) {
        let verifier = Arc::new(TokenVerifier::new(&auth_config()));
        let options = self.options.clone();
        let app = App::new()
            .app_data(self.payments.clone())
            .app_data(self.orders.clone())
            .app_data(self.queue.clone())
            .app_data(self.reconciler.clone())
            .configure(move |cfg| configure_routes::<MockGateway>(cfg, verifier, options));
        let service = test::init_service(app).await;
        let res = test::call_service(&service, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        let body = String::from_utf8_lossy(&body).into_owned();
        debug!("Response: {status} {body}");
        (status, body)
    }

    /// Inserts a pending payment directly, bypassing the gateway.
    pub async fn seed_payment(&self, id: &str, payer_id: &str, amount: i64) -> PaymentRequest {
        let request = NewPaymentRequest {
            id: id.to_string(),
            merchant_request_id: Some(format!("merchant-{id}")),
            order_ref: format!("ORD-{id}"),
            payer_id: payer_id.to_string(),
            phone: normalize_phone("0712345678").expect("valid phone"),
            amount: Amount::from(amount),
            description: None,
            created_at: Utc::now(),
        };
        self.db.insert_payment_request(request).await.expect("Failed to seed payment")
    }

    pub async fn seed_completed_payment(&self, id: &str, payer_id: &str, amount: i64) -> PaymentRequest {
        self.seed_payment(id, payer_id, amount).await;
        let settlement = PaymentSettlement::completed(0, "Processed".into(), format!("RCPT{id}"));
        self.db.settle_payment(id, settlement).await.expect("Failed to settle").expect("Payment was not pending")
    }

    pub async fn tear_down(self) {
        self.db.close().await;
    }
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).expect("Response was not JSON")
}
