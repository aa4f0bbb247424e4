#![allow(dead_code)]
pub mod fake_gateway;
pub mod flaky_store;
pub mod prepare_env;

use std::sync::{Arc, Mutex};

use chrono::Duration;
use pesa_engine::{
    db_types::Notification,
    helpers::RetryPolicy,
    traits::{NotificationChannel, NotificationError},
    FlowConfig,
    PaymentFlowApi,
    SqliteDatabase,
};
use pesa_gateway::{CallbackPayload, GatewayResult, ResultCode};

pub use self::{fake_gateway::ScriptedGateway, flaky_store::FlakyOrderStore, prepare_env::TestDb};

/// Keeps every notification so tests can assert on them.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(String, Notification)>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn orders_created(&self) -> usize {
        self.sent().iter().filter(|(_, n)| matches!(n, Notification::OrderCreated { .. })).count()
    }
}

impl NotificationChannel for RecordingNotifier {
    async fn push(&self, user_id: &str, notification: Notification) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push((user_id.to_string(), notification));
        Ok(())
    }
}

pub type TestApi = PaymentFlowApi<SqliteDatabase, ScriptedGateway, RecordingNotifier>;

pub fn test_config() -> FlowConfig {
    FlowConfig { retry: RetryPolicy::immediate(3), ..FlowConfig::default() }
}

/// A config that skips the status grace period, so every poll of a pending payment queries the gateway.
pub fn eager_config() -> FlowConfig {
    FlowConfig { status_grace: Duration::zero(), ..test_config() }
}

pub fn payment_api(db: &TestDb, config: FlowConfig) -> (TestApi, ScriptedGateway, RecordingNotifier) {
    let gateway = ScriptedGateway::default();
    let notifier = RecordingNotifier::default();
    let api = PaymentFlowApi::new(db.db.clone(), gateway.clone(), notifier.clone(), config);
    (api, gateway, notifier)
}

pub fn callback(id: &str, code: i64, description: &str, receipt: Option<&str>) -> CallbackPayload {
    CallbackPayload {
        correlation_id: id.to_string(),
        merchant_request_id: None,
        result: GatewayResult {
            result_code: ResultCode::new(code),
            description: description.to_string(),
            receipt_ref: receipt.map(String::from),
        },
        amount: None,
        phone: None,
    }
}
