use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use pesa_gateway::{
    GatewayError,
    GatewayResult,
    PushAccepted,
    PushPaymentProvider,
    PushRequest,
    QueryOutcome,
    ResultCode,
};

#[derive(Default)]
struct Script {
    push_failures: VecDeque<GatewayError>,
    query_results: HashMap<String, Result<QueryOutcome, GatewayError>>,
    pushes: Vec<PushRequest>,
    push_delay: Option<Duration>,
}

/// A gateway that accepts every push with sequential correlation ids and answers status queries from a script.
/// Payments without a scripted answer are still processing.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
    push_calls: Arc<AtomicUsize>,
    query_calls: Arc<AtomicUsize>,
}

impl ScriptedGateway {
    pub fn fail_next_push(&self, error: GatewayError) {
        self.script.lock().unwrap().push_failures.push_back(error);
    }

    /// Makes every push take `delay` before the gateway answers, like a slow network would.
    pub fn delay_pushes(&self, delay: Duration) {
        self.script.lock().unwrap().push_delay = Some(delay);
    }

    pub fn answer_query(&self, correlation_id: &str, outcome: Result<QueryOutcome, GatewayError>) {
        self.script.lock().unwrap().query_results.insert(correlation_id.to_string(), outcome);
    }

    pub fn answer_query_with_code(&self, correlation_id: &str, code: i64, description: &str, receipt: Option<&str>) {
        let result = GatewayResult {
            result_code: ResultCode::new(code),
            description: description.to_string(),
            receipt_ref: receipt.map(String::from),
        };
        self.answer_query(correlation_id, Ok(QueryOutcome::Terminal(result)));
    }

    pub fn push_calls(&self) -> usize {
        self.push_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn pushes(&self) -> Vec<PushRequest> {
        self.script.lock().unwrap().pushes.clone()
    }
}

impl PushPaymentProvider for ScriptedGateway {
    async fn initiate_push(&self, request: PushRequest) -> Result<PushAccepted, GatewayError> {
        let n = self.push_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.script.lock().unwrap().push_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script.lock().unwrap();
        script.pushes.push(request);
        if let Some(e) = script.push_failures.pop_front() {
            return Err(e);
        }
        Ok(PushAccepted {
            correlation_id: format!("ws_CO_{n:04}"),
            merchant_request_id: format!("mr-{n}"),
            customer_message: "Success. Request accepted for processing".to_string(),
        })
    }

    async fn query_status(&self, correlation_id: &str) -> Result<QueryOutcome, GatewayError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap();
        script.query_results.get(correlation_id).cloned().unwrap_or(Ok(QueryOutcome::StillProcessing))
    }
}
