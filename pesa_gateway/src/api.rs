use std::{future::Future, sync::Arc};

use chrono::{Duration, Utc};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::GatewayConfig,
    credentials::{AccessToken, CredentialCache},
    data_objects::{AuthResponse, ErrorBody, StkPushBody, StkPushResponse, StkQueryBody, StkQueryResponse},
    helpers::{gateway_timestamp, request_password},
    GatewayError,
    GatewayResult,
    PushAccepted,
    PushPaymentProvider,
    PushRequest,
    QueryOutcome,
    ResultCode,
};

const TOKEN_PATH: &str = "/oauth/v1/generate";
const PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";
const QUERY_PATH: &str = "/mpesa/stkpushquery/v1/query";
/// Used when the gateway omits `expires_in` from the token response.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3599;

/// REST client for the STK push gateway.
///
/// Clones share the HTTP connection pool and the credential cache.
#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
    credentials: Arc<CredentialCache>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        let credentials = Arc::new(CredentialCache::default());
        Ok(Self { config, client: Arc::new(client), credentials })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns a valid bearer token, fetching a new one from the gateway only when the cached one has expired.
    pub async fn access_token(&self) -> Result<String, GatewayError> {
        self.credentials.get_or_refresh(|| self.fetch_access_token()).await
    }

    async fn fetch_access_token(&self) -> Result<AccessToken, GatewayError> {
        let url = self.config.url(TOKEN_PATH);
        trace!("📡️ Requesting access token from {url}");
        let response = self
            .client
            .get(url)
            .query(&[("grant_type", "client_credentials")])
            .basic_auth(self.config.consumer_key.reveal(), Some(self.config.consumer_secret.reveal()))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("📡️ The gateway refused to issue an access token. {status}: {message}");
            return Err(GatewayError::AuthFailed(format!("{status}. {message}")));
        }
        let auth = response.json::<AuthResponse>().await?;
        let lifetime = auth.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        debug!("📡️ Obtained a new access token, valid for {lifetime}s");
        Ok(AccessToken::new(auth.access_token, Duration::seconds(lifetime)))
    }

    /// POSTs `body` to `path` with the current bearer token.
    ///
    /// A 401 response invalidates the cached token so that the next call fetches a new one.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, GatewayError> {
        let token = self.access_token().await?;
        let url = self.config.url(path);
        trace!("📡️ Sending REST query: {url}");
        let response = self.client.post(url).bearer_auth(token).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            trace!("📡️ REST query successful. {status}");
            return Ok(response.json::<T>().await?);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate().await;
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::AuthFailed(message));
        }
        let text = response.text().await?;
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(err) => {
                trace!("📡️ Request {} failed with {}", err.request_id.as_deref().unwrap_or("(no id)"), err.error_code);
                Err(GatewayError::Rejected { code: err.error_code, description: err.error_message })
            },
            Err(_) => Err(GatewayError::Rejected { code: status.as_u16().to_string(), description: text }),
        }
    }

    /// Runs `fut` with the configured timeout as an upper bound, covering credential refreshes too.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, GatewayError>
    where F: Future<Output = Result<T, GatewayError>> {
        tokio::time::timeout(self.config.timeout, fut).await.map_err(|_| GatewayError::Timeout)?
    }

    fn password_and_timestamp(&self) -> (String, String) {
        let timestamp = gateway_timestamp(Utc::now());
        let password = request_password(&self.config.shortcode, self.config.passkey.reveal(), &timestamp);
        (password, timestamp)
    }
}

impl PushPaymentProvider for GatewayApi {
    async fn initiate_push(&self, request: PushRequest) -> Result<PushAccepted, GatewayError> {
        let (password, timestamp) = self.password_and_timestamp();
        let phone = request.phone.to_string();
        let body = StkPushBody {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            transaction_type: self.config.transaction_type.clone(),
            amount: request.amount.value(),
            party_a: phone.clone(),
            party_b: self.config.shortcode.clone(),
            phone_number: phone,
            callback_url: self.config.callback_url.clone(),
            account_reference: request.account_reference.clone(),
            transaction_desc: request.description.clone(),
        };
        debug!("📡️ Initiating push payment of {} for {}", request.amount, request.account_reference);
        let response = self.bounded(self.rest_query::<StkPushResponse, _>(PUSH_PATH, &body)).await?;
        if response.response_code.trim() != "0" {
            warn!(
                "📡️ Push for {} was not accepted. {}: {}",
                request.account_reference, response.response_code, response.response_description
            );
            return Err(GatewayError::Rejected {
                code: response.response_code,
                description: response.response_description,
            });
        }
        info!("📡️ Push for {} accepted. Correlation id: {}", request.account_reference, response.checkout_request_id);
        Ok(PushAccepted {
            correlation_id: response.checkout_request_id,
            merchant_request_id: response.merchant_request_id,
            customer_message: response.customer_message,
        })
    }

    async fn query_status(&self, correlation_id: &str) -> Result<QueryOutcome, GatewayError> {
        let (password, timestamp) = self.password_and_timestamp();
        let body = StkQueryBody {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            checkout_request_id: correlation_id.to_string(),
        };
        debug!("📡️ Querying status of {correlation_id}");
        match self.bounded(self.rest_query::<StkQueryResponse, _>(QUERY_PATH, &body)).await {
            Ok(StkQueryResponse { result_code: Some(code), result_desc, response_code }) => {
                let result_code = ResultCode::from(code);
                let description = result_desc
                    .or_else(|| result_code.meaning().map(String::from))
                    .unwrap_or_else(|| format!("Result code {result_code}"));
                trace!("📡️ Query for {correlation_id} (response code {response_code:?}) returned {result_code}");
                Ok(QueryOutcome::Terminal(GatewayResult { result_code, description, receipt_ref: None }))
            },
            Ok(_) => {
                debug!("📡️ Query for {correlation_id} returned no result yet");
                Ok(QueryOutcome::StillProcessing)
            },
            Err(e) if e.is_still_processing() => {
                debug!("📡️ {correlation_id} is still being processed by the gateway");
                Ok(QueryOutcome::StillProcessing)
            },
            Err(e) => Err(e),
        }
    }
}
