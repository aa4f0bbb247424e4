//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database calls, gateway
//! calls) must be awaited, never blocked on.
//!
//! The gateway callback route does no work itself. It hands the parsed payload to the callback worker through the
//! [`CallbackQueue`] and acknowledges straight away, because the gateway does not wait long for an answer.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use pesa_engine::{
    events::EventNotifier,
    CallbackQueue,
    OrderApi,
    PaymentFlowApi,
    ReconciliationApi,
    SqliteDatabase,
};
use pesa_gateway::{parse_callback, PushPaymentProvider};

use crate::{
    auth::{JwtClaims, Role},
    data_objects::{
        CallbackAck,
        FinalizeResponse,
        InitiatePaymentRequest,
        InitiatePaymentResponse,
        JsonResponse,
        ManualOrderRequest,
        PaymentStatusResponse,
        ReconcileParams,
        ReportFailureRequest,
        UpdateOrderStatusRequest,
    },
    errors::ServerError,
};

/// The payment flow as the server runs it. Only the gateway varies, so that tests can substitute a mock.
pub type PaymentApi<G> = PaymentFlowApi<SqliteDatabase, G, EventNotifier>;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
            impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $bound:ident) => {
        paste::paste! { pub struct [<$name:camel Route>]<G>(core::marker::PhantomData<fn() -> G>);}
        paste::paste! { impl<G> [<$name:camel Route>]<G> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> G>)
            }
        }}
        paste::paste! { impl<G> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<G>
        where
            G: $bound + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<G>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $bound:ident where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<G>(core::marker::PhantomData<fn() -> G>);}
        paste::paste! { impl<G> [<$name:camel Route>]<G> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> G>)
            }
        }}
        paste::paste! { impl<G> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<G>
        where
            G: $bound + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<G>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Public payment routes  ---------------------------------------------
route!(payment_status => Get "/payments/{correlation_id}/status" impl PushPaymentProvider);
/// The client polls this route after starting a payment. The correlation id acts as a capability, so no token is
/// needed. Young pending payments are answered from the store; older ones are checked with the gateway.
pub async fn payment_status<G: PushPaymentProvider>(
    path: web::Path<String>,
    api: web::Data<PaymentApi<G>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ Status request for payment [{id}]");
    let payment = api.payment_status(&id).await?;
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(payment)))
}

/// Gateway result callbacks. The answer is always the gateway's "accepted" acknowledgement, even for payloads we
/// could not read, since the gateway would otherwise keep retrying a payload that will never parse.
pub async fn payment_callback(body: web::Bytes, queue: web::Data<CallbackQueue>) -> HttpResponse {
    match parse_callback(&body) {
        Ok(payload) => {
            debug!("💻️ Callback received for payment [{}]", payload.correlation_id);
            if !queue.try_enqueue(payload) {
                error!("💻️ The callback could not be queued. The sweeper will settle the payment later.");
            }
        },
        Err(e) => warn!("💻️ Dropping malformed callback. {e}. Body: {}", String::from_utf8_lossy(&body)),
    }
    HttpResponse::Ok().json(CallbackAck::accepted())
}

//----------------------------------------------   Payer routes  -----------------------------------------------------
route!(initiate_payment => Post "/payments" impl PushPaymentProvider where requires [Role::User]);
pub async fn initiate_payment<G: PushPaymentProvider>(
    claims: JwtClaims,
    body: web::Json<InitiatePaymentRequest>,
    api: web::Data<PaymentApi<G>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ Payment request from {} for order {}", claims.sub, body.order_ref);
    let payment = api.initiate_payment(&claims.sub, body.into_inner().into()).await?;
    info!("💻️ Payment [{}] started for {}", payment.id, claims.sub);
    Ok(HttpResponse::Ok().json(InitiatePaymentResponse::new(&payment)))
}

route!(my_payments => Get "/payments" impl PushPaymentProvider where requires [Role::User]);
pub async fn my_payments<G: PushPaymentProvider>(
    claims: JwtClaims,
    api: web::Data<PaymentApi<G>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Fetching payment history for {}", claims.sub);
    let payments = api.payments_for_payer(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(payments))
}

route!(report_failure => Post "/payments/{correlation_id}/report-failure" impl PushPaymentProvider);
/// Lets the customer (or an admin) abandon a pending payment, for example after dismissing the prompt on their phone.
pub async fn report_failure<G: PushPaymentProvider>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: Option<web::Json<ReportFailureRequest>>,
    api: web::Data<PaymentApi<G>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let reason = body.and_then(|b| b.into_inner().reason);
    debug!("💻️ {} reports that payment [{id}] failed", claims.sub);
    let payment = api.report_failure(&id, &claims.sub, claims.is_admin(), reason).await?;
    Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(payment)))
}

route!(my_orders => Get "/orders" requires [Role::User]);
pub async fn my_orders(
    claims: JwtClaims,
    api: web::Data<OrderApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Fetching orders for {}", claims.sub);
    let orders = api.orders_for_payer(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Admin routes  -----------------------------------------------------
route!(reconcile => Get "/admin/reconcile" requires [Role::ReadAll]);
pub async fn reconcile(
    claims: JwtClaims,
    params: web::Query<ReconcileParams>,
    api: web::Data<ReconciliationApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ {} requested reconciliation for {}", claims.sub, params.date);
    let report = api.reconcile(params.date).await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(admin_payment => Get "/admin/payments/{correlation_id}" impl PushPaymentProvider where requires [Role::ReadAll]);
pub async fn admin_payment<G: PushPaymentProvider>(
    path: web::Path<String>,
    api: web::Data<PaymentApi<G>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let payment = api
        .fetch_payment(&id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No payment with id {id}")))?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(admin_finalize => Post "/admin/payments/{correlation_id}/finalize" impl PushPaymentProvider where requires [Role::Write]);
/// Re-runs order creation for a completed payment that has no order, usually after reconciliation flagged it.
pub async fn admin_finalize<G: PushPaymentProvider>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<PaymentApi<G>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ {} is finalizing payment [{id}] by hand", claims.sub);
    let result = api.finalize_by_id(&id).await?;
    Ok(HttpResponse::Ok().json(FinalizeResponse::from(result)))
}

route!(create_order => Post "/admin/orders" requires [Role::Write]);
pub async fn create_order(
    claims: JwtClaims,
    body: web::Json<ManualOrderRequest>,
    api: web::Data<OrderApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ {} is creating manual order {}", claims.sub, body.order_ref);
    let order = api.create_manual_order(body.into_inner().into()).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(order_by_id => Get "/admin/orders/{id}" requires [Role::ReadAll]);
pub async fn order_by_id(
    path: web::Path<i64>,
    api: web::Data<OrderApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.fetch_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Patch "/admin/orders/{id}/status" requires [Role::Write]);
pub async fn update_order_status(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<UpdateOrderStatusRequest>,
    api: web::Data<OrderApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ {} is moving order #{id} to {}", claims.sub, body.status);
    let order = api.update_status(id, body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(delete_order => Delete "/admin/orders/{id}" requires [Role::Write]);
pub async fn delete_order(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    warn!("💻️ {} is deleting order #{id}", claims.sub);
    api.delete_order(id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order #{id} deleted"))))
}
