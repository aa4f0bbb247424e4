use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{
    dev::{HttpServiceFactory, Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    web::ServiceConfig,
    App,
    HttpResponse,
    HttpServer,
};
use futures::future::{ok, FutureExt};
use log::*;
use pesa_engine::{
    events::{EventHandlers, EventHooks, EventNotifier, NotificationEvent},
    CallbackQueue,
    OrderApi,
    PaymentFlowApi,
    ReconciliationApi,
    SqliteDatabase,
    DEFAULT_CALLBACK_QUEUE_SIZE,
};
use pesa_gateway::{GatewayApi, PushPaymentProvider};

use crate::{
    auth::TokenVerifier,
    callback_worker::start_callback_worker,
    config::{ServerConfig, ServerOptions},
    data_objects::CallbackAck,
    errors::ServerError,
    helpers::{get_remote_ip, is_whitelisted},
    middleware::JwtAuthFactory,
    reconcile_worker::start_reconcile_worker,
    routes::{
        health,
        payment_callback,
        AdminFinalizeRoute,
        AdminPaymentRoute,
        CreateOrderRoute,
        DeleteOrderRoute,
        InitiatePaymentRoute,
        MyOrdersRoute,
        MyPaymentsRoute,
        OrderByIdRoute,
        PaymentApi,
        PaymentStatusRoute,
        ReconcileRoute,
        ReportFailureRoute,
        UpdateOrderStatusRoute,
    },
    sweep_worker::start_sweep_worker,
};

const EVENT_BUFFER_SIZE: usize = 256;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = GatewayApi::new(config.gateway.clone())?;
    let notifier = start_notification_hooks();
    let api = Arc::new(PaymentFlowApi::new(db.clone(), gateway, notifier, config.flow.clone()));
    let (queue, receiver) = CallbackQueue::new(DEFAULT_CALLBACK_QUEUE_SIZE);
    let reconciler = ReconciliationApi::new(db.clone());
    let orders = OrderApi::new(db, config.flow.shipping_fee);
    start_callback_worker(Arc::clone(&api), receiver, config.flow.retry);
    start_sweep_worker(Arc::clone(&api), config.sweep_interval, config.stale_payment_age);
    start_reconcile_worker(reconciler.clone(), config.reconcile_interval);
    let srv = create_server_instance(config, web::Data::from(api), orders, queue, reconciler)?;
    srv.await?;
    Ok(())
}

/// Registers a hook that hands notifications to connected clients. Delivery is a log line for now, and the hook is
/// where a push transport would plug in.
fn start_notification_hooks() -> EventNotifier {
    let mut hooks = EventHooks::default();
    hooks.on_notification(|event: NotificationEvent| {
        Box::pin(async move {
            let body = serde_json::to_string(&event.notification).unwrap_or_default();
            info!("📬️ Notification for {}: {body}", event.user_id);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let notifier = EventNotifier::new(handlers.producers());
    handlers.start_handlers();
    notifier
}

pub fn create_server_instance<G>(
    config: ServerConfig,
    payments: web::Data<PaymentApi<G>>,
    orders: OrderApi<SqliteDatabase>,
    queue: CallbackQueue,
    reconciler: ReconciliationApi<SqliteDatabase>,
) -> Result<Server, ServerError>
where
    G: PushPaymentProvider + Send + Sync + 'static,
{
    let verifier = Arc::new(TokenVerifier::new(&config.auth));
    let options = ServerOptions::from_config(&config);
    let orders = web::Data::new(orders);
    let queue = web::Data::new(queue);
    let reconciler = web::Data::new(reconciler);
    let srv = HttpServer::new(move || {
        let verifier = Arc::clone(&verifier);
        let options = options.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pesa::access_log"))
            .app_data(payments.clone())
            .app_data(orders.clone())
            .app_data(queue.clone())
            .app_data(reconciler.clone())
            .configure(|cfg| configure_routes::<G>(cfg, verifier, options))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Server listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Registers every route. The caller supplies the flow APIs and the callback queue as app data.
pub fn configure_routes<G>(cfg: &mut ServiceConfig, verifier: Arc<TokenVerifier>, options: ServerOptions)
where G: PushPaymentProvider + 'static {
    let api_scope = web::scope("/api")
        .wrap(JwtAuthFactory::new(verifier))
        .service(InitiatePaymentRoute::<G>::new())
        .service(MyPaymentsRoute::<G>::new())
        .service(ReportFailureRoute::<G>::new())
        .service(MyOrdersRoute::new())
        .service(ReconcileRoute::new())
        .service(AdminPaymentRoute::<G>::new())
        .service(AdminFinalizeRoute::<G>::new())
        .service(CreateOrderRoute::new())
        .service(OrderByIdRoute::new())
        .service(UpdateOrderStatusRoute::new())
        .service(DeleteOrderRoute::new());
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into()),
    )
    .service(health)
    .service(callback_service(options))
    .service(PaymentStatusRoute::<G>::new())
    .service(api_scope);
}

/// The gateway callback route, behind the optional IP whitelist. Callbacks from peers that are not whitelisted are
/// acknowledged like any other so that the gateway stops retrying, but their payload is dropped unread.
fn callback_service(options: ServerOptions) -> impl HttpServiceFactory {
    web::resource("/payments/callback")
        .wrap_fn(move |req, srv| {
            let peer_ip = get_remote_ip(req.request(), options.use_x_forwarded_for, options.use_forwarded);
            if is_whitelisted(peer_ip, options.callback_whitelist.as_deref()) {
                srv.call(req).boxed_local()
            } else {
                warn!("💻️ Dropped a payment callback from {peer_ip:?}, which is not whitelisted");
                ok(req.into_response(HttpResponse::Ok().json(CallbackAck::accepted()))).boxed_local()
            }
        })
        .route(web::post().to(payment_callback))
}
