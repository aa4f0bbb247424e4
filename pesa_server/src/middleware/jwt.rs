//! Bearer token middleware.
//!
//! Wrap a scope with [`JwtAuthFactory`] to require a valid access token on every route in it. Verified claims are
//! placed in the request extensions, where the [`crate::auth::JwtClaims`] extractor and the ACL middleware find them.
//! Requests without a valid token are answered with a 401 (or a 400 for a token that is not a JWT at all) and never
//! reach the handler.
use std::{pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{
    auth::{bearer_token, TokenVerifier},
    errors::{AuthError, ServerError},
};

pub struct JwtAuthFactory {
    verifier: Arc<TokenVerifier>,
}

impl JwtAuthFactory {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtAuthService { verifier: Arc::clone(&self.verifier), service: Rc::new(service) })
    }
}

pub struct JwtAuthService<S> {
    verifier: Arc<TokenVerifier>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let verified = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AuthError::MissingToken)
            .and_then(|token| self.verifier.verify(token));
        Box::pin(async move {
            match verified {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                },
                Err(e) => {
                    debug!("💻️ Rejecting request to {}. {e}", req.path());
                    let res = req.error_response(ServerError::AuthenticationError(e));
                    Ok(res.map_into_right_body())
                },
            }
        })
    }
}
