//! Role checks for individual routes.
//!
//! The ACL middleware must sit inside the JWT middleware, since it reads the claims the latter leaves in the request
//! extensions. A request passes when its token carries every one of the route's required roles. Otherwise it is
//! answered with a 403.
use std::{pin::Pin, rc::Rc};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{
    auth::{JwtClaims, Role},
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let claims = req.extensions().get::<JwtClaims>().cloned();
            let err = match claims {
                Some(claims) if required_roles.iter().all(|role| claims.has_role(*role)) => {
                    return service.call(req).await.map(ServiceResponse::map_into_left_body);
                },
                Some(claims) => {
                    let roles = required_roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
                    info!("💻️ {} does not hold all of [{roles}] for {}", claims.sub, req.path());
                    ServerError::InsufficientPermissions(format!("This route requires the roles [{roles}]"))
                },
                None => {
                    warn!("💻️ No JWT claims found in request extensions for {}", req.path());
                    ServerError::AuthenticationError(AuthError::MissingToken)
                },
            };
            Ok(req.error_response(err).map_into_right_body())
        })
    }
}
