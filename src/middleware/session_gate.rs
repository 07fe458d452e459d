/// Session Gate Middleware
///
/// Resolves the `Authorization` header of every request into a
/// [`RequestIdentity`] and stores it in the request extensions. The gate
/// never rejects a request for a bad or missing token; handlers that need a
/// caller take `Authenticated` or `AdminPrincipal` and reject there.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{bearer_token, AuthenticationGate};
use crate::error::AppError;

pub struct SessionGate {
    gate: AuthenticationGate,
}

impl SessionGate {
    pub fn new(gate: AuthenticationGate) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionGateService {
            service: Rc::new(service),
            gate: self.gate.clone(),
        }))
    }
}

pub struct SessionGateService<S> {
    service: Rc<S>,
    gate: AuthenticationGate,
}

impl<S, B> Service<ServiceRequest> for SessionGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_owned);

        let service = self.service.clone();
        let gate = self.gate.clone();

        Box::pin(async move {
            let identity = match gate.authenticate(token.as_deref()).await {
                Ok(identity) => identity,
                Err(e) => {
                    tracing::error!(error = %e, path = %req.path(), "Session store unavailable");
                    return Err(Error::from(AppError::from(e)));
                }
            };

            req.extensions_mut().insert(identity);
            service.call(req).await
        })
    }
}
