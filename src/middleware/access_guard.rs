/// Access guard middleware
///
/// Validates the bearer token on every protected request and injects the
/// resulting `Principal` into request extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{authenticate, SessionManager};

/// Guard for protecting routes.
///
/// Must be applied to every scope that requires authentication. Extracts
/// the token from the Authorization header, verifies it, and confirms the
/// subject still has a live session.
pub struct AccessGuard {
    manager: SessionManager,
}

impl AccessGuard {
    pub fn new(manager: SessionManager) -> Self {
        Self { manager }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AccessGuardService {
            service: Rc::new(service),
            manager: self.manager.clone(),
        }))
    }
}

pub struct AccessGuardService<S> {
    service: Rc<S>,
    manager: SessionManager,
}

impl<S, B> Service<ServiceRequest> for AccessGuardService<S>
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
        // Extract Authorization header
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.to_string());

        let manager = self.manager.clone();
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let token = match bearer {
                Some(token) => token,
                None => {
                    tracing::warn!("missing or invalid Authorization header");
                    return Err(unauthorized_response());
                }
            };

            match authenticate(manager.pool(), manager.codec(), &token).await {
                Ok(principal) => {
                    tracing::debug!(
                        user_id = %principal.user_id,
                        username = %principal.username,
                        "bearer token accepted"
                    );
                    req.extensions_mut().insert(principal);
                    service.call(req).await
                }
                Err(e) => {
                    tracing::warn!("bearer token rejected: {}", e);
                    Err(unauthorized_response())
                }
            }
        })
    }
}

fn unauthorized_response() -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "error": "authentication failed",
        "code": "AUTHENTICATION_FAILED"
    }));
    actix_web::error::InternalError::from_response("Unauthorized", response).into()
}
