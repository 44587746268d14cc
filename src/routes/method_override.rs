use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use serde::Deserialize;
use std::rc::Rc;

#[derive(Debug, Deserialize)]
struct Override {
    #[serde(rename = "_method")]
    method: Option<String>,
}

/// Lets HTML forms reach `PUT` and `DELETE` routes.
///
/// A `POST` carrying `?_method=PUT` (or `DELETE`, any case) is routed
/// as that method. Every other request passes through untouched. Must wrap the
/// app so it runs before routing.
pub struct MethodOverride;

impl<S, B> Transform<S, ServiceRequest> for MethodOverride
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = MethodOverrideService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MethodOverrideService {
            service: Rc::new(service),
        }))
    }
}

pub struct MethodOverrideService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MethodOverrideService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        if let Some(method) = overridden_method(&req) {
            log::debug!("{} {} routed as {}", req.method(), req.path(), method);
            req.head_mut().method = method;
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move { service.call(req).await })
    }
}

fn overridden_method(req: &ServiceRequest) -> Option<Method> {
    if *req.method() != Method::POST {
        return None;
    }

    let query = web::Query::<Override>::from_query(req.query_string()).ok()?;
    match query.method.as_deref()?.to_ascii_uppercase().as_str() {
        "PUT" => Some(Method::PUT),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}
