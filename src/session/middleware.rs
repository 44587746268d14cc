use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

use super::{FlashKind, Session};
use crate::error::{AppError, Rejection};

/// Turns a `Rejection` into an error flash, so the message is shown on the
/// page the visitor is redirected to.
///
/// Covers rejections from handlers and from extractors alike. Must be wrapped
/// inside the session layer so the flash is persisted.
pub struct RejectionFlash;

impl<S, B> Transform<S, ServiceRequest> for RejectionFlash
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RejectionFlashService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RejectionFlashService {
            service: Rc::new(service),
        }))
    }
}

pub struct RejectionFlashService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RejectionFlashService<S>
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
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let res = service.call(req).await?;

            if let Some(message) = rejection_flash(&res) {
                Session::of(res.request()).push_flash(FlashKind::Error, message);
            }

            Ok(res)
        })
    }
}

fn rejection_flash<B>(res: &ServiceResponse<B>) -> Option<String> {
    let rejection = res.response().error()?.as_error::<Rejection>()?;

    match rejection.error() {
        AppError::PersistenceFailure(_) | AppError::Internal(_) => log::error!(
            "{} {} failed: {}",
            res.request().method(),
            res.request().path(),
            rejection
        ),
        _ => log::info!(
            "{} {} rejected: {}",
            res.request().method(),
            res.request().path(),
            rejection
        ),
    }

    Some(rejection.error().flash_message())
}
