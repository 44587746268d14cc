use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::error::AppError;
use crate::models::User;
use crate::session::Session;
use crate::state::AppState;

/// The signed-in user, if any, restored from the session's identity.
///
/// Without `AppState` registered as app data the visitor is anonymous. An
/// identity that no longer resolves to a user is dropped from the session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = Session::of(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let Some(state) = state else {
                return Ok(CurrentUser(None));
            };
            let Some(identity) = session.identity() else {
                return Ok(CurrentUser(None));
            };

            match state.credentials.deserialize(&identity).await {
                Ok(user) => Ok(CurrentUser(Some(user))),
                Err(AppError::NotFound(_)) => {
                    log::warn!("Session refers to unknown user {}, signing out", identity);
                    session.logout();
                    Ok(CurrentUser(None))
                }
                Err(err) => Err(err.into()),
            }
        })
    }
}
