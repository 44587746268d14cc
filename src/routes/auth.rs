use crate::{
    auth::{require_authenticated, CurrentUser, LoginRequest, RegisterRequest},
    error::{AppError, Rejection},
    session::{FlashKind, Session},
    state::AppState,
    views::{redirect, render, render_with_status},
};
use actix_web::{get, post, web, HttpResponse, ResponseError};

#[get("/registerT")]
pub async fn register_form(session: Session, current: CurrentUser) -> HttpResponse {
    render(&session, current.user(), "register", ())
}

/// Register a new user
///
/// Creates the account and signs the new user in.
///
/// ## Responses:
/// - `303 See Other` to `/` with a success flash.
/// - The `register` page again with an error flash when the form is invalid (`422`)
///   or the username is taken (`409`).
#[post("/registerT")]
pub async fn register(
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<RegisterRequest>,
) -> Result<HttpResponse, Rejection> {
    match state.credentials.register(&form).await {
        Ok(user) => {
            session
                .login(state.credentials.serialize(&user))
                .map_err(|err| Rejection::new(err, "/registerT"))?;
            session.push_flash(
                FlashKind::Success,
                format!(
                    "Congratulation, you are signed up successfully as {}",
                    user.username
                ),
            );
            Ok(redirect("/"))
        }
        Err(err @ (AppError::ValidationFailure(_) | AppError::DuplicateUsername)) => {
            log::info!("Registration of {:?} refused: {}", form.username, err);
            session.push_flash(FlashKind::Error, err.flash_message());
            Ok(render_with_status(
                &session,
                None,
                "register",
                err.status_code(),
                (),
            ))
        }
        Err(err) => Err(Rejection::new(err, "/registerT")),
    }
}

#[get("/loginT")]
pub async fn login_form(session: Session, current: CurrentUser) -> HttpResponse {
    render(&session, current.user(), "login", ())
}

/// Login user
///
/// ## Responses:
/// - `303 See Other` to `/` on success.
/// - `303 See Other` back to `/loginT` with an error flash otherwise.
#[post("/loginT")]
pub async fn login(
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<LoginRequest>,
) -> Result<HttpResponse, Rejection> {
    let user = state
        .credentials
        .authenticate(&form.username, &form.password)
        .await
        .map_err(|err| Rejection::new(err, "/loginT"))?;

    log::info!("User {} signed in", user.username);
    session
        .login(state.credentials.serialize(&user))
        .map_err(|err| Rejection::new(err, "/loginT"))?;
    Ok(redirect("/"))
}

#[get("/logoutT")]
pub async fn logout(session: Session, current: CurrentUser) -> Result<HttpResponse, Rejection> {
    let user = require_authenticated(&current)?;

    log::info!("User {} signed out", user.username);
    session.logout();
    session.push_flash(FlashKind::Success, "You are logged out successfully!");
    Ok(redirect("/"))
}
