pub mod auth;
pub mod method_override;
pub mod pages;
pub mod toys;

use actix_web::{error::UrlencodedError, web, HttpRequest};

use crate::error::{AppError, Rejection};

pub use method_override::MethodOverride;

/// A form that cannot be decoded sends the visitor back to the page that posted it.
fn form_rejection(err: UrlencodedError, req: &HttpRequest) -> actix_web::Error {
    log::info!("Unreadable form posted to {}: {}", req.path(), err);
    Rejection::new(
        AppError::ValidationFailure("Please fill in every field".into()),
        req.path(),
    )
    .into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(form_rejection))
        .service(pages::home)
        .service(auth::register_form)
        .service(auth::register)
        .service(auth::login_form)
        .service(auth::login)
        .service(auth::logout)
        .service(toys::new_toy_form)
        .service(toys::create_toy)
        .service(toys::browse)
        .service(toys::edit_toy_form)
        .service(toys::show_toy)
        .service(toys::update_toy)
        .service(toys::delete_toy);
}
