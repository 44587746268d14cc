//! Page models.
//!
//! Every rendered response is a JSON document naming the view, the signed-in
//! user and the flash messages drained from the session, plus view-specific data.

use actix_web::http::{header, StatusCode, Uri};
use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;

use crate::models::User;
use crate::session::{FlashKind, Session};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<'a, T: Serialize> {
    pub view: &'a str,
    pub current_user: Option<&'a User>,
    pub success: Vec<String>,
    pub error: Vec<String>,
    pub data: T,
}

pub fn render<T: Serialize>(
    session: &Session,
    current_user: Option<&User>,
    view: &str,
    data: T,
) -> HttpResponse {
    render_with_status(session, current_user, view, StatusCode::OK, data)
}

/// Renders a page with a non-200 status, e.g. a form shown again after a failed submission.
pub fn render_with_status<T: Serialize>(
    session: &Session,
    current_user: Option<&User>,
    view: &str,
    status: StatusCode,
    data: T,
) -> HttpResponse {
    let page = Page {
        view,
        current_user,
        success: session.drain_flash(FlashKind::Success),
        error: session.drain_flash(FlashKind::Error),
        data,
    };
    HttpResponse::build(status).json(page)
}

pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

/// Where "go back" leads: the referring page on this site, or `fallback`.
pub fn back(req: &HttpRequest, fallback: &str) -> String {
    let info = req.connection_info();
    req.headers()
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| local_path(referer, info.host()))
        .unwrap_or_else(|| fallback.to_string())
}

/// The path and query of `referer` when it points at `host`, or is a plain path.
fn local_path(referer: &str, host: &str) -> Option<String> {
    let uri: Uri = referer.parse().ok()?;
    if let Some(authority) = uri.authority() {
        if !authority.as_str().eq_ignore_ascii_case(host) {
            return None;
        }
    }
    let path = uri.path_and_query()?.as_str();
    (path.starts_with('/') && !path.starts_with("//")).then(|| path.to_string())
}
