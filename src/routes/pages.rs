use actix_web::{get, HttpResponse};

use crate::auth::CurrentUser;
use crate::session::Session;
use crate::views::render;

/// Landing page.
#[get("/")]
pub async fn home(session: Session, current: CurrentUser) -> HttpResponse {
    render(&session, current.user(), "home", ())
}
