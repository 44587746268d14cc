use crate::{
    auth::{require_authenticated, require_ownership, CurrentUser},
    error::{AppError, Rejection},
    models::{Author, NewToy, Toy, User},
    session::{FlashKind, Session},
    state::AppState,
    store::toy_not_found,
    upload::read_toy_form,
    views::{back, redirect, render, render_with_status},
};
use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, ResponseError};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize)]
struct ToyList<'a> {
    toys: &'a [Toy],
}

#[derive(Serialize)]
struct ToyDetail<'a> {
    toy: &'a Toy,
}

fn detail_path(toy_id: Uuid) -> String {
    format!("/toyT/{}", toy_id)
}

/// An id that cannot name a toy is reported like an unknown one.
fn parse_toy_id(raw: &str) -> Result<Uuid, Rejection> {
    Uuid::parse_str(raw).map_err(|_| Rejection::new(toy_not_found(), "/browseT"))
}

/// Form for a new listing. Requires a signed-in user.
#[get("/postT")]
pub async fn new_toy_form(
    session: Session,
    current: CurrentUser,
) -> Result<HttpResponse, Rejection> {
    let user = require_authenticated(&current)?;
    Ok(render(&session, Some(user), "post", ()))
}

/// Creates a new listing for the signed-in user.
///
/// ## Request Body:
/// `multipart/form-data` with `toyname`, `rentprice`, `saleprice` and the image in `myImage`.
///
/// ## Responses:
/// - `303 See Other` to `/browseT` once the listing is stored.
/// - The `post` page again with an error flash when the form or image is rejected.
///   No listing is created and no image is kept.
/// - `303 See Other` back with an error flash if the listing cannot be stored.
#[post("/postT")]
pub async fn create_toy(
    state: web::Data<AppState>,
    session: Session,
    current: CurrentUser,
    req: HttpRequest,
    payload: Multipart,
) -> Result<HttpResponse, Rejection> {
    let user = require_authenticated(&current)?;

    let new_toy = match read_new_toy(&state, payload, user).await {
        Ok(new_toy) => new_toy,
        Err(err) => {
            log::info!("Toy submission by {} refused: {}", user.username, err);
            session.push_flash(FlashKind::Error, err.flash_message());
            return Ok(render_with_status(
                &session,
                Some(user),
                "post",
                err.status_code(),
                (),
            ));
        }
    };

    let image_src = new_toy.image_src.clone();
    match state.toys.create(new_toy).await {
        Ok(toy) => {
            log::info!("User {} posted toy {} ({})", user.username, toy.name, toy.id);
            Ok(redirect("/browseT"))
        }
        Err(err) => {
            if let Err(cleanup) = state.images.remove(&image_src).await {
                log::warn!("Could not discard image {}: {}", image_src, cleanup);
            }
            Err(Rejection::new(err, back(&req, "/postT")))
        }
    }
}

// The image is only written once the text fields have passed.
async fn read_new_toy(
    state: &AppState,
    payload: Multipart,
    user: &User,
) -> Result<NewToy, AppError> {
    let (form, image) = read_toy_form(payload, state.images.max_bytes()).await?;
    form.validate()?;
    let fields = form.require_all()?;
    let image_src = state.images.store(image).await?;
    Ok(fields.into_new_toy(image_src, Author::from(user)))
}

/// Lists every toy in creation order.
#[get("/browseT")]
pub async fn browse(
    state: web::Data<AppState>,
    session: Session,
    current: CurrentUser,
    req: HttpRequest,
) -> Result<HttpResponse, Rejection> {
    let toys = state
        .toys
        .find_all()
        .await
        .map_err(|err| Rejection::new(err, back(&req, "/")))?;

    Ok(render(
        &session,
        current.user(),
        "browse",
        ToyList { toys: &toys },
    ))
}

#[get("/toyT/{id}")]
pub async fn show_toy(
    state: web::Data<AppState>,
    session: Session,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, Rejection> {
    let toy_id = parse_toy_id(&path)?;
    let toy = state
        .toys
        .find_by_id(toy_id)
        .await
        .map_err(|err| Rejection::new(err, "/browseT"))?;

    Ok(render(
        &session,
        current.user(),
        "detail",
        ToyDetail { toy: &toy },
    ))
}

/// Edit form, only for the toy's author.
#[get("/toyT/{id}/editT")]
pub async fn edit_toy_form(
    state: web::Data<AppState>,
    session: Session,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, Rejection> {
    require_authenticated(&current)?;
    let toy_id = parse_toy_id(&path)?;
    let toy = require_ownership(state.toys.as_ref(), &current, toy_id).await?;
    Ok(render(
        &session,
        current.user(),
        "edit",
        ToyDetail { toy: &toy },
    ))
}

/// Updates a toy. Only its author may do so.
///
/// Fields missing from the submission keep their stored value. A new image in
/// `myImage` replaces the old one: the new file is stored first, the listing
/// updated, and the old file removed afterwards. A failed removal is reported
/// as an error flash but does not undo the update.
///
/// ## Responses:
/// - `303 See Other` to the toy's detail page.
/// - `303 See Other` to the edit form with an error flash if the submission is rejected.
#[put("/toyT/{id}")]
pub async fn update_toy(
    state: web::Data<AppState>,
    session: Session,
    current: CurrentUser,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, Rejection> {
    require_authenticated(&current)?;
    let toy_id = parse_toy_id(&path)?;
    let toy = require_ownership(state.toys.as_ref(), &current, toy_id).await?;
    let edit_path = format!("{}/editT", detail_path(toy_id));

    let (form, image) = read_toy_form(payload, state.images.max_bytes())
        .await
        .map_err(|err| Rejection::new(err, edit_path.as_str()))?;
    form.validate()
        .map_err(|err| Rejection::new(AppError::from(err), edit_path.as_str()))?;

    let mut changes = form.into_changes();
    if image.is_some() {
        let image_src = state
            .images
            .store(image)
            .await
            .map_err(|err| Rejection::new(err, edit_path.as_str()))?;
        changes.image_src = Some(image_src);
    }
    let new_image = changes.image_src.clone();

    let updated = match state.toys.update(toy_id, changes).await {
        Ok(updated) => updated,
        Err(err) => {
            if let Some(new_image) = new_image {
                if let Err(cleanup) = state.images.remove(&new_image).await {
                    log::warn!("Could not discard image {}: {}", new_image, cleanup);
                }
            }
            return Err(Rejection::new(err, edit_path));
        }
    };

    if updated.image_src != toy.image_src {
        if let Err(err) = state.images.remove(&toy.image_src).await {
            log::error!("Failed to remove old image {}: {}", toy.image_src, err);
            session.push_flash(FlashKind::Error, err.flash_message());
        }
    }

    log::info!("Toy {} updated", toy_id);
    Ok(redirect(detail_path(toy_id)))
}

/// Deletes a toy and its image. Only its author may do so.
#[delete("/toyT/{id}")]
pub async fn delete_toy(
    state: web::Data<AppState>,
    session: Session,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, Rejection> {
    require_authenticated(&current)?;
    let toy_id = parse_toy_id(&path)?;
    let toy = require_ownership(state.toys.as_ref(), &current, toy_id).await?;

    if let Err(err) = state.images.remove(&toy.image_src).await {
        log::error!("Failed to remove image {}: {}", toy.image_src, err);
        session.push_flash(FlashKind::Error, err.flash_message());
    }

    state
        .toys
        .delete(toy_id)
        .await
        .map_err(|err| Rejection::new(err, detail_path(toy_id)))?;

    log::info!("Toy {} deleted", toy_id);
    session.push_flash(FlashKind::Success, "Toy is deleted successfully!");
    Ok(redirect("/browseT"))
}
