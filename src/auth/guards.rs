//! Access guards shared by the protected routes.
//!
//! Each guard either hands back what the handler needs or a `Denied` reason.
//! `Denied` converts into a `Rejection`, so handlers compose guards with `?`.

use uuid::Uuid;

use super::CurrentUser;
use crate::error::{AppError, Rejection};
use crate::models::{Toy, User};
use crate::store::ToyStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denied {
    /// Nobody is signed in. The visitor is sent to the login page.
    Unauthenticated,
    /// The toy is missing or belongs to someone else. The visitor is sent to its detail page.
    Forbidden { toy_id: Uuid },
}

impl From<Denied> for Rejection {
    fn from(denied: Denied) -> Self {
        match denied {
            Denied::Unauthenticated => Rejection::new(AppError::Unauthenticated, "/loginT"),
            Denied::Forbidden { toy_id } => {
                Rejection::new(AppError::Forbidden, format!("/toyT/{}", toy_id))
            }
        }
    }
}

pub fn require_authenticated(current: &CurrentUser) -> Result<&User, Denied> {
    current.user().ok_or(Denied::Unauthenticated)
}

/// Compares the signed-in user with a resource's recorded author.
pub fn check_author(user: &User, toy: &Toy) -> Result<(), Denied> {
    if toy.author.id == user.id {
        Ok(())
    } else {
        Err(Denied::Forbidden { toy_id: toy.id })
    }
}

/// Loads a toy for modification by its author.
///
/// Anonymous callers are denied as unauthenticated. A missing toy, a failed
/// lookup and a foreign toy are all denied as forbidden.
pub async fn require_ownership(
    toys: &dyn ToyStore,
    current: &CurrentUser,
    toy_id: Uuid,
) -> Result<Toy, Denied> {
    let user = require_authenticated(current)?;

    let toy = match toys.find_by_id(toy_id).await {
        Ok(toy) => toy,
        Err(AppError::NotFound(_)) => return Err(Denied::Forbidden { toy_id }),
        Err(err) => {
            log::error!("Ownership check for toy {} failed: {}", toy_id, err);
            return Err(Denied::Forbidden { toy_id });
        }
    };

    check_author(user, &toy).map_err(|denied| {
        log::info!("User {} is not the author of toy {}", user.id, toy_id);
        denied
    })?;

    Ok(toy)
}
