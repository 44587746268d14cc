use std::sync::Arc;

use crate::auth::Credentials;
use crate::store::ToyStore;
use crate::upload::ImageStore;

/// Shared services handed to every handler through `web::Data<AppState>`.
pub struct AppState {
    pub credentials: Credentials,
    pub toys: Arc<dyn ToyStore>,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(credentials: Credentials, toys: Arc<dyn ToyStore>, images: ImageStore) -> Self {
        Self {
            credentials,
            toys,
            images,
        }
    }
}
