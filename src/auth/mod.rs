pub mod credentials;
pub mod extractors;
pub mod guards;
pub mod password;

use lazy_static::lazy_static;
use serde::Deserialize;
use validator::{Validate, ValidationError};

// Re-export necessary items
pub use credentials::Credentials;
pub use extractors::CurrentUser;
pub use guards::{require_authenticated, require_ownership, Denied};
pub use password::{hash_password, verify_password, MAX_PASSWORD_BYTES};

lazy_static! {
    // Regex for username validation: alphanumeric, dots, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap();
}

/// Represents the registration form submission.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username for the new account.
    /// Must be between 3 and 32 characters: letters, digits, dots, underscores or hyphens.
    #[validate(
        length(min = 3, max = 32, message = "Username must be 3 to 32 characters"),
        regex(
            path = "USERNAME_REGEX",
            message = "Username may only contain letters, digits, dots, underscores or hyphens"
        )
    )]
    pub username: String,
    /// Password for the new account.
    /// Must be present and at most 72 bytes, the most bcrypt takes into account.
    #[validate(
        length(min = 1, message = "Password must not be empty"),
        custom = "validate_password_bytes"
    )]
    pub password: String,
}

fn validate_password_bytes(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        let mut error = ValidationError::new("password_too_long");
        error.message = Some("Password must be at most 72 bytes".into());
        return Err(error);
    }
    Ok(())
}

/// Represents the login form submission.
///
/// Not validated beyond presence: any mismatch is reported as invalid credentials.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}
