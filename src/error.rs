//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application,
//! and `Rejection`, the error a route handler returns when a request has to be bounced
//! back to another page.
//!
//! `AppError` implements `actix_web::error::ResponseError` so that an error escaping a
//! handler still becomes a sensible HTTP response. Each variant also knows the short,
//! user-facing text that is shown to the visitor as a flash message; internal details
//! (database messages, I/O errors) stay in the logs.
//!
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `bcrypt::BcryptError`, `std::io::Error` and `actix_multipart::MultipartError`
//! allow easy conversion using the `?` operator.

use actix_web::{
    error::ResponseError,
    http::{header, StatusCode},
    HttpResponse,
};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Submitted data failed boundary validation (HTTP 422).
    ValidationFailure(String),
    /// A user with the requested username already exists (HTTP 409).
    DuplicateUsername,
    /// Login failed. Deliberately carries no detail about which part was wrong (HTTP 401).
    InvalidCredentials,
    /// The operation requires a signed-in user (HTTP 401).
    Unauthenticated,
    /// The signed-in user may not touch the resource (HTTP 403).
    Forbidden,
    /// The named resource does not exist (HTTP 404).
    NotFound(String),
    /// The uploaded file is not one of the accepted image types (HTTP 415).
    UnsupportedFileType,
    /// The form was submitted without the required image (HTTP 422).
    MissingFile,
    /// The uploaded file exceeds the configured size limit (HTTP 413).
    PayloadTooLarge,
    /// The database or the asset filesystem failed (HTTP 500).
    PersistenceFailure(String),
    /// Any other unexpected server-side error (HTTP 500).
    Internal(String),
}

impl AppError {
    /// Text shown to the visitor in an error flash message.
    pub fn flash_message(&self) -> String {
        match self {
            AppError::ValidationFailure(msg) => msg.clone(),
            AppError::DuplicateUsername => {
                "A user with the given username is already registered".into()
            }
            AppError::InvalidCredentials => "Password or username is incorrect".into(),
            AppError::Unauthenticated => "You must sign in to do that!".into(),
            AppError::Forbidden => "You do not have permission to do that!".into(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::UnsupportedFileType => "Error: Upload Image Only".into(),
            AppError::MissingFile => "Please attach an image of your toy".into(),
            AppError::PayloadTooLarge => "The image is too large".into(),
            AppError::PersistenceFailure(_) | AppError::Internal(_) => {
                "Something went wrong, please try again".into()
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::ValidationFailure(msg) => write!(f, "Validation Failure: {}", msg),
            AppError::DuplicateUsername => write!(f, "Duplicate Username"),
            AppError::InvalidCredentials => write!(f, "Invalid Credentials"),
            AppError::Unauthenticated => write!(f, "Unauthenticated"),
            AppError::Forbidden => write!(f, "Forbidden"),
            AppError::NotFound(what) => write!(f, "Not Found: {}", what),
            AppError::UnsupportedFileType => write!(f, "Unsupported File Type"),
            AppError::MissingFile => write!(f, "Missing File"),
            AppError::PayloadTooLarge => write!(f, "Payload Too Large"),
            AppError::PersistenceFailure(msg) => write!(f, "Persistence Failure: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// Only reached when an error escapes a handler without being turned into a
/// redirect, e.g. from an extractor. The body never contains internal messages.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationFailure(_) | AppError::MissingFile => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::DuplicateUsername => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnsupportedFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::PersistenceFailure(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.flash_message()
        }))
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` maps to `NotFound`, everything else is a persistence failure.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record".into()),
            _ => AppError::PersistenceFailure(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationFailure(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(format!("Password hashing failed: {}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> AppError {
        AppError::PersistenceFailure(error.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> AppError {
        AppError::ValidationFailure(format!("Malformed form submission: {}", error))
    }
}

/// A handler-level failure: the visitor is redirected to `location` and the
/// error's flash text is queued for the next page.
///
/// `RejectionFlash` recognises a `Rejection` on the way out and turns it into
/// the flash message, so handlers can simply use `?`.
#[derive(Debug)]
pub struct Rejection {
    error: AppError,
    location: String,
}

impl Rejection {
    pub fn new(error: AppError, location: impl Into<String>) -> Self {
        Self {
            error,
            location: location.into(),
        }
    }

    pub fn error(&self) -> &AppError {
        &self.error
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (redirecting to {})", self.error, self.location)
    }
}

impl ResponseError for Rejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::SEE_OTHER
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::SeeOther()
            .insert_header((header::LOCATION, self.location.as_str()))
            .finish()
    }
}
