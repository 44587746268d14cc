//! Image uploads for toy listings.
//!
//! `read_toy_form` splits a multipart submission into the text fields and the
//! optional `myImage` file. `ImageStore` validates the file and writes it
//! below `<public_dir>/uploads`, returning the path the listing records.

use actix_multipart::Multipart;
use futures::StreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ToyForm;

/// Name of the file input on the post and edit forms.
pub const IMAGE_FIELD: &str = "myImage";

const UPLOADS_DIR: &str = "uploads";
// Text fields are short; anything bigger is not a genuine form submission.
const MAX_TEXT_FIELD_BYTES: usize = 4 * 1024;

lazy_static! {
    static ref IMAGE_EXTENSION: Regex = Regex::new(r"^(jpeg|jpg|png|gif)$").unwrap();
    static ref IMAGE_MIME: Regex = Regex::new(r"^image/(jpeg|jpg|png|gif)$").unwrap();
}

/// A file part as the browser declared it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Lowercased extension of the declared filename, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Reads a toy submission. An empty file part, which browsers send when no file
/// was chosen, counts as no file.
pub async fn read_toy_form(
    mut payload: Multipart,
    max_file_bytes: usize,
) -> Result<(ToyForm, Option<UploadedFile>), AppError> {
    let mut form = ToyForm::default();
    let mut image = None;

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGE_FIELD {
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .unwrap_or_default()
                .to_string();
            let content_type = field
                .content_type()
                .map(|mime| mime.essence_str().to_string())
                .unwrap_or_default();

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                if bytes.len() + chunk.len() > max_file_bytes {
                    return Err(AppError::PayloadTooLarge);
                }
                bytes.extend_from_slice(&chunk);
            }

            if !filename.is_empty() || !bytes.is_empty() {
                image = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
        } else {
            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                    return Err(AppError::ValidationFailure(format!("{} is too long", name)));
                }
                bytes.extend_from_slice(&chunk);
            }
            let value = String::from_utf8(bytes)
                .map_err(|_| AppError::ValidationFailure(format!("{} is not valid text", name)))?;
            form.set(&name, value);
        }
    }

    Ok((form, image))
}

/// Accepts a file only when both the extension and the MIME type name an allowed image type.
pub fn check_image_type(file: &UploadedFile) -> Result<(), AppError> {
    let extension_ok = file
        .extension()
        .map(|ext| IMAGE_EXTENSION.is_match(&ext))
        .unwrap_or(false);
    let mime_ok = IMAGE_MIME.is_match(&file.content_type.to_ascii_lowercase());

    if extension_ok && mime_ok {
        Ok(())
    } else {
        Err(AppError::UnsupportedFileType)
    }
}

/// Writes listing images below the public asset root.
#[derive(Debug, Clone)]
pub struct ImageStore {
    public_dir: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(public_dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            public_dir: public_dir.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validates and stores an uploaded image.
    ///
    /// # Returns
    /// The path relative to the public root, e.g. `uploads/1700000000000-3f2a9c1e.png`.
    /// `AppError::MissingFile` when no file was attached, `AppError::UnsupportedFileType`
    /// for anything but jpeg/jpg/png/gif, `AppError::PersistenceFailure` if the write fails.
    pub async fn store(&self, file: Option<UploadedFile>) -> Result<String, AppError> {
        let file = file.ok_or(AppError::MissingFile)?;
        check_image_type(&file)?;
        if file.bytes.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge);
        }

        let extension = file.extension().unwrap_or_default();
        let filename = format!(
            "{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8],
            extension
        );

        let dir = self.public_dir.join(UPLOADS_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&filename), &file.bytes).await?;

        let image_src = format!("{}/{}", UPLOADS_DIR, filename);
        log::info!("Stored image {} ({} bytes)", image_src, file.bytes.len());
        Ok(image_src)
    }

    /// Deletes a stored image. A file that is already gone is not an error.
    pub async fn remove(&self, image_src: &str) -> Result<(), AppError> {
        let path = self.resolve(image_src)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("Removed image {}", image_src);
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Image {} was already gone", image_src);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Maps a recorded `image_src` to its file, refusing anything outside the uploads directory.
    pub fn resolve(&self, image_src: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(image_src);
        let mut components = relative.components();
        let inside_uploads = matches!(
            (components.next(), components.next(), components.next()),
            (Some(Component::Normal(dir)), Some(Component::Normal(_)), None) if dir == UPLOADS_DIR
        );

        if !inside_uploads {
            return Err(AppError::PersistenceFailure(format!(
                "Refusing to touch {:?} outside the uploads directory",
                image_src
            )));
        }

        Ok(self.public_dir.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file(filename: &str, content_type: &str) -> UploadedFile {
        UploadedFile {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[test]
    fn test_image_type_allow_list() {
        assert!(check_image_type(&file("robot.png", "image/png")).is_ok());
        assert!(check_image_type(&file("ROBOT.JPG", "image/jpeg")).is_ok());
        assert!(check_image_type(&file("robot.gif", "image/gif")).is_ok());

        // Both checks have to pass.
        assert!(check_image_type(&file("notes.txt", "text/plain")).is_err());
        assert!(check_image_type(&file("notes.txt", "image/png")).is_err());
        assert!(check_image_type(&file("robot.png", "text/plain")).is_err());
        assert!(check_image_type(&file("robot", "image/png")).is_err());
        assert!(check_image_type(&file("robot.svg", "image/svg+xml")).is_err());
    }

    #[actix_rt::test]
    async fn test_store_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::new(dir.path(), 1024);

        let image_src = images.store(Some(file("robot.png", "image/png"))).await.unwrap();
        assert!(image_src.starts_with("uploads/"));
        assert!(image_src.ends_with(".png"));

        let path = images.resolve(&image_src).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x89, 0x50, 0x4e, 0x47]);

        images.remove(&image_src).await.unwrap();
        assert!(!path.exists());
        // Removing twice is harmless.
        images.remove(&image_src).await.unwrap();
    }

    #[actix_rt::test]
    async fn test_store_generates_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::new(dir.path(), 1024);

        let first = images.store(Some(file("a.png", "image/png"))).await.unwrap();
        let second = images.store(Some(file("a.png", "image/png"))).await.unwrap();
        assert_ne!(first, second);
    }

    #[actix_rt::test]
    async fn test_store_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::new(dir.path(), 2);

        assert!(matches!(images.store(None).await, Err(AppError::MissingFile)));
        assert!(matches!(
            images.store(Some(file("notes.txt", "text/plain"))).await,
            Err(AppError::UnsupportedFileType)
        ));
        assert!(matches!(
            images.store(Some(file("robot.png", "image/png"))).await,
            Err(AppError::PayloadTooLarge)
        ));
        assert!(!dir.path().join(UPLOADS_DIR).exists(), "nothing was written");
    }

    #[test]
    fn test_resolve_stays_inside_uploads() {
        let images = ImageStore::new("/srv/public", 1024);

        assert_eq!(
            images.resolve("uploads/robot.png").unwrap(),
            PathBuf::from("/srv/public/uploads/robot.png")
        );
        assert!(images.resolve("uploads/../secrets.txt").is_err());
        assert!(images.resolve("/etc/passwd").is_err());
        assert!(images.resolve("other/robot.png").is_err());
        assert!(images.resolve("uploads/nested/robot.png").is_err());
    }
}
