use crate::types::{ApiError, ValidationError};
use log::warn;
use rocket::data::{Data, ToByteUnit};
use rocket::http::ContentType;
use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

pub const POST_IMAGE_DIR: &str = "posts";

pub fn ensure_root(media_root: &Path) -> io::Result<()> {
    fs::create_dir_all(media_root.join(POST_IMAGE_DIR))
}

/// File extension for the accepted image types.
pub fn image_extension(content_type: &ContentType) -> Option<&'static str> {
    if !content_type.top().as_str().eq_ignore_ascii_case("image") {
        return None;
    }
    match content_type.sub().as_str().to_ascii_lowercase().as_str() {
        "gif" => Some("gif"),
        "png" => Some("png"),
        "jpeg" | "jpg" => Some("jpg"),
        "webp" => Some("webp"),
        _ => None,
    }
}

/// Writes an uploaded image under the media root and returns its path
/// relative to it, e.g. `posts/<uuid>.png`.
pub async fn store_image(
    media_root: &Path,
    content_type: Option<&ContentType>,
    data: Data<'_>,
    max_bytes: u64,
) -> Result<String, ApiError> {
    let extension = content_type.and_then(image_extension).ok_or_else(|| {
        ValidationError::field("image", "Upload a GIF, PNG, JPEG or WebP image")
    })?;

    let relative = format!("{}/{}.{}", POST_IMAGE_DIR, Uuid::new_v4(), extension);
    let path = media_root.join(&relative);
    let written = data.open(max_bytes.bytes()).into_file(&path).await?;
    if !written.is_complete() {
        remove_image(media_root, &relative);
        return Err(ValidationError::field(
            "image",
            format!("Image larger than {} bytes", max_bytes),
        )
        .into());
    }
    if written.n.written == 0 {
        remove_image(media_root, &relative);
        return Err(ValidationError::field("image", "The submitted file is empty").into());
    }
    Ok(relative)
}

pub fn remove_image(media_root: &Path, relative: &str) {
    if let Err(e) = fs::remove_file(media_root.join(relative)) {
        warn!("could not remove image {}: {}", relative, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_image_types() {
        assert_eq!(image_extension(&ContentType::GIF), Some("gif"));
        assert_eq!(image_extension(&ContentType::PNG), Some("png"));
        assert_eq!(image_extension(&ContentType::JPEG), Some("jpg"));
        assert_eq!(image_extension(&ContentType::WEBP), Some("webp"));
        assert_eq!(image_extension(&ContentType::new("image", "svg+xml")), None);
        assert_eq!(image_extension(&ContentType::JSON), None);
    }
}
