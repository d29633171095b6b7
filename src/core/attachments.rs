//! Attachment ingestion: local uploads and URL fetches.
//!
//! Classification prefers the declared content type and falls back to the
//! file extension when the header is absent or generic. Unsupported files
//! produce an explicit error and leave session state untouched; batch
//! staging skips them and keeps the rest, matching the original upload
//! behavior.

use std::error::Error;
use std::fmt;
use std::io::Write;
use std::time::Duration;
use tracing::debug;

use crate::core::message::{Attachment, AttachmentKind};

/// Timeout applied to attachment URL fetches only; the inference call
/// itself is never bounded.
pub const URL_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a"];

#[derive(Debug)]
pub enum AttachmentError {
    /// The file's extension/content type is not a supported image or audio
    /// format.
    UnsupportedType { name: String },
    /// A URL fetch failed: network error, timeout, or non-2xx status.
    FetchFailed { url: String, detail: String },
    /// Local persistence of the attachment bytes failed.
    Io(std::io::Error),
}

impl fmt::Display for AttachmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentError::UnsupportedType { name } => {
                write!(f, "unsupported attachment type: {name}")
            }
            AttachmentError::FetchFailed { url, detail } => {
                write!(f, "failed to fetch {url}: {detail}")
            }
            AttachmentError::Io(err) => write!(f, "failed to store attachment: {err}"),
        }
    }
}

impl Error for AttachmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AttachmentError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AttachmentError {
    fn from(err: std::io::Error) -> Self {
        AttachmentError::Io(err)
    }
}

pub fn classify_extension(extension: &str) -> Option<AttachmentKind> {
    let ext = extension.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(AttachmentKind::Image)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(AttachmentKind::Audio)
    } else {
        None
    }
}

/// Classify by declared content type. Generic types (`application/
/// octet-stream`, empty) are treated as absent so the caller falls back to
/// the extension.
pub fn classify_content_type(content_type: &str) -> Option<AttachmentKind> {
    let ct = content_type.trim().to_ascii_lowercase();
    if ct.starts_with("image/") {
        Some(AttachmentKind::Image)
    } else if ct.starts_with("audio/") {
        Some(AttachmentKind::Audio)
    } else {
        None
    }
}

/// Media type used in the data URI for a supported extension.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        "m4a" => Some("audio/mp4"),
        _ => None,
    }
}

/// Media type for a staged attachment, from its stored suffix, with a
/// per-kind default for paths that lost their extension.
pub fn mime_for(attachment: &Attachment) -> &'static str {
    attachment
        .source_path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_for_extension)
        .unwrap_or(match attachment.kind {
            AttachmentKind::Image => "image/jpeg",
            AttachmentKind::Audio => "audio/mpeg",
        })
}

fn extension_of(name: &str) -> Option<&str> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Write attachment bytes to a named temp file that survives the handle, so
/// the path stays retrievable for the rest of the session.
fn persist_bytes(bytes: &[u8], extension: &str) -> Result<std::path::PathBuf, AttachmentError> {
    let mut file = tempfile::Builder::new()
        .prefix("mmchat-")
        .suffix(&format!(".{}", extension.to_ascii_lowercase()))
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|err| AttachmentError::Io(err.error))?;
    Ok(path)
}

/// Stage a raw uploaded blob as a pending attachment.
pub fn stage_upload(bytes: &[u8], filename: &str) -> Result<Attachment, AttachmentError> {
    let extension = extension_of(filename).ok_or_else(|| AttachmentError::UnsupportedType {
        name: filename.to_string(),
    })?;
    let kind = classify_extension(extension).ok_or_else(|| AttachmentError::UnsupportedType {
        name: filename.to_string(),
    })?;

    let path = persist_bytes(bytes, extension)?;
    debug!(name = filename, kind = kind.as_str(), path = %path.display(), "staged upload");
    Ok(Attachment::new(kind, path, filename))
}

/// Stage a batch of uploads. Unsupported or unreadable files are skipped,
/// not fatal: supported files in the same batch still go through. Errors
/// come back alongside the staged attachments so the caller can warn.
pub fn stage_uploads<'a, I>(files: I) -> (Vec<Attachment>, Vec<AttachmentError>)
where
    I: IntoIterator<Item = (&'a [u8], &'a str)>,
{
    let mut staged = Vec::new();
    let mut errors = Vec::new();
    for (bytes, name) in files {
        match stage_upload(bytes, name) {
            Ok(attachment) => staged.push(attachment),
            Err(err) => errors.push(err),
        }
    }
    (staged, errors)
}

/// Path portion of a URL with query and fragment stripped.
fn url_path(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

fn last_url_segment(url: &str) -> Option<&str> {
    let path = url_path(url);
    let rest = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
    let (_, segment) = rest.rsplit_once('/')?;
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

/// Fetch an image or audio file from a remote URL and stage it.
///
/// Bounded by [`URL_FETCH_TIMEOUT`]; a non-2xx status or network failure
/// maps to [`AttachmentError::FetchFailed`] without touching session state.
pub async fn fetch_url(
    http: &reqwest::Client,
    url: &str,
) -> Result<Attachment, AttachmentError> {
    let response = http
        .get(url)
        .timeout(URL_FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|err| AttachmentError::FetchFailed {
            url: url.to_string(),
            detail: err.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AttachmentError::FetchFailed {
            url: url.to_string(),
            detail: format!("HTTP {}", status.as_u16()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let url_extension = last_url_segment(url).and_then(extension_of);
    let kind = classify_content_type(&content_type)
        .or_else(|| url_extension.and_then(classify_extension))
        .ok_or_else(|| AttachmentError::UnsupportedType {
            name: url.to_string(),
        })?;

    // Suffix for the stored copy: URL extension when it agrees with the
    // classified kind, else a per-kind default.
    let extension = url_extension
        .filter(|ext| classify_extension(ext) == Some(kind))
        .unwrap_or(match kind {
            AttachmentKind::Image => "jpg",
            AttachmentKind::Audio => "mp3",
        });

    let display_name = last_url_segment(url)
        .filter(|segment| segment.contains('.'))
        .map(str::to_string)
        .unwrap_or_else(|| format!("download.{extension}"));

    let bytes = response
        .bytes()
        .await
        .map_err(|err| AttachmentError::FetchFailed {
            url: url.to_string(),
            detail: err.to_string(),
        })?;

    let path = persist_bytes(&bytes, extension)?;
    debug!(url, kind = kind.as_str(), path = %path.display(), "staged URL fetch");
    Ok(Attachment::new(kind, path, display_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(classify_extension("jpg"), Some(AttachmentKind::Image));
        assert_eq!(classify_extension("WEBP"), Some(AttachmentKind::Image));
        assert_eq!(classify_extension("mp3"), Some(AttachmentKind::Audio));
        assert_eq!(classify_extension("m4a"), Some(AttachmentKind::Audio));
        assert_eq!(classify_extension("pdf"), None);
        assert_eq!(classify_extension(""), None);
    }

    #[test]
    fn content_type_beats_extension_semantics() {
        assert_eq!(
            classify_content_type("audio/mpeg"),
            Some(AttachmentKind::Audio)
        );
        assert_eq!(
            classify_content_type("image/png; charset=binary"),
            Some(AttachmentKind::Image)
        );
        // Generic types fall through to extension classification.
        assert_eq!(classify_content_type("application/octet-stream"), None);
        assert_eq!(classify_content_type(""), None);
        assert_eq!(classify_content_type("text/html"), None);
    }

    #[test]
    fn mime_table_covers_every_supported_extension() {
        for ext in IMAGE_EXTENSIONS.iter().chain(AUDIO_EXTENSIONS) {
            let mime = mime_for_extension(ext).expect("supported extension has a mime");
            let kind = classify_extension(ext).unwrap();
            match kind {
                AttachmentKind::Image => assert!(mime.starts_with("image/")),
                AttachmentKind::Audio => assert!(mime.starts_with("audio/")),
            }
        }
        assert_eq!(mime_for_extension("mp3"), Some("audio/mpeg"));
        assert_eq!(mime_for_extension("m4a"), Some("audio/mp4"));
        assert_eq!(mime_for_extension("txt"), None);
    }

    #[test]
    fn stage_upload_persists_bytes_and_classifies() {
        let attachment = stage_upload(b"not really a jpeg", "photo.jpg").unwrap();
        assert_eq!(attachment.kind, AttachmentKind::Image);
        assert_eq!(attachment.display_name, "photo.jpg");
        let stored = std::fs::read(&attachment.source_path).unwrap();
        assert_eq!(stored, b"not really a jpeg");
        std::fs::remove_file(&attachment.source_path).ok();
    }

    #[test]
    fn stage_upload_rejects_unsupported_types() {
        let err = stage_upload(b"%PDF-1.4", "report.pdf").unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedType { .. }));
        let err = stage_upload(b"data", "no_extension").unwrap_err();
        assert!(matches!(err, AttachmentError::UnsupportedType { .. }));
    }

    #[test]
    fn batch_staging_skips_unsupported_and_keeps_rest() {
        let files: Vec<(&[u8], &str)> = vec![
            (b"img", "a.png"),
            (b"doc", "b.docx"),
            (b"snd", "c.wav"),
        ];
        let (staged, errors) = stage_uploads(files);
        assert_eq!(staged.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(staged[0].kind, AttachmentKind::Image);
        assert_eq!(staged[1].kind, AttachmentKind::Audio);
        for attachment in &staged {
            std::fs::remove_file(&attachment.source_path).ok();
        }
    }

    #[test]
    fn url_segment_extraction_ignores_query_and_fragment() {
        assert_eq!(
            last_url_segment("https://example.com/media/photo.png?size=large#top"),
            Some("photo.png")
        );
        assert_eq!(last_url_segment("https://example.com/"), None);
        assert_eq!(last_url_segment("https://example.com"), None);
    }

    #[test]
    fn mime_for_falls_back_per_kind() {
        let odd = Attachment::new(AttachmentKind::Audio, "/tmp/mystery", "mystery");
        assert_eq!(mime_for(&odd), "audio/mpeg");
        let img = Attachment::new(AttachmentKind::Image, "/tmp/p.png", "p.png");
        assert_eq!(mime_for(&img), "image/png");
    }
}
