// src/media.rs
//! Media intake: base64 encoding for provider payloads and the session-local
//! store that backs displayable preview/result references.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use base64::prelude::*;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Raw bytes encoded for embedding in a request body
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMedia {
    pub data: String, // base64 (standard alphabet, no data-URL prefix)
    pub mime_type: String,
}

impl EncodedMedia {
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            data: BASE64_STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
        }
    }
}

/// Decode base64 returned by the provider
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(data.trim())
        .map_err(|e| AppError::Transport(format!("Failed to decode base64 image: {}", e)))
}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.trim().to_ascii_lowercase().starts_with("image/")
}

/// Best-effort MIME type from a file name's extension
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// A selected file, ready to display and to submit
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub file_name: String,
    pub preview: MediaHandle,
    pub encoded: EncodedMedia,
}

/// Turn bytes received from the user into a preview handle plus the
/// base64 payload. Only image types are accepted in either mode.
pub fn prepare_upload(
    store: &MediaStore,
    file_name: &str,
    bytes: Vec<u8>,
    mime_type: &str,
) -> Result<PreparedUpload> {
    if !is_image_mime(mime_type) {
        return Err(AppError::Validation(format!(
            "Unsupported file type '{}'. Please select an image.",
            mime_type
        )));
    }
    if bytes.is_empty() {
        return Err(AppError::Encoding(format!("{} is empty", file_name)));
    }

    let encoded = EncodedMedia::from_bytes(&bytes, mime_type);
    let preview = store.register(bytes, mime_type);
    tracing::debug!(
        "Prepared upload {} ({}, {} base64 chars) as {}",
        file_name,
        mime_type,
        encoded.data.len(),
        preview.id()
    );

    Ok(PreparedUpload {
        file_name: file_name.to_string(),
        preview,
        encoded,
    })
}

struct StoredMedia {
    bytes: Arc<Vec<u8>>,
    mime_type: String,
}

type Entries = Mutex<HashMap<Uuid, StoredMedia>>;

/// Session-local registry of displayable blobs. A blob stays
/// reachable through `/media/<id>` exactly as long as some
/// `MediaHandle` for it is alive.
#[derive(Clone, Default)]
pub struct MediaStore {
    entries: Arc<Entries>,
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, bytes: Vec<u8>, mime_type: &str) -> MediaHandle {
        let id = Uuid::new_v4();
        let bytes = Arc::new(bytes);
        lock(&self.entries).insert(
            id,
            StoredMedia {
                bytes: bytes.clone(),
                mime_type: mime_type.to_string(),
            },
        );

        MediaHandle {
            inner: Arc::new(HandleInner {
                id,
                mime_type: mime_type.to_string(),
                bytes,
                store: Arc::downgrade(&self.entries),
            }),
        }
    }

    /// Bytes and MIME type of a live handle
    pub fn get(&self, id: &Uuid) -> Option<(Arc<Vec<u8>>, String)> {
        lock(&self.entries)
            .get(id)
            .map(|m| (m.bytes.clone(), m.mime_type.clone()))
    }

    pub fn live_count(&self) -> usize {
        lock(&self.entries).len()
    }
}

impl std::fmt::Debug for MediaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStore")
            .field("live", &self.live_count())
            .finish()
    }
}

fn lock(entries: &Entries) -> MutexGuard<'_, HashMap<Uuid, StoredMedia>> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scoped reference to a blob in the `MediaStore`.
///
/// Clones share one registration. The blob is removed from the store when
/// the last clone is released or dropped, so superseded previews and
/// discarded results never outlive their owner.
#[derive(Clone)]
pub struct MediaHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: Uuid,
    mime_type: String,
    bytes: Arc<Vec<u8>>,
    store: Weak<Entries>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if let Some(entries) = self.store.upgrade() {
            if lock(&entries).remove(&self.id).is_some() {
                tracing::trace!("Released media handle {}", self.id);
            }
        }
    }
}

impl MediaHandle {
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// URL the page uses to display this blob
    pub fn reference(&self) -> String {
        format!("/media/{}", self.inner.id)
    }

    pub fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.inner.bytes
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.inner.mime_type,
            BASE64_STANDARD.encode(self.inner.bytes.as_slice())
        )
    }

    /// Give up this owner's claim on the blob
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHandle")
            .field("id", &self.inner.id)
            .field("mime_type", &self.inner.mime_type)
            .field("len", &self.inner.bytes.len())
            .finish()
    }
}

impl PartialEq for MediaHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_matches_standard_base64() {
        let encoded = EncodedMedia::from_bytes(b"hello", "image/png");
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.mime_type, "image/png");
        assert_eq!(decode_base64(&encoded.data).unwrap(), b"hello");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_base64("not base64!!").unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[test]
    fn test_mime_inference() {
        assert_eq!(mime_from_path(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("a/b/frame.png")), "image/png");
        assert_eq!(mime_from_path(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(mime_from_path(Path::new("notes")), "application/octet-stream");
        assert!(is_image_mime("image/webp"));
        assert!(!is_image_mime("video/mp4"));
    }

    #[test]
    fn test_prepare_upload_encodes_payload() {
        let store = MediaStore::new();
        let upload = prepare_upload(&store, "frame.png", b"\x89PNG".to_vec(), "image/png").unwrap();
        assert_eq!(upload.file_name, "frame.png");
        assert_eq!(upload.encoded.mime_type, "image/png");
        assert_eq!(decode_base64(&upload.encoded.data).unwrap(), b"\x89PNG");
        assert_eq!(upload.preview.bytes(), b"\x89PNG");
        assert_eq!(upload.preview.mime_type(), "image/png");
    }

    #[test]
    fn test_prepare_upload_rejects_non_images() {
        let store = MediaStore::new();
        let err = prepare_upload(&store, "clip.mp4", vec![1, 2, 3], "video/mp4").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.live_count(), 0);

        let err = prepare_upload(&store, "empty.png", Vec::new(), "image/png").unwrap_err();
        assert!(matches!(err, AppError::Encoding(_)));
    }

    #[test]
    fn test_handle_released_when_last_owner_drops() {
        let store = MediaStore::new();
        let upload = prepare_upload(&store, "a.png", vec![7; 16], "image/png").unwrap();
        let id = upload.preview.id();
        assert_eq!(store.live_count(), 1);
        assert!(store.get(&id).is_some());

        let shared = upload.preview.clone();
        drop(upload);
        assert_eq!(store.live_count(), 1);
        assert_eq!(shared.bytes(), &[7; 16][..]);

        shared.release();
        assert_eq!(store.live_count(), 0);
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_data_url_and_reference() {
        let store = MediaStore::new();
        let handle = store.register(b"png".to_vec(), "image/png");
        assert_eq!(handle.to_data_url(), "data:image/png;base64,cG5n");
        assert_eq!(handle.reference(), format!("/media/{}", handle.id()));
    }
}
