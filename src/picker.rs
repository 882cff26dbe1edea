//! Image picking and preview lifetime.
//!
//! A picked image owns a [`PreviewHandle`]. The preview stays registered in
//! the [`PreviewStore`] (and servable at `/preview/:id`) exactly as long as
//! the handle lives, so replacing the image or starting over releases it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;

/// Subtypes whose magic bytes `image::guess_format` recognizes.
const SNIFFABLE_SUBTYPES: [&str; 6] = ["png", "jpeg", "jpg", "gif", "webp", "bmp"];

/// Bytes and content type of a registered preview.
#[derive(Debug, Clone)]
pub struct Preview {
    pub mime: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
struct PreviewInner {
    next_id: AtomicU64,
    previews: Mutex<HashMap<u64, Preview>>,
}

/// Registry of live image previews.
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    inner: Arc<PreviewInner>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a preview for `bytes` and return the guard that owns it.
    pub fn register(&self, mime: &str, bytes: Bytes) -> PreviewHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let preview = Preview {
            mime: mime.to_string(),
            bytes,
        };

        if let Ok(mut previews) = self.inner.previews.lock() {
            previews.insert(id, preview);
        }

        PreviewHandle {
            id,
            store: self.clone(),
        }
    }

    pub fn get(&self, id: u64) -> Option<Preview> {
        self.inner
            .previews
            .lock()
            .ok()
            .and_then(|previews| previews.get(&id).cloned())
    }

    /// Number of previews still registered.
    pub fn len(&self) -> usize {
        self.inner
            .previews
            .lock()
            .map(|previews| previews.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: u64) {
        if let Ok(mut previews) = self.inner.previews.lock() {
            if previews.remove(&id).is_some() {
                tracing::debug!(preview = id, "released image preview");
            }
        }
    }
}

/// Owns one registered preview; dropping it releases the preview.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    store: PreviewStore,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Path the page loads the preview from.
    pub fn url(&self) -> String {
        format!("/preview/{}", self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.store.release(self.id);
    }
}

/// The single image currently selected in the form.
#[derive(Debug)]
pub struct PickedImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
    preview: PreviewHandle,
}

impl PickedImage {
    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }
}

/// Accepts image files from the browse control or a drop.
#[derive(Debug, Clone, Default)]
pub struct ImagePicker {
    previews: PreviewStore,
}

impl ImagePicker {
    pub fn new(previews: PreviewStore) -> Self {
        Self { previews }
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    /// Returns `None` for anything that is not an image; callers ignore it.
    ///
    /// Any declared `image/*` type is accepted. For the common raster
    /// subtypes the bytes must also look like that kind of image.
    pub fn pick(&self, file_name: &str, declared_mime: &str, bytes: Bytes) -> Option<PickedImage> {
        if bytes.is_empty() {
            return None;
        }

        let mime = declared_mime.trim().to_ascii_lowercase();
        if !mime.starts_with("image/") {
            tracing::debug!(file_name, %mime, "ignoring non-image file");
            return None;
        }

        let subtype = mime.trim_start_matches("image/");
        let subtype = subtype.split(';').next().unwrap_or_default().trim();
        if SNIFFABLE_SUBTYPES.contains(&subtype) {
            if let Err(e) = image::guess_format(&bytes) {
                tracing::debug!(file_name, %mime, "ignoring unrecognized image data: {}", e);
                return None;
            }
        }

        let preview = self.previews.register(&mime, bytes.clone());
        tracing::info!(file_name, %mime, size = bytes.len(), "📸 image picked");

        Some(PickedImage {
            file_name: if file_name.is_empty() {
                "image".to_string()
            } else {
                file_name.to_string()
            },
            mime,
            bytes,
            preview,
        })
    }
}
