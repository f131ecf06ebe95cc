// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ordered, caller-owned collection of source images awaiting a run.

use tracing::{debug, info, warn};

use crate::error::{BildwerkError, Result};
use crate::types::{MimeType, SourceImage};

/// The images queued for conversion, in page order.
///
/// Enforces the MIME allow-list and skips duplicates (same name and byte
/// size). A run works on a [`snapshot`](Self::snapshot), so editing the batch
/// afterwards never affects a run in flight.
#[derive(Debug, Clone, Default)]
pub struct ImageBatch {
    images: Vec<SourceImage>,
}

impl ImageBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept an upload. Returns `Ok(false)` when an identical file is already
    /// queued, and an error when the MIME type is not accepted.
    pub fn add(&mut self, name: &str, mime: &str, bytes: Vec<u8>) -> Result<bool> {
        let mime_type = MimeType::from_mime(mime)
            .ok_or_else(|| BildwerkError::UnsupportedMime(mime.to_string()))?;
        let size = bytes.len() as u64;

        if self.contains(name, size) {
            warn!(name, size, "duplicate image skipped");
            return Ok(false);
        }

        self.images.push(SourceImage::new(name, mime_type, bytes));
        debug!(name, size, count = self.images.len(), "image queued");
        Ok(true)
    }

    /// Whether an image with this name and size is already queued.
    pub fn contains(&self, name: &str, size: u64) -> bool {
        self.images
            .iter()
            .any(|img| img.identity().name == name && img.identity().size == size)
    }

    /// Rotate the image at `index` a further 90 degrees clockwise.
    pub fn rotate(&mut self, index: usize) -> Result<()> {
        let image = self.get_mut(index)?;
        image.rotate();
        debug!(index, rotation = %image.rotation(), "image rotated");
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<SourceImage> {
        self.check_index(index)?;
        Ok(self.images.remove(index))
    }

    /// Move the image at `from` so that it ends up at position `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let item = self.images.remove(from);
            self.images.insert(to, item);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        info!(count = self.images.len(), "clearing image batch");
        self.images.clear();
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Sum of the encoded payload sizes.
    pub fn total_bytes(&self) -> u64 {
        self.images.iter().map(|img| img.identity().size).sum()
    }

    pub fn images(&self) -> &[SourceImage] {
        &self.images
    }

    /// An immutable copy of the current order, for handing to a run.
    pub fn snapshot(&self) -> Vec<SourceImage> {
        self.images.clone()
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut SourceImage> {
        let len = self.images.len();
        self.images.get_mut(index).ok_or_else(|| {
            BildwerkError::InvalidConfig(format!("image index {index} out of range (batch has {len})"))
        })
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.images.len() {
            Ok(())
        } else {
            Err(BildwerkError::InvalidConfig(format!(
                "image index {index} out of range (batch has {})",
                self.images.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rotation;

    fn batch_of(names: &[&str]) -> ImageBatch {
        let mut batch = ImageBatch::new();
        for (i, name) in names.iter().enumerate() {
            batch
                .add(name, "image/png", vec![0u8; i + 1])
                .expect("add");
        }
        batch
    }

    fn names(batch: &ImageBatch) -> Vec<&str> {
        batch.images().iter().map(SourceImage::name).collect()
    }

    #[test]
    fn rejects_unsupported_mime() {
        let mut batch = ImageBatch::new();
        let err = batch.add("anim.gif", "image/gif", vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, BildwerkError::UnsupportedMime(_)));
        assert!(batch.is_empty());
    }

    #[test]
    fn skips_duplicates_by_name_and_size() {
        let mut batch = ImageBatch::new();
        assert!(batch.add("a.png", "image/png", vec![0; 10]).expect("first"));
        assert!(!batch.add("a.png", "image/png", vec![1; 10]).expect("dup"));
        // Same name, different size is a different file.
        assert!(batch.add("a.png", "image/png", vec![0; 11]).expect("resized"));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.total_bytes(), 21);
    }

    #[test]
    fn reorder_and_remove() {
        let mut batch = batch_of(&["a", "b", "c", "d"]);
        batch.move_item(0, 2).expect("move");
        assert_eq!(names(&batch), ["b", "c", "a", "d"]);

        let removed = batch.remove(1).expect("remove");
        assert_eq!(removed.name(), "c");
        assert_eq!(names(&batch), ["b", "a", "d"]);

        assert!(batch.move_item(0, 9).is_err());
        assert!(batch.remove(3).is_err());
    }

    #[test]
    fn rotate_affects_only_target() {
        let mut batch = batch_of(&["a", "b"]);
        batch.rotate(1).expect("rotate");
        batch.rotate(1).expect("rotate");
        assert_eq!(batch.images()[0].rotation(), Rotation::NONE);
        assert_eq!(batch.images()[1].rotation(), Rotation::CW_180);
        assert!(batch.rotate(5).is_err());
    }

    #[test]
    fn snapshot_is_detached_from_later_edits() {
        let mut batch = batch_of(&["a", "b"]);
        let snapshot = batch.snapshot();
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].name(), "b");
    }
}
