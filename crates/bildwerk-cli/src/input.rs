// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reads input files into an `ImageBatch`, skipping what the batch refuses.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bildwerk_core::{BildwerkError, ImageBatch, MimeType};
use tracing::{info, warn};

use crate::args::RotateArg;

/// Stand-in MIME type for extensions outside the allow-list, so the batch
/// rejects them.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// Queue `paths` in order.
///
/// Returns the batch and, for each input path, the batch position it landed
/// at (`None` when skipped as unsupported or duplicate).
pub async fn load_batch(paths: &[PathBuf]) -> Result<(ImageBatch, Vec<Option<usize>>)> {
    let mut batch = ImageBatch::new();
    let mut positions = Vec::with_capacity(paths.len());

    for path in paths {
        let name = display_name(path);
        let mime = mime_for(path);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        match batch.add(&name, mime, bytes) {
            Ok(true) => positions.push(Some(batch.len() - 1)),
            Ok(false) => positions.push(None),
            Err(BildwerkError::UnsupportedMime(_)) => {
                warn!(path = %path.display(), "unsupported file type, skipping");
                positions.push(None);
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!(
        queued = batch.len(),
        skipped = paths.len() - batch.len(),
        total_bytes = batch.total_bytes(),
        "inputs loaded"
    );
    Ok((batch, positions))
}

/// Apply `--rotate` requests, addressed by input position.
pub fn apply_rotations(
    batch: &mut ImageBatch,
    positions: &[Option<usize>],
    rotations: &[RotateArg],
) -> Result<()> {
    for request in rotations {
        let Some(slot) = positions.get(request.index) else {
            anyhow::bail!(
                "--rotate {}: only {} input image(s) were given",
                request.index + 1,
                positions.len()
            );
        };
        let Some(position) = *slot else {
            warn!(input = request.index + 1, "rotation ignored for skipped input");
            continue;
        };
        for _ in 0..request.rotation.degrees() / 90 {
            batch.rotate(position)?;
        }
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn mime_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(MimeType::from_extension)
        .map_or(UNKNOWN_MIME, |mime| mime.mime_type())
}
