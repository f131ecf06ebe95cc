// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bildwerk.

use thiserror::Error;

/// Top-level error type for all Bildwerk operations.
#[derive(Debug, Error)]
pub enum BildwerkError {
    // -- Image errors --
    #[error("image decoding failed: {0}")]
    Decode(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("unsupported image type: {0}")]
    UnsupportedMime(String),

    // -- Run errors --
    #[error("no images to process")]
    EmptyInput,

    #[error("invalid settings: {0}")]
    InvalidConfig(String),

    #[error("a run is already in progress")]
    AlreadyRunning,

    /// A background page task panicked or was aborted.
    #[error("page task failed: {0}")]
    Task(String),

    /// `page_index` is 0-based; the message reports the 1-based page number.
    #[error("page {page} failed: {source}", page = .page_index + 1)]
    Processing {
        page_index: usize,
        #[source]
        source: Box<BildwerkError>,
    },

    #[error("document backend error: {0}")]
    Sink(String),

    #[error("run cancelled after {completed_pages} page(s)")]
    Cancelled { completed_pages: usize },

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BildwerkError {
    /// Wrap a per-page failure with the index of the offending image.
    pub fn at_page(page_index: usize, source: BildwerkError) -> Self {
        Self::Processing {
            page_index,
            source: Box::new(source),
        }
    }

    /// The 0-based index of the failing page, if this error carries one.
    pub fn failing_index(&self) -> Option<usize> {
        match self {
            Self::Processing { page_index, .. } => Some(*page_index),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BildwerkError>;
