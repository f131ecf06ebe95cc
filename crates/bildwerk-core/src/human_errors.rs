// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable failure notifications.
//
// A run ends in a single terminal notification. It names the stage that
// failed and, for per-page failures, the 1-based page number.

use crate::error::BildwerkError;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading or re-encoding an image.
    Decode,
    /// The document backend rejected a page or could not finalize.
    Sink,
    /// Settings were rejected before the run started.
    Config,
    /// The run itself (nothing to do, already running, cancelled, I/O).
    Run,
}

/// A user-facing error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub stage: Stage,
    /// 1-based page number, when the failure belongs to one page.
    pub page_number: Option<usize>,
}

/// Convert a `BildwerkError` into the notification shown when a run fails.
pub fn humanize_error(err: &BildwerkError) -> HumanError {
    match err {
        BildwerkError::Processing { page_index, source } => {
            let mut human = humanize_error(source);
            let page = page_index + 1;
            human.page_number = Some(page);
            human.message = format!("Page {page}: {}", human.message);
            human
        }

        BildwerkError::Decode(_) => HumanError {
            message: "This image couldn't be read.".into(),
            suggestion: "The file may be damaged or not really an image. Try saving it again as JPEG or PNG.".into(),
            stage: Stage::Decode,
            page_number: None,
        },

        BildwerkError::Encode(_) => HumanError {
            message: "This image couldn't be prepared for the PDF.".into(),
            suggestion: "Try a lower quality setting, or convert the image to JPEG first.".into(),
            stage: Stage::Decode,
            page_number: None,
        },

        BildwerkError::UnsupportedMime(mime) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!("Only PNG, JPEG and WebP images can be added. (File type: {mime})"),
            stage: Stage::Decode,
            page_number: None,
        },

        BildwerkError::EmptyInput => HumanError {
            message: "There are no images to convert.".into(),
            suggestion: "Add at least one image, then try again.".into(),
            stage: Stage::Run,
            page_number: None,
        },

        BildwerkError::InvalidConfig(detail) => HumanError {
            message: "Some settings aren't valid.".into(),
            suggestion: format!("Check the page size, margin and quality settings. ({detail})"),
            stage: Stage::Config,
            page_number: None,
        },

        BildwerkError::AlreadyRunning => HumanError {
            message: "A PDF is already being created.".into(),
            suggestion: "Wait for it to finish, or cancel it first.".into(),
            stage: Stage::Run,
            page_number: None,
        },

        BildwerkError::Task(_) => HumanError {
            message: "Something went wrong while preparing this page.".into(),
            suggestion: "This is not a problem with your image. Try again, and report it if it keeps happening.".into(),
            stage: Stage::Run,
            page_number: None,
        },

        BildwerkError::Sink(_) => HumanError {
            message: "The PDF couldn't be written.".into(),
            suggestion: "Try again. If this keeps happening, try fewer or smaller images.".into(),
            stage: Stage::Sink,
            page_number: None,
        },

        BildwerkError::Cancelled { completed_pages } => HumanError {
            message: "PDF creation was cancelled.".into(),
            suggestion: format!("{completed_pages} page(s) had been processed. Nothing was saved."),
            stage: Stage::Run,
            page_number: None,
        },

        BildwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    stage: Stage::Run,
                    page_number: None,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    stage: Stage::Run,
                    page_number: None,
                }
            }
        }

        BildwerkError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read.".into(),
            suggestion: "Check that it is valid JSON.".into(),
            stage: Stage::Config,
            page_number: None,
        },
    }
}
