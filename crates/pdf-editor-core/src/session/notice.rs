use std::fmt;

use serde::Serialize;

use crate::error::Error;

/// Outcome of a successful session operation, phrased for end users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    FilesAdded { count: usize },
    FileRemoved { name: String, edits_cleared: bool },
    ActiveChanged { name: String },
    PageChanged { number: usize },
    Merged { files: usize, pages: usize },
    Reordered { pages: usize },
    OverlayRequested { overlay: &'static str, page_number: usize },
    ImagePlaced { page_number: usize },
    TextPlaced { page_number: usize, lines: usize },
    OverlayCancelled,
    Reset,
    ResetDeclined,
    NothingToReset,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilesAdded { count: 1 } => write!(f, "Added 1 file."),
            Self::FilesAdded { count } => write!(f, "Added {count} files."),
            Self::FileRemoved { name, edits_cleared: true } => {
                write!(f, "Removed {name}. Its edits were discarded.")
            }
            Self::FileRemoved { name, .. } => write!(f, "Removed {name}."),
            Self::ActiveChanged { name } => write!(f, "Now editing {name}."),
            Self::PageChanged { number } => write!(f, "Showing page {number}."),
            Self::Merged { files, pages } => {
                write!(f, "PDFs merged successfully: {files} files, {pages} pages.")
            }
            Self::Reordered { pages } => write!(f, "Pages reordered ({pages} pages)."),
            Self::OverlayRequested { overlay, page_number } => {
                write!(f, "Choose where to place the {overlay} on page {page_number}.")
            }
            Self::ImagePlaced { page_number } => {
                write!(f, "Image added successfully to page {page_number}.")
            }
            Self::TextPlaced { page_number, .. } => {
                write!(f, "Text added successfully to page {page_number}.")
            }
            Self::OverlayCancelled => write!(f, "Placement cancelled."),
            Self::Reset => write!(f, "All changes have been reset."),
            Self::ResetDeclined => write!(f, "Reset cancelled; your edits are kept."),
            Self::NothingToReset => write!(f, "There are no edits to reset."),
        }
    }
}

/// User-facing name of a session operation, used to phrase failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    AddFiles,
    RemoveFile,
    SelectFile,
    ChangePage,
    Merge,
    Reorder,
    AddImage,
    AddText,
    CancelOverlay,
    Reset,
    Export,
}

impl Action {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AddFiles => "adding files",
            Self::RemoveFile => "removing the file",
            Self::SelectFile => "selecting the file",
            Self::ChangePage => "changing page",
            Self::Merge => "merging PDFs",
            Self::Reorder => "reordering pages",
            Self::AddImage => "adding the image",
            Self::AddText => "adding the text",
            Self::CancelOverlay => "cancelling placement",
            Self::Reset => "resetting",
            Self::Export => "exporting the PDF",
        }
    }

    /// Plain-language failure message, e.g. "Error merging PDFs: ...".
    pub fn failure_message(self, error: &Error) -> String {
        match error {
            Error::NotEnoughFilesToMerge { .. } => "Please select at least 2 PDF files to merge.".to_string(),
            Error::NothingToExport => "No changes to export yet.".to_string(),
            Error::NoActiveDocument => "Open a PDF first.".to_string(),
            _ => format!("Error {}: {error}", self.label()),
        }
    }
}
