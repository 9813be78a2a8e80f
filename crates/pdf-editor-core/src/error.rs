use thiserror::Error;

/// Unified error type for pdf-editor-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - PDF operations (parsing, structural edits, saving)
/// - Overlay operations (image decoding, page lookup, font loading)
/// - Merge and reorder operations
/// - Session state transitions (active document, export, pending overlays)
/// - Configuration operations (loading, validation)
/// - General I/O operations
///
/// No variant carries partial output: an operation that fails leaves the
/// session's edited state exactly as it was.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Codec Errors
    // ==========================================================================
    /// Input bytes are not a well-formed PDF or image
    #[error("failed to parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    /// Failed to serialize a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Structural error inside an already parsed document
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Overlay Errors
    // ==========================================================================
    /// Declared image kind is neither PNG nor JPEG
    #[error("unsupported image kind '{0}' (use PNG or JPEG)")]
    UnsupportedImageKind(String),

    /// Page index outside the document
    #[error("page index {page} is out of range (document has {total} pages)")]
    PageIndexOutOfRange { page: usize, total: usize },

    /// Font asset could not be fetched or parsed
    #[error("failed to load font: {0}")]
    FontLoad(String),

    /// Overlay geometry is unusable (non-finite or non-positive size)
    #[error("invalid overlay geometry: {0}")]
    InvalidOverlayGeometry(String),

    // ==========================================================================
    // Merge / Reorder Errors
    // ==========================================================================
    /// One of the merge inputs failed; nothing was produced
    #[error("merge failed at file #{}: {source}", .position + 1)]
    Merge {
        position: usize,
        #[source]
        source: Box<Error>,
    },

    /// Merge needs at least two files
    #[error("merging needs at least 2 PDF files, got {count}")]
    NotEnoughFilesToMerge { count: usize },

    /// Page order for a reorder is empty
    #[error("invalid page order: {0}")]
    InvalidPageOrder(String),

    // ==========================================================================
    // Session Errors
    // ==========================================================================
    /// No edited state and no active file to operate on
    #[error("no active document selected")]
    NoActiveDocument,

    /// Export requested before any edit was committed
    #[error("nothing to export: no edits have been applied")]
    NothingToExport,

    /// Working-set position does not exist
    #[error("file index {index} is out of range (working set has {len} files)")]
    FileIndexOutOfRange { index: usize, len: usize },

    /// Confirm or cancel without a pending overlay request
    #[error("no overlay is waiting for placement")]
    NoPendingOverlay,

    /// Confirm call does not match the kind of the pending request
    #[error("pending overlay is a {pending} overlay, not a {requested} overlay")]
    PendingOverlayMismatch {
        pending: &'static str,
        requested: &'static str,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn pdf_parse(reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            what: "PDF",
            reason: reason.to_string(),
        }
    }

    pub(crate) fn image_parse(reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            what: "image",
            reason: reason.to_string(),
        }
    }

    /// Whether the error stems from malformed input rather than session state.
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::UnsupportedImageKind(_)
                | Self::PageIndexOutOfRange { .. }
                | Self::FileIndexOutOfRange { .. }
                | Self::InvalidOverlayGeometry(_)
                | Self::InvalidPageOrder(_)
                | Self::Merge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
