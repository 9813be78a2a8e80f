use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pdf::ImageKind;

/// Declared media type of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Pdf,
    Png,
    Jpeg,
    Other(String),
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Self::Pdf,
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Self::Jpeg,
            other => Self::Other(other.to_string()),
        }
    }

    /// Guess from a file name's extension.
    pub fn guess_from_name(name: &str) -> Self {
        mime_guess::from_path(name)
            .first()
            .map_or_else(|| Self::Other(String::new()), |mime| Self::from_mime(mime.essence_str()))
    }

    pub fn mime(&self) -> &str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Other(mime) => mime,
        }
    }

    pub const fn is_pdf(&self) -> bool {
        matches!(self, Self::Pdf)
    }

    /// The image codec for this kind; `UnsupportedImageKind` for anything
    /// but PNG and JPEG.
    pub fn image_kind(&self) -> Result<ImageKind> {
        ImageKind::from_declared(self.mime())
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// A named, immutable byte buffer with its declared media kind.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    kind: MediaKind,
    bytes: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, kind: MediaKind, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes: bytes.into(),
        }
    }

    /// Build a source file whose kind is guessed from its name.
    pub fn from_name(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let kind = MediaKind::guess_from_name(&name);
        Self::new(name, kind, bytes)
    }

    /// Build a source file from a declared MIME type, falling back to the
    /// file name when the declaration is missing or generic.
    pub fn with_declared_mime(name: impl Into<String>, mime: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let kind = match mime {
            Some(m) if !m.is_empty() && m != "application/octet-stream" => MediaKind::from_mime(m),
            _ => MediaKind::guess_from_name(&name),
        };
        Self::new(name, kind, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> &MediaKind {
        &self.kind
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
