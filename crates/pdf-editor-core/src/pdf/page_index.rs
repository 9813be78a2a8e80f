//! Page index newtype for safe conversion between 0-based indices,
//! 1-based display numbers and lopdf page numbers.

use std::fmt;

use crate::error::Error;

/// A zero-based page index validated against a document's page count.
///
/// Callers at the UI boundary speak 1-based page numbers, lopdf's page map
/// is keyed by 1-based `u32`, and everything else in the crate uses 0-based
/// indices. This newtype centralizes those conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(usize);

impl PageIndex {
    /// Get the index as usize for Rust collections.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Get the 1-indexed page number shown to users.
    #[must_use]
    pub const fn display_number(self) -> usize {
        self.0 + 1
    }

    /// Get the 1-indexed page number for lopdf (which uses 1-based indexing).
    pub fn as_lopdf_page_number(self) -> Result<u32, Error> {
        u32::try_from(self.0 + 1).map_err(|_| Error::PageIndexOutOfRange {
            page: self.0,
            total: u32::MAX as usize,
        })
    }

    /// Validate a zero-based index against the total page count.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        if page_num >= total_pages {
            return Err(Error::PageIndexOutOfRange {
                page: page_num,
                total: total_pages,
            });
        }
        Ok(Self(page_num))
    }

    /// Validate a 1-based display number against the total page count.
    pub fn try_from_display_number(number: usize, total_pages: usize) -> Result<Self, Error> {
        if number == 0 {
            return Err(Error::PageIndexOutOfRange {
                page: 0,
                total: total_pages,
            });
        }
        Self::try_from_page_num(number - 1, total_pages)
    }
}

impl From<PageIndex> for usize {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
