use serde::{Deserialize, Serialize};

/// Page size used by recommendation feeds unless configured otherwise
pub const DEFAULT_PER_PAGE: u32 = 4;

/// Inclusive row range for an offset-paginated query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub from: u64,
    pub to: u64,
}

impl PageRange {
    /// Zero-based offset of the first row
    pub fn offset(&self) -> u64 {
        self.from
    }

    /// Number of rows covered by the range
    pub fn limit(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// Computes the inclusive row range for a 1-based page
///
/// Both `page` and `per_page` are floored to 1, so `get_range(0, 4)` is the
/// first page.
pub fn get_range(page: u32, per_page: u32) -> PageRange {
    let page = u64::from(page.max(1));
    let per_page = u64::from(per_page.max(1));

    PageRange {
        from: (page - 1) * per_page,
        to: page * per_page - 1,
    }
}
