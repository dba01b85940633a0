//! List-view semantics shared by every paginated collection.
//!
//! A list request carries a page number, a page size, an optional search term
//! and an optional status filter. The store layer turns it into SQL; static
//! collections use [`list_in_memory`]. Both follow the same rules:
//!
//! - page numbers are 1-based and clamp into `[1, total_pages]`
//! - `total_pages` is at least 1, so an empty collection is one empty page
//! - search is trimmed, case-insensitive substring containment
//! - the status filter is exact; the sentinel `all` (or no value) disables it
//! - an unknown status value is an error, never a silently dropped filter

use std::str::FromStr;

use serde::Serialize;

/// Largest page size any view will serve.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Status filter value that disables status filtering.
pub const ALL_STATUSES: &str = "all";

/// Errors raised while building a list request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// The status filter does not name a status of this collection.
    #[error("unknown status filter: {0}")]
    InvalidStatusFilter(String),
}

/// The list views, each with its own default page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListView {
    Orders,
    Customers,
    Products,
    Storefront,
    Coupons,
}

impl ListView {
    /// Page size used when the caller does not pass one.
    #[must_use]
    pub const fn default_page_size(self) -> u32 {
        match self {
            Self::Orders => 5,
            Self::Customers => 6,
            Self::Products | Self::Coupons => 10,
            Self::Storefront => 12,
        }
    }
}

/// Exact-match status filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFilter<S> {
    /// No filtering.
    All,
    /// Only records whose status equals this value.
    Only(S),
}

impl<S: FromStr> StatusFilter<S> {
    /// Parse a raw filter value. `None`, blank and `all` mean [`StatusFilter::All`].
    ///
    /// # Errors
    ///
    /// Returns [`ListError::InvalidStatusFilter`] if the value does not parse
    /// as `S`.
    pub fn parse(raw: Option<&str>) -> Result<Self, ListError> {
        match raw.map(str::trim) {
            None | Some("" | ALL_STATUSES) => Ok(Self::All),
            Some(value) => value
                .parse()
                .map(Self::Only)
                .map_err(|_| ListError::InvalidStatusFilter(value.to_string())),
        }
    }
}

impl<S> StatusFilter<S> {
    /// The filter value, if filtering.
    #[must_use]
    pub const fn as_option(&self) -> Option<&S> {
        match self {
            Self::All => None,
            Self::Only(s) => Some(s),
        }
    }
}

impl<S: PartialEq> StatusFilter<S> {
    /// Whether a record with `status` passes the filter.
    #[must_use]
    pub fn admits(&self, status: Option<&S>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => status == Some(wanted),
        }
    }
}

/// Status type for collections that have no status field. It has no values,
/// so any filter other than `all` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoStatus {}

impl FromStr for NoStatus {
    type Err = ListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Err(ListError::InvalidStatusFilter(s.to_string()))
    }
}

/// A validated list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest<S> {
    page: u32,
    page_size: u32,
    search: Option<String>,
    status: StatusFilter<S>,
}

impl<S: FromStr> ListRequest<S> {
    /// Build a request from raw parameters.
    ///
    /// A missing or zero `page` means page 1. A missing or zero `limit` uses
    /// the view default; larger limits are capped at [`MAX_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`ListError::InvalidStatusFilter`] for an unknown status.
    pub fn new(
        view: ListView,
        page: Option<u32>,
        limit: Option<u32>,
        search: Option<&str>,
        status: Option<&str>,
    ) -> Result<Self, ListError> {
        let page_size = match limit {
            None | Some(0) => view.default_page_size(),
            Some(n) => n.min(MAX_PAGE_SIZE),
        };
        Ok(Self {
            page: page.unwrap_or(1).max(1),
            page_size,
            search: normalize_search(search),
            status: StatusFilter::parse(status)?,
        })
    }
}

impl<S> ListRequest<S> {
    /// Requested page (1-based, before clamping).
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Normalized search term.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Status filter.
    #[must_use]
    pub const fn status(&self) -> &StatusFilter<S> {
        &self.status
    }

    /// Resolve the page window once the matching total is known.
    #[must_use]
    pub fn window(&self, total: u64) -> PageWindow {
        PageWindow::resolve(self.page, self.page_size, total)
    }
}

/// Trim a search term; blank means no search.
#[must_use]
pub fn normalize_search(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Case-insensitive substring containment.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// The slice of a collection a page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Page actually served, after clamping.
    pub current_page: u32,
    /// Total pages, at least 1.
    pub total_pages: u32,
    /// Rows to skip.
    pub offset: u64,
    /// Rows to take.
    pub limit: u32,
}

impl PageWindow {
    /// Clamp `requested` into range for a collection of `total` matches.
    #[must_use]
    pub fn resolve(requested: u32, page_size: u32, total: u64) -> Self {
        let page_size = page_size.max(1);
        let pages = total.div_ceil(u64::from(page_size)).max(1);
        let total_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        let current_page = requested.clamp(1, total_pages);
        Self {
            current_page,
            total_pages,
            offset: u64::from(current_page - 1) * u64::from(page_size),
            limit: page_size,
        }
    }
}

/// One page of results plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Wrap fetched items with the window they were fetched for.
    #[must_use]
    pub const fn new(items: Vec<T>, window: &PageWindow) -> Self {
        Self {
            items,
            current_page: window.current_page,
            total_pages: window.total_pages,
        }
    }

    /// Convert the items, keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            total_pages: self.total_pages,
        }
    }
}

/// A record that in-memory listings can search and filter.
pub trait Searchable {
    /// Status type the collection filters on.
    type Status: PartialEq;

    /// Field values the search term is matched against.
    fn search_fields(&self) -> Vec<&str>;

    /// The record's status, if the collection has one.
    fn status(&self) -> Option<Self::Status>;

    /// Whether the record passes the request's search and status filter.
    fn matches(&self, request: &ListRequest<Self::Status>) -> bool {
        let search_ok = request.search().is_none_or(|term| {
            self.search_fields()
                .into_iter()
                .any(|field| contains_ignore_case(field, term))
        });
        search_ok && request.status().admits(self.status().as_ref())
    }
}

/// Apply a list request to an in-memory collection, preserving its order.
#[must_use]
pub fn list_in_memory<T: Searchable + Clone>(
    items: &[T],
    request: &ListRequest<T::Status>,
) -> Page<T> {
    let matching: Vec<&T> = items.iter().filter(|item| item.matches(request)).collect();
    let window = request.window(matching.len() as u64);
    let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
    let page = matching
        .into_iter()
        .skip(offset)
        .take(window.limit as usize)
        .cloned()
        .collect();
    Page::new(page, &window)
}
