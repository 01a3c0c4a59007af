//! Paging and sorting descriptors shared by all finders.
//!
//! Page numbers are zero-based.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Sort order for a single property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }
}

/// Ordered list of sort orders; empty means unsorted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort {
    pub orders: Vec<Order>,
}

impl Sort {
    /// Sort by the given properties, all in one direction
    pub fn by(direction: Direction, properties: &[&str]) -> Self {
        Self {
            orders: properties
                .iter()
                .map(|p| Order {
                    property: (*p).to_string(),
                    direction,
                })
                .collect(),
        }
    }

    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    /// Append another sort as lower-priority orders
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }
}

/// Page request (page index, page size, sort)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_size")]
    pub size: u64,
    #[serde(default)]
    pub sort: Sort,
}

/// Largest offset a database accepts as a signed 64-bit integer
const MAX_OFFSET: u64 = i64::MAX as u64;

fn default_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl PageRequest {
    /// Unsorted request. Size is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn of(page: u64, size: u64) -> Self {
        Self::of_sorted(page, size, Sort::unsorted())
    }

    /// Sorted request. Size is clamped to `1..=MAX_PAGE_SIZE` and the page
    /// index so that the offset fits a signed 64-bit SQL integer.
    pub fn of_sorted(page: u64, size: u64, sort: Sort) -> Self {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        Self {
            page: page.min(MAX_OFFSET / size),
            size,
            sort,
        }
    }

    /// Calculate offset for database query, capped at `i64::MAX`
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.limit()).min(MAX_OFFSET)
    }

    /// Get limit capped at maximum
    pub fn limit(&self) -> u64 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Total element count implied by the content alone, if any.
    ///
    /// A first page that is not full, or any non-empty page that is not full,
    /// makes the count query unnecessary.
    pub fn known_total(&self, content_len: usize) -> Option<u64> {
        let len = content_len as u64;
        if self.offset() == 0 {
            return (self.limit() > len).then_some(len);
        }
        (len != 0 && self.limit() > len).then_some(self.offset() + len)
    }

    /// Request for the following page
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// Request for the previous page, or the first page
    pub fn previous_or_first(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1),
            ..self.clone()
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::of(0, DEFAULT_PAGE_SIZE)
    }
}

/// A page of content plus the total element count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u64,
    pub size: u64,
    pub total_elements: u64,
}

impl<T> Page<T> {
    /// Create a page from a content slice and the total count
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page,
            size: request.limit(),
            total_elements,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_pages(&self) -> u64 {
        if self.size > 0 {
            self.total_elements.div_ceil(self.size)
        } else {
            0
        }
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn has_next(&self) -> bool {
        self.number.saturating_add(1) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    /// Convert the content, keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

/// A page of content that only knows whether a next page exists
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice<T> {
    pub content: Vec<T>,
    pub number: u64,
    pub size: u64,
    has_next: bool,
}

impl<T> Slice<T> {
    /// Build a slice from up to `size + 1` fetched rows; the extra row only
    /// signals that a next page exists.
    pub fn from_lookahead(mut rows: Vec<T>, request: &PageRequest) -> Self {
        let size = request.limit();
        let has_next = rows.len() as u64 > size;
        rows.truncate(size as usize);
        Self {
            content: rows,
            number: request.page,
            size,
            has_next,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    pub fn is_last(&self) -> bool {
        !self.has_next
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Slice<U> {
        Slice {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_five_rows_by_three() {
        let request = PageRequest::of_sorted(0, 3, Sort::by(Direction::Desc, &["username"]));
        let page = Page::new(vec![1, 2, 3], &request, 5);

        assert_eq!(page.number_of_elements(), 3);
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages(), 2);
        assert!(page.is_first());
        assert!(page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::new(vec![4, 5], &PageRequest::of(1, 3), 5);
        assert!(page.is_last());
        assert!(page.has_previous());
    }

    #[test]
    fn empty_page_has_zero_pages() {
        let page: Page<i32> = Page::new(vec![], &PageRequest::of(0, 10), 0);
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next());
    }

    #[test]
    fn request_size_is_clamped() {
        assert_eq!(PageRequest::of(0, 0).limit(), 1);
        assert_eq!(PageRequest::of(0, 10_000).limit(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::of(2, 3).offset(), 6);
        assert_eq!(PageRequest::of(0, 3).previous_or_first().page, 0);
        assert_eq!(PageRequest::of(0, 3).next().page, 1);
    }

    #[test]
    fn huge_page_index_keeps_offset_in_range() {
        let request = PageRequest::of(u64::MAX / 2, 3);
        assert!(request.offset() <= i64::MAX as u64);
        assert_eq!(request.page, (i64::MAX as u64) / 3);

        // Deserialized requests bypass the constructor
        let json = format!(r#"{{"page":{},"size":3}}"#, u64::MAX);
        let raw: PageRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(raw.offset(), i64::MAX as u64);
        assert_eq!(raw.known_total(0), None);
        assert_eq!(raw.next().page, u64::MAX);
    }

    #[test]
    fn last_possible_page_number_has_no_next() {
        let page: Page<i32> = Page {
            content: vec![],
            number: u64::MAX,
            size: 3,
            total_elements: 0,
        };
        assert!(!page.has_next());
        assert!(page.is_last());
    }

    #[test]
    fn known_total_skips_count_only_for_partial_pages() {
        let first = PageRequest::of(0, 3);
        assert_eq!(first.known_total(2), Some(2));
        assert_eq!(first.known_total(3), None);

        let second = PageRequest::of(1, 3);
        assert_eq!(second.known_total(2), Some(5));
        assert_eq!(second.known_total(0), None);
        assert_eq!(second.known_total(3), None);
    }

    #[test]
    fn slice_uses_lookahead_row() {
        let slice = Slice::from_lookahead(vec!['a', 'b', 'c', 'd'], &PageRequest::of(0, 3));
        assert_eq!(slice.content(), &['a', 'b', 'c']);
        assert!(slice.has_next());

        let last = Slice::from_lookahead(vec!['a'], &PageRequest::of(1, 3));
        assert!(last.is_last());
        assert!(!last.is_first());
    }

    #[test]
    fn map_keeps_metadata() {
        let page = Page::new(vec![1, 2, 3], &PageRequest::of(0, 3), 5).map(|n| n * 10);
        assert_eq!(page.content, vec![10, 20, 30]);
        assert_eq!(page.total_pages(), 2);
    }

    #[test]
    fn sort_serializes_direction_uppercase() {
        let sort = Sort::by(Direction::Desc, &["username"]).and(Sort::by(Direction::Asc, &["age"]));
        let json = serde_json::to_string(&sort).unwrap();
        assert!(json.contains("\"DESC\""));
        assert_eq!(sort.orders.len(), 2);
    }
}
