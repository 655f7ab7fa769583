use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Query-string pagination, 1-based: `?page=2&per_page=50`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "first_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub per_page: u64,
}

fn first_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    /// Effective page size, capped so a caller cannot request a whole table.
    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.limit()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        Self {
            items,
            total,
            page: params.page,
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_zero_based_from_one_based_pages() {
        let params = PaginationParams { page: 3, per_page: 20 };
        assert_eq!(params.offset(), 40);
        assert_eq!(PaginationParams::default().offset(), 0);
    }

    #[test]
    fn page_size_is_capped() {
        let params = PaginationParams { page: 1, per_page: 10_000 };
        assert_eq!(params.limit(), MAX_PAGE_SIZE);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PaginationParams { page: 1, per_page: 20 };
        assert_eq!(Paginated::<u8>::new(vec![], 41, &params).total_pages, 3);
        assert_eq!(Paginated::<u8>::new(vec![], 0, &params).total_pages, 0);
    }
}
