use serde::Serialize;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Normalised page window. `limit` is clamped to `[1, 100]`, `page` is 1-based with a floor of 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pages(&self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        (total + self.limit - 1) / self.limit
    }

    pub fn meta(&self, total: i64) -> PaginationMeta {
        PaginationMeta {
            page: self.page,
            limit: self.limit,
            total,
            pages: self.pages(total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_missing() {
        let pagination = Pagination::new(None, None);
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.limit, 20);
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn limit_is_clamped_and_page_floored() {
        assert_eq!(Pagination::new(Some(0), Some(0)).limit, 1);
        assert_eq!(Pagination::new(Some(-3), Some(500)).limit, 100);
        assert_eq!(Pagination::new(Some(-3), Some(500)).page, 1);
        assert_eq!(Pagination::new(Some(3), Some(25)).offset(), 50);
    }

    #[test]
    fn paging_through_a_sorted_sequence_visits_every_item_once() {
        let items: Vec<i64> = (0..47).rev().collect();
        let limit = 10;
        let total = items.len() as i64;
        let pages = Pagination::new(Some(1), Some(limit)).pages(total);
        assert_eq!(pages, 5);

        let mut seen = Vec::new();
        for page in 1..=pages {
            let window = Pagination::new(Some(page), Some(limit));
            let start = window.offset() as usize;
            let end = (start + window.limit as usize).min(items.len());
            seen.extend_from_slice(&items[start..end]);
        }

        assert_eq!(seen, items);
    }

    #[test]
    fn zero_total_has_zero_pages() {
        let meta = Pagination::default().meta(0);
        assert_eq!(meta.pages, 0);
        assert_eq!(meta.total, 0);
    }
}
