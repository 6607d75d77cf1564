//! Catalog filtering and pagination.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::{Category, Size};
use crate::error::{Error, Result};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for the product listing. All filters are optional and
/// AND-combined.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFilter {
    pub search: Option<String>,
    /// Raw category parameter; `All` (the frontend's sentinel) and the empty
    /// string mean unfiltered.
    pub category: Option<String>,
    pub size: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl CatalogFilter {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    pub fn category(&self) -> Result<Option<Category>> {
        match self.category.as_deref() {
            None | Some("") | Some("All") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }

    pub fn size(&self) -> Result<Option<Size>> {
        match self.size.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }

    pub fn price_bounds(&self) -> Result<()> {
        for bound in [self.min_price, self.max_price].into_iter().flatten() {
            if bound < Decimal::ZERO {
                return Err(Error::Validation("Price bounds cannot be negative".into()));
            }
        }
        Ok(())
    }
}

/// One page of results plus the metadata the listing endpoints report.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Page<T> {
    /// `limit` must be >= 1; `total_pages` is `ceil(total / limit)`.
    pub fn new(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = (total + limit - 1) / limit;
        Self {
            items,
            total,
            current_page: page,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_the_ceiling() {
        let page = Page::new(vec![0; 10], 21, 1, 10);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(!page.has_prev_page);
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::new(vec![0; 1], 21, 3, 10);
        assert!(!page.has_next_page);
        assert!(page.has_prev_page);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page = Page::<i32>::new(vec![], 0, 1, 10);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
    }

    #[test]
    fn exact_multiple_does_not_round_up() {
        assert_eq!(Page::new(vec![0; 10], 20, 2, 10).total_pages, 2);
    }

    #[test]
    fn all_category_means_unfiltered() {
        let filter = CatalogFilter {
            category: Some("All".into()),
            ..Default::default()
        };
        assert_eq!(filter.category().unwrap(), None);
    }

    #[test]
    fn unknown_category_is_a_validation_error() {
        let filter = CatalogFilter {
            category: Some("Shoes".into()),
            ..Default::default()
        };
        assert!(filter.category().is_err());
    }

    #[test]
    fn limit_is_clamped() {
        let filter = CatalogFilter {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(filter.limit(), MAX_PAGE_SIZE);
        let filter = CatalogFilter::default();
        assert_eq!(filter.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(filter.page(), 1);
    }

    #[test]
    fn negative_price_bound_is_rejected() {
        let filter = CatalogFilter {
            min_price: Some(Decimal::new(-1, 0)),
            ..Default::default()
        };
        assert!(filter.price_bounds().is_err());
    }
}
