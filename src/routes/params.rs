use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub const DEFAULT_PER_PAGE: i64 = 20;
    pub const MAX_PER_PAGE: i64 = 100;

    /// Returns `(page, per_page, offset)`.
    pub fn normalize(&self) -> (i64, i64, i64) {
        self.normalize_with(Self::DEFAULT_PER_PAGE)
    }

    pub fn normalize_with(&self, default_per_page: i64) -> (i64, i64, i64) {
        let page = self
            .page
            .unwrap_or(1)
            .clamp(1, i64::MAX / Self::MAX_PER_PAGE);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, Self::MAX_PER_PAGE);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MenuSortBy {
    Name,
    Price,
    CreatedAt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page() {
        let p = Pagination::default();
        assert_eq!(p.normalize(), (1, 20, 0));
        assert_eq!(p.normalize_with(10), (1, 10, 0));
    }

    #[test]
    fn clamps_out_of_range_values() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.normalize(), (1, 100, 0));

        let p = Pagination {
            page: Some(3),
            per_page: Some(0),
        };
        assert_eq!(p.normalize(), (3, 1, 2));

        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(20),
        };
        let (page, per_page, offset) = p.normalize();
        assert_eq!(page, i64::MAX / Pagination::MAX_PER_PAGE);
        assert_eq!(per_page, 20);
        assert_eq!(offset, (page - 1) * 20);
        assert!(offset >= 0);
    }

    #[test]
    fn offset_follows_page() {
        let p = Pagination {
            page: Some(4),
            per_page: Some(15),
        };
        assert_eq!(p.normalize(), (4, 15, 45));
    }
}
