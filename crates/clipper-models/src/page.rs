//! Paginated response envelope.

use serde::Deserialize;

/// One page of a Helix collection response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Pagination block. The cursor is opaque and only forwarded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    /// Cursor for the next page, `None` when the collection is exhausted.
    pub fn next_cursor(&self) -> Option<&str> {
        self.pagination
            .cursor
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_pagination_means_exhausted() {
        let page: Page<u32> = serde_json::from_str(r#"{"data":[1,2]}"#).unwrap();
        assert_eq!(page.data, vec![1, 2]);
        assert_eq!(page.next_cursor(), None);
    }

    #[test]
    fn test_empty_cursor_means_exhausted() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"data":[],"pagination":{"cursor":""}}"#).unwrap();
        assert_eq!(page.next_cursor(), None);

        let page: Page<u32> =
            serde_json::from_str(r#"{"data":[1],"pagination":{"cursor":"eyJiIjpudWxsfQ"}}"#)
                .unwrap();
        assert_eq!(page.next_cursor(), Some("eyJiIjpudWxsfQ"));
    }
}
