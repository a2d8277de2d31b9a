//! Cursor pagination info carried by list responses.
//!
//! List endpoints answer with `{"data": [...], "nextCursor": "..."}` and
//! some also report a `total`. Extraction is best-effort: any other shape
//! yields an empty [`PageInfo`].

use serde_json::Value;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub next_cursor: String,
    pub has_next: bool,
    pub total: i64,
}

impl PageInfo {
    /// Reads `nextCursor` and `total` from a decoded response.
    ///
    /// `total` is only read when it is a JSON number; a numeric string is
    /// treated as absent.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };

        let next_cursor = map
            .get("nextCursor")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let total = map
            .get("total")
            .and_then(Value::as_f64)
            .map(|t| t as i64)
            .unwrap_or_default();

        Self {
            has_next: !next_cursor.is_empty(),
            next_cursor,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_with_cursor_and_total() {
        let info = PageInfo::from_value(&json!({
            "data": [{"id": "1"}],
            "nextCursor": "eyJsaW1pdCI6MTAwfQ",
            "total": 250
        }));

        assert_eq!(
            info,
            PageInfo {
                next_cursor: "eyJsaW1pdCI6MTAwfQ".to_string(),
                has_next: true,
                total: 250,
            }
        );
    }

    #[test]
    fn test_last_page() {
        let info = PageInfo::from_value(&json!({"data": [], "nextCursor": null}));
        assert!(!info.has_next);
        assert_eq!(info.next_cursor, "");

        let info = PageInfo::from_value(&json!({"data": [], "nextCursor": ""}));
        assert!(!info.has_next);
    }

    #[test]
    fn test_float_total_is_truncated() {
        let info = PageInfo::from_value(&json!({"total": 12.0}));
        assert_eq!(info.total, 12);
    }

    #[test]
    fn test_non_numeric_total_is_zero() {
        let info = PageInfo::from_value(&json!({"total": "12"}));
        assert_eq!(info.total, 0);
    }

    #[test]
    fn test_other_shapes_yield_empty_info() {
        for value in [json!([1, 2, 3]), json!("cursor"), json!(null), json!(42)] {
            assert_eq!(PageInfo::from_value(&value), PageInfo::default());
        }
    }
}
