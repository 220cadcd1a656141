//! Page records and the reply payloads built from them.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A stored page.
///
/// Owned by the database; the service only holds one for the duration of
/// a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Raw markdown content; `None` when the column is NULL.
    pub content: Option<String>,
}

/// Page identifier exactly as it arrived on the wire.
///
/// Bound to SQL as text; the statements cast it. Accepts a JSON string or
/// number and keeps its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawPageId(String);

impl RawPageId {
    /// Returns the raw text of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawPageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for RawPageId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RawPageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RawPageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Text(text) => Self(text),
            Wire::Number(number) => Self(number.to_string()),
        })
    }
}

/// Reply payload of `all-pages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageList {
    /// Page titles in lexicographic order.
    pub pages: Vec<String>,
}

impl PageList {
    /// Builds the list, sorting titles lexicographically.
    #[must_use]
    pub fn sorted(mut pages: Vec<String>) -> Self {
        pages.sort();
        Self { pages }
    }
}

/// Reply payload of `get-page`.
///
/// A miss serializes as `{"found": false}` with no other fields. A hit
/// always carries `rawContent`, which is `null` for a NULL column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLookup {
    /// Whether a page with the requested title exists.
    pub found: bool,
    /// Page identifier when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Raw markdown when found; the inner `None` is a NULL column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<Option<String>>,
}

impl PageLookup {
    /// Lookup result for a missing page.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            found: false,
            id: None,
            raw_content: None,
        }
    }
}

impl From<Option<Page>> for PageLookup {
    fn from(page: Option<Page>) -> Self {
        match page {
            Some(page) => Self {
                found: true,
                id: Some(page.id),
                raw_content: Some(page.content),
            },
            None => Self::missing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_page_has_only_found_field() {
        let json = serde_json::to_value(PageLookup::missing()).ok();
        assert_eq!(json, Some(serde_json::json!({ "found": false })));
    }

    #[test]
    fn found_page_uses_raw_content_key() {
        let lookup = PageLookup::from(Some(Page {
            id: 7,
            content: Some("# Home".to_string()),
        }));
        let json = serde_json::to_value(lookup).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({ "found": true, "id": 7, "rawContent": "# Home" }))
        );
    }

    #[test]
    fn null_content_is_kept_as_null() {
        let lookup = PageLookup::from(Some(Page { id: 3, content: None }));
        let json = serde_json::to_value(lookup).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({ "found": true, "id": 3, "rawContent": null }))
        );
    }

    #[test]
    fn raw_id_accepts_text_and_numbers() {
        let text: Option<RawPageId> = serde_json::from_value(serde_json::json!("12")).ok();
        let number: Option<RawPageId> = serde_json::from_value(serde_json::json!(12)).ok();
        assert_eq!(text, Some(RawPageId::from(12)));
        assert_eq!(number.as_ref().map(RawPageId::as_str), Some("12"));
        assert!(serde_json::from_value::<RawPageId>(serde_json::json!([1])).is_err());
    }

    #[test]
    fn page_list_is_sorted() {
        let list = PageList::sorted(vec!["b".into(), "Z".into(), "a".into()]);
        assert_eq!(list.pages, vec!["Z", "a", "b"]);
    }
}
