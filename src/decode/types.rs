//! Decoded page types and the decoding trait

use super::decoders::{expect_array, expect_object, expect_string, field_path, optional_count};
use crate::error::Result;
use serde_json::{Map, Value};

/// A page shape that can be decoded from a JSON body
pub trait DecodePage: Sized {
    /// Decode and validate a JSON body
    fn decode(body: &Value) -> Result<Self>;

    /// Whether this page carries no items (the pagination terminator)
    fn is_terminal(&self) -> bool;
}

/// Body of `GET /auth/token`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    /// Bearer token for subsequent requests
    pub token: String,
}

/// Body of `GET /apis/categories?page=N`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryPage {
    /// Total count reported by the source, if any
    pub count: Option<i64>,
    /// Category names on this page
    pub categories: Vec<String>,
}

/// One listing inside an entry page
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The API URL (`Link` in the payload)
    pub link: String,
    /// Remaining fields (`API`, `Description`, `Auth`, ...), kept verbatim
    pub extra: Map<String, Value>,
}

/// Body of `GET /apis/entry?category=<name>&page=N`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryPage {
    /// Total count reported by the source, if any
    pub count: Option<i64>,
    /// Listings on this page (the source names this array `categories`)
    pub entries: Vec<Entry>,
}

impl DecodePage for CategoryPage {
    fn decode(body: &Value) -> Result<Self> {
        let obj = expect_object(body, "$")?;
        let count = optional_count(obj)?;
        let items = expect_array(obj.get("categories"), "categories")?;

        let categories = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                expect_string(Some(item), &field_path("categories", Some(i), None)).map(String::from)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { count, categories })
    }

    fn is_terminal(&self) -> bool {
        self.categories.is_empty()
    }
}

impl DecodePage for EntryPage {
    fn decode(body: &Value) -> Result<Self> {
        let obj = expect_object(body, "$")?;
        let count = optional_count(obj)?;
        let items = expect_array(obj.get("categories"), "categories")?;

        let mut entries = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let entry = expect_object(item, &field_path("categories", Some(i), None))?;
            let link = expect_string(
                entry.get("Link"),
                &field_path("categories", Some(i), Some("Link")),
            )?;

            let mut extra = entry.clone();
            extra.remove("Link");
            entries.push(Entry {
                link: link.to_string(),
                extra,
            });
        }

        Ok(Self { count, entries })
    }

    fn is_terminal(&self) -> bool {
        self.entries.is_empty()
    }
}
