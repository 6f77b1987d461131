use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::{Result, ReviewError};

/// Column order of every review table. Part of the output contract.
pub const REVIEW_COLUMNS: [&str; 7] = [
    "Product Name",
    "Over_All_Rating",
    "Price",
    "Date",
    "Rating",
    "Name",
    "Comment",
];

pub const NO_RATING: &str = "No rating Given";
pub const NO_COMMENT: &str = "No comment Given";
pub const NO_NAME: &str = "No Name given";
pub const NO_DATE: &str = "No Date given";
pub const NO_TITLE: &str = "No title given";
pub const NO_OVERALL_RATING: &str = "No overall rating given";
pub const NO_PRICE: &str = "No price given";

/// One scraped review. Fields are kept as the page rendered them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Over_All_Rating")]
    pub overall_rating: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Rating")]
    pub rating: String,
    #[serde(rename = "Name")]
    pub reviewer_name: String,
    #[serde(rename = "Comment")]
    pub comment: String,
}

/// Detail-page metadata copied onto every review of that product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub title: String,
    pub overall_rating: String,
    pub price: String,
}

impl Default for ProductSummary {
    fn default() -> Self {
        Self {
            title: NO_TITLE.to_string(),
            overall_rating: NO_OVERALL_RATING.to_string(),
            price: NO_PRICE.to_string(),
        }
    }
}

/// A discovered product page, in search-result order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: Url,
    pub position: usize,
}

/// Ordered review records sharing one column schema.
///
/// Pipeline output always carries [`REVIEW_COLUMNS`], even when empty. Only a
/// retrieval for a key that was never stored yields a schemaless dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<ReviewRecord>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self {
            columns: REVIEW_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records: Vec::new(),
        }
    }

    pub fn schemaless() -> Self {
        Self {
            columns: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn from_records(records: Vec<ReviewRecord>) -> Self {
        Self {
            records,
            ..Self::new()
        }
    }

    /// Rows read back from a store; an empty answer means nothing was ever stored.
    pub fn from_stored(records: Vec<ReviewRecord>) -> Self {
        if records.is_empty() {
            Self::schemaless()
        } else {
            Self::from_records(records)
        }
    }

    /// Concatenates per-product tables in order.
    pub fn concat(tables: impl IntoIterator<Item = Dataset>) -> Self {
        let mut out = Self::new();
        for table in tables {
            out.records.extend(table.records);
        }
        out
    }

    pub fn push(&mut self, record: ReviewRecord) {
        if self.columns.is_empty() {
            *self = Self::new();
        }
        self.records.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_schema(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ReviewRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Storage key shared by the primary store and the local fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetKey(String);

impl DatasetKey {
    pub const SEPARATOR: char = '_';

    /// Trims the name and turns each whitespace run (and any path separator) into `_`.
    pub fn from_product_name(product_name: &str) -> Result<Self> {
        let key = product_name
            .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        if key.is_empty() {
            return Err(ReviewError::invalid_input("product name cannot be empty"));
        }
        Ok(Self(key))
    }

    /// Wraps a key read back from a backend listing.
    pub fn from_stored(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.contains(|c: char| c == '/' || c == '\\') {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn display_name(&self) -> String {
        self.0.replace(Self::SEPARATOR, " ")
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
