//! Page/size/sort parameters for list operations and the page envelope
//! returned to callers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{AuthgateError, Result};

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = AuthgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AuthgateError::validation_field(
                format!("Unknown sort order '{}'", other),
                "order",
            )),
        }
    }
}

/// Raw paging parameters as supplied by a caller. Pages are zero-based.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
}

/// Per-resource defaults and the sortable fields mapped to their columns.
#[derive(Debug, Clone, Copy)]
pub struct PageDefaults {
    pub size: u32,
    pub sort: &'static str,
    pub order: SortOrder,
    pub sortable: &'static [(&'static str, &'static str)],
}

/// Paging parameters after defaults and the sort whitelist are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPage {
    pub page: u32,
    pub size: u32,
    pub column: &'static str,
    pub order: SortOrder,
}

impl ResolvedPage {
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page: Some(page), size: Some(size), sort: None, order: None }
    }

    pub fn sorted(mut self, sort: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(sort.into());
        self.order = Some(order);
        self
    }

    /// Apply `defaults`, clamp the size and map the sort field to a column.
    /// Unknown sort fields are rejected rather than interpolated into SQL.
    pub fn resolve(&self, defaults: &PageDefaults) -> Result<ResolvedPage> {
        let sort = self.sort.as_deref().unwrap_or(defaults.sort);
        let column = defaults
            .sortable
            .iter()
            .find(|(field, _)| *field == sort)
            .map(|(_, column)| *column)
            .ok_or_else(|| {
                AuthgateError::validation_field(format!("Cannot sort by '{}'", sort), "sort")
            })?;

        Ok(ResolvedPage {
            page: self.page.unwrap_or(0),
            size: self.size.unwrap_or(defaults.size).clamp(1, MAX_PAGE_SIZE),
            column,
            order: self.order.unwrap_or(defaults.order),
        })
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, resolved: &ResolvedPage, total_elements: i64) -> Self {
        let size = i64::from(resolved.size);
        Self {
            content,
            page: resolved.page,
            size: resolved.size,
            total_elements,
            total_pages: (total_elements + size - 1) / size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
