//! List queries and their wire projection.
//!
//! A [`ListQuery`] is rebuilt in full for every interaction that changes paging, sorting or
//! filtering: the current state plus the one field that changed. It is never patched in place
//! after being sent.

use crate::filter::{FilterColumn, FilterValue};
use pview_types::{PageLength, PageNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server-side ordering of the patient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Backing table column, e.g. `birth`.
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    page: PageNumber,
    length: PageLength,
    sort: Option<SortKey>,
    filters: BTreeMap<FilterColumn, FilterValue>,
}

impl ListQuery {
    pub fn new(page: PageNumber, length: PageLength) -> Self {
        Self {
            page,
            length,
            sort: None,
            filters: BTreeMap::new(),
        }
    }

    pub fn page(&self) -> PageNumber {
        self.page
    }

    pub fn length(&self) -> PageLength {
        self.length
    }

    pub fn sort(&self) -> Option<&SortKey> {
        self.sort.as_ref()
    }

    pub fn filters(&self) -> &BTreeMap<FilterColumn, FilterValue> {
        &self.filters
    }

    pub fn with_page(mut self, page: PageNumber) -> Self {
        self.page = page;
        self
    }

    /// Changes the page length. The page resets to 1, since the old page number indexed the
    /// old paging.
    pub fn with_length(mut self, length: PageLength) -> Self {
        self.length = length;
        self.page = PageNumber::FIRST;
        self
    }

    pub fn with_sort(mut self, sort: Option<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_filters(mut self, filters: BTreeMap<FilterColumn, FilterValue>) -> Self {
        self.filters = filters;
        self
    }

    /// Sets or clears the filter on one column.
    pub fn with_filter(mut self, column: FilterColumn, value: Option<FilterValue>) -> Self {
        match value {
            Some(value) => self.filters.insert(column, value),
            None => self.filters.remove(&column),
        };
        self
    }

    pub fn to_params(&self) -> FetchParams {
        let filters = self
            .filters
            .iter()
            .flat_map(|(column, value)| value.wire_entries(*column))
            .collect();

        FetchParams {
            page: self.page,
            length: self.length,
            order_column: self.sort.as_ref().map(|s| s.column.clone()),
            order_desc: self.sort.as_ref().map(|s| s.descending),
            filters,
        }
    }
}

/// Parameters of a `FETCH_DATA` request for the patient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchParams {
    pub page: PageNumber,
    pub length: PageLength,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_desc: Option<bool>,
    /// Filter parameters, one or two keys per filtered column.
    #[serde(flatten)]
    pub filters: BTreeMap<String, serde_json::Value>,
}
