//! Typed inventory filter and its query-string form.
//!
//! The query string is the single source of truth for list state. Both the
//! client (building URLs) and the server (decoding `GET /api/v1/inventory`)
//! go through [`InventoryFilter::to_query_string`] and
//! [`InventoryFilter::from_query_str`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::form_urlencoded;

use crate::filter::{FilterData, SortDirection};

use super::model::{Product, ProductStatus};
use super::sort::{SortField, SortSpec};

pub const DEFAULT_PER_PAGE: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub location: Option<String>,
    pub status: Option<ProductStatus>,
    pub sort: Option<SortSpec>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for InventoryFilter {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            brand: None,
            location: None,
            status: None,
            sort: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// A single user edit of the list state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Search(Option<String>),
    Category(Option<String>),
    Brand(Option<String>),
    Location(Option<String>),
    Status(Option<ProductStatus>),
    Sort(Option<SortSpec>),
    PerPage(u32),
    Page(u32),
    Reset,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl InventoryFilter {
    /// Returns the filter after `change`. Anything but page navigation
    /// sends the user back to page 1.
    pub fn apply(&self, change: FilterChange) -> Self {
        let mut next = self.clone();
        match change {
            FilterChange::Page(page) => {
                next.page = page.max(1);
                return next;
            }
            FilterChange::Search(v) => next.search = non_blank(v),
            FilterChange::Category(v) => next.category = non_blank(v),
            FilterChange::Brand(v) => next.brand = non_blank(v),
            FilterChange::Location(v) => next.location = non_blank(v),
            FilterChange::Status(v) => next.status = v,
            FilterChange::Sort(v) => next.sort = v,
            FilterChange::PerPage(v) => next.per_page = if v == 0 { DEFAULT_PER_PAGE } else { v },
            FilterChange::Reset => next = Self { per_page: self.per_page, ..Self::default() },
        }
        next.page = 1;
        next
    }

    /// Canonical order: search, category, brand, location, status, sort,
    /// order, page, per_page. Empty values are omitted, `page` is always
    /// written and `per_page` only when not the default.
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        if let Some(v) = &self.search { out.append_pair("search", v); }
        if let Some(v) = &self.category { out.append_pair("category", v); }
        if let Some(v) = &self.brand { out.append_pair("brand", v); }
        if let Some(v) = &self.location { out.append_pair("location", v); }
        if let Some(v) = &self.status { out.append_pair("status", v.as_str()); }
        if let Some(sort) = &self.sort {
            out.append_pair("sort", sort.field.as_str());
            out.append_pair("order", sort.direction.as_str());
        }
        out.append_pair("page", &self.page.to_string());
        if self.per_page != DEFAULT_PER_PAGE {
            out.append_pair("per_page", &self.per_page.to_string());
        }
        out.finish()
    }

    /// Lenient decode: unknown keys and unparseable values fall back to
    /// defaults, later duplicates win.
    pub fn from_query_str(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut filter = Self::default();
        let mut sort_field: Option<SortField> = None;
        let mut direction = SortDirection::Asc;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "search" => filter.search = non_blank(Some(value)),
                "category" => filter.category = non_blank(Some(value)),
                "brand" => filter.brand = non_blank(Some(value)),
                "location" => filter.location = non_blank(Some(value)),
                "status" => filter.status = value.parse().ok(),
                "sort" => sort_field = value.parse().ok(),
                "order" => direction = SortDirection::parse_lenient(&value),
                "page" => filter.page = value.trim().parse::<u32>().ok().filter(|p| *p >= 1).unwrap_or(1),
                "per_page" => {
                    filter.per_page = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|p| *p >= 1)
                        .unwrap_or(DEFAULT_PER_PAGE)
                }
                _ => {}
            }
        }

        filter.sort = sort_field.map(|field| SortSpec::new(field, direction));
        filter
    }

    pub fn with_max_per_page(mut self, max_per_page: u32) -> Self {
        self.per_page = self.per_page.clamp(1, max_per_page.max(1));
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn effective_sort(&self) -> SortSpec {
        self.sort.unwrap_or_else(SortSpec::default_order)
    }

    /// In-memory equivalent of the SQL produced by [`Self::to_filter_data`].
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = product.name.to_lowercase().contains(&term)
                || product.brand.to_lowercase().contains(&term)
                || product
                    .serial_number
                    .as_deref()
                    .map(|s| s.to_lowercase().contains(&term))
                    .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        let same = |wanted: &Option<String>, actual: &str| match wanted {
            Some(w) => w.to_lowercase() == actual.to_lowercase(),
            None => true,
        };
        same(&self.category, &product.category)
            && same(&self.brand, &product.brand)
            && same(&self.location, &product.location)
            && self.status.map(|s| s == product.status).unwrap_or(true)
    }

    /// Where/order/limit document for the SQL filter builder.
    pub fn to_filter_data(&self) -> FilterData {
        let mut conditions = Map::new();
        if let Some(term) = &self.search {
            let pattern = format!("%{}%", escape_like(term));
            conditions.insert(
                "$or".to_string(),
                json!([
                    { "name": { "$ilike": pattern } },
                    { "brand": { "$ilike": pattern } },
                    { "serial_number": { "$ilike": pattern } }
                ]),
            );
        }
        for (column, value) in [("category", &self.category), ("brand", &self.brand), ("location", &self.location)] {
            if let Some(v) = value {
                conditions.insert(column.to_string(), json!({ "$ilike": escape_like(v) }));
            }
        }
        if let Some(status) = self.status {
            conditions.insert("status".to_string(), json!(status.as_str()));
        }

        let sort = self.effective_sort();
        FilterData {
            where_clause: Some(Value::Object(conditions)),
            order: Some(json!(format!("{} {}, id asc", sort.field.as_str(), sort.direction.as_str()))),
            limit: Some(i64::from(self.per_page)),
            offset: Some(self.offset() as i64),
        }
    }
}

/// Escapes `%`, `_` and `\` for use inside an ILIKE pattern.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
