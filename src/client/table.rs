use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

use crate::inventory::{
    derive_group_state, group_rows, sort_items, FilterChange, GroupKey, GroupRow, GroupState, InventoryFilter,
    ProductView, RowKind, SelectionSet, SortField,
};
use crate::types::Page;

use super::{ClientError, InventoryClient};

/// Which columns the user wants to see. Persisted by the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPreferences {
    hidden: HashSet<SortField>,
}

impl Default for ColumnPreferences {
    fn default() -> Self {
        Self {
            hidden: [SortField::PurchaseDate, SortField::Cost, SortField::CreatedAt, SortField::UpdatedAt]
                .into_iter()
                .collect(),
        }
    }
}

impl ColumnPreferences {
    pub fn is_visible(&self, column: SortField) -> bool {
        !self.hidden.contains(&column)
    }

    /// The name column is always shown.
    pub fn set_visible(&mut self, column: SortField, visible: bool) {
        if visible || column == SortField::Name {
            self.hidden.remove(&column);
        } else {
            self.hidden.insert(column);
        }
    }

    pub fn toggle(&mut self, column: SortField) {
        let visible = self.is_visible(column);
        self.set_visible(column, !visible);
    }

    pub fn visible_columns(&self) -> Vec<SortField> {
        SortField::ALL.into_iter().filter(|c| self.is_visible(*c)).collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One line of the rendered table, in display order.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRow<'a> {
    /// A serialized item.
    Item { item: &'a ProductView, selected: bool },
    /// The summary line of a stack.
    Stack {
        row: &'a GroupRow<ProductView>,
        state: GroupState,
        expanded: bool,
    },
    /// A member of an expanded stack.
    Member { item: &'a ProductView, selected: bool },
}

/// Table state: the current filter, the grouped rows of the last fetch,
/// expansion, selection and the inline error of a failed fetch.
#[derive(Debug, Clone, Default)]
pub struct InventoryTable {
    filter: InventoryFilter,
    rows: Vec<GroupRow<ProductView>>,
    total: u64,
    total_pages: u32,
    expanded: BTreeSet<GroupKey>,
    selection: SelectionSet,
    error: Option<String>,
    pub columns: ColumnPreferences,
}

impl InventoryTable {
    pub fn new(filter: InventoryFilter) -> Self {
        Self { filter, ..Self::default() }
    }

    pub fn from_query_str(query: &str) -> Self {
        Self::new(InventoryFilter::from_query_str(query))
    }

    pub fn filter(&self) -> &InventoryFilter {
        &self.filter
    }

    pub fn query_string(&self) -> String {
        self.filter.to_query_string()
    }

    /// Applies a filter edit and returns the query string to navigate to.
    pub fn apply(&mut self, change: FilterChange) -> String {
        self.filter = self.filter.apply(change);
        self.query_string()
    }

    /// Takes the outcome of a fetch. Items are sorted on the active sort
    /// before grouping. On failure the rows and the selection are cleared
    /// and the error text is kept for inline display.
    pub fn load(&mut self, result: Result<Page<ProductView>, ClientError>) {
        match result {
            Ok(page) => {
                let mut items = page.items;
                sort_items(&mut items, self.filter.effective_sort());
                self.rows = group_rows(items);
                self.total = page.total;
                self.total_pages = page.total_pages;
                self.error = None;

                let known: Vec<Uuid> = self.rows.iter().flat_map(|r| r.member_ids()).collect();
                self.selection.retain_known(known.iter());
                let keys: BTreeSet<GroupKey> = self.rows.iter().map(|r| r.key.clone()).collect();
                self.expanded.retain(|k| keys.contains(k));
            }
            Err(err) => {
                tracing::warn!("Inventory fetch failed: {}", err);
                self.rows.clear();
                self.total = 0;
                self.total_pages = 0;
                self.expanded.clear();
                self.selection.clear();
                self.error = Some(err.to_string());
            }
        }
    }

    /// Fetches the current filter through `client` and loads the result.
    pub async fn refresh(&mut self, client: &InventoryClient) {
        let result = client.list(&self.filter).await;
        self.load(result);
    }

    pub fn rows(&self) -> &[GroupRow<ProductView>] {
        &self.rows
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn is_expanded(&self, key: &GroupKey) -> bool {
        self.expanded.contains(key)
    }

    /// Only stacks expand. Returns the new expansion state.
    pub fn toggle_expanded(&mut self, key: &GroupKey) -> bool {
        if !self.rows.iter().any(|r| &r.key == key && r.kind == RowKind::Stack) {
            return false;
        }
        if !self.expanded.remove(key) {
            self.expanded.insert(key.clone());
            return true;
        }
        false
    }

    pub fn toggle_item(&mut self, id: Uuid) -> bool {
        self.selection.toggle_item(id)
    }

    pub fn group_state(&self, key: &GroupKey) -> Option<GroupState> {
        let row = self.rows.iter().find(|r| &r.key == key)?;
        Some(derive_group_state(&self.selection, &row.member_ids()))
    }

    /// Group checkbox: selects every member unless all are already
    /// selected, in which case it deselects them.
    pub fn toggle_group(&mut self, key: &GroupKey) -> Option<GroupState> {
        let members = self.rows.iter().find(|r| &r.key == key)?.member_ids();
        Some(self.selection.toggle_group(&members))
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Flattened display rows, honouring expansion.
    pub fn visible_rows(&self) -> Vec<TableRow<'_>> {
        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match row.kind {
                RowKind::Serialized => {
                    for item in &row.items {
                        out.push(TableRow::Item { item, selected: self.selection.contains(&item.id) });
                    }
                }
                RowKind::Stack => {
                    let expanded = self.expanded.contains(&row.key);
                    out.push(TableRow::Stack {
                        row,
                        state: derive_group_state(&self.selection, &row.member_ids()),
                        expanded,
                    });
                    if expanded {
                        for item in &row.items {
                            out.push(TableRow::Member { item, selected: self.selection.contains(&item.id) });
                        }
                    }
                }
            }
        }
        out
    }
}
