//! Groups inventory items into stacks and serialized singletons.
//!
//! Serialized items (non-blank serial number) always form their own group,
//! keyed `SERIAL:<id>`. Items without a serial number are stacked by
//! lower-cased name, brand, category and location:
//! `STACK:<name>|<brand>|<category>|<location>`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use super::model::Product;
use super::view::ProductView;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    const SERIAL_PREFIX: &'static str = "SERIAL:";
    const STACK_PREFIX: &'static str = "STACK:";

    pub fn serial(id: Uuid) -> Self {
        GroupKey(format!("{}{}", Self::SERIAL_PREFIX, id))
    }

    pub fn stack(name: &str, brand: &str, category: &str, location: &str) -> Self {
        GroupKey(format!(
            "{}{}|{}|{}|{}",
            Self::STACK_PREFIX,
            name.to_lowercase(),
            brand.to_lowercase(),
            category.to_lowercase(),
            location.to_lowercase()
        ))
    }

    pub fn is_stack(&self) -> bool {
        self.0.starts_with(Self::STACK_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields the grouping heuristic reads.
pub trait Groupable {
    fn item_id(&self) -> Uuid;
    fn serial(&self) -> Option<&str>;
    fn name(&self) -> &str;
    fn brand(&self) -> &str;
    fn category(&self) -> &str;
    fn location(&self) -> &str;
}

macro_rules! impl_groupable {
    ($ty:ty) => {
        impl Groupable for $ty {
            fn item_id(&self) -> Uuid { self.id }
            fn serial(&self) -> Option<&str> { self.serial_number.as_deref() }
            fn name(&self) -> &str { &self.name }
            fn brand(&self) -> &str { &self.brand }
            fn category(&self) -> &str { &self.category }
            fn location(&self) -> &str { &self.location }
        }
    };
}

impl_groupable!(Product);
impl_groupable!(ProductView);

pub fn group_key<T: Groupable>(item: &T) -> GroupKey {
    match item.serial().map(str::trim) {
        Some(serial) if !serial.is_empty() => GroupKey::serial(item.item_id()),
        _ => GroupKey::stack(item.name(), item.brand(), item.category(), item.location()),
    }
}

/// Buckets in order of first appearance.
#[derive(Debug, Clone)]
pub struct Groups<T> {
    order: Vec<GroupKey>,
    buckets: HashMap<GroupKey, Vec<T>>,
}

impl<T> Groups<T> {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&[T]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.order.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[T])> {
        self.order
            .iter()
            .filter_map(|key| self.buckets.get(key).map(|items| (key, items.as_slice())))
    }

    pub fn into_vec(mut self) -> Vec<(GroupKey, Vec<T>)> {
        self.order
            .into_iter()
            .filter_map(|key| self.buckets.remove(&key).map(|items| (key, items)))
            .collect()
    }
}

/// Single pass; callers sort beforehand if they want a particular order.
pub fn group_items<T, I>(items: I) -> Groups<T>
where
    T: Groupable,
    I: IntoIterator<Item = T>,
{
    let mut groups = Groups { order: Vec::new(), buckets: HashMap::new() };
    for item in items {
        let key = group_key(&item);
        match groups.buckets.get_mut(&key) {
            Some(bucket) => bucket.push(item),
            None => {
                groups.order.push(key.clone());
                groups.buckets.insert(key, vec![item]);
            }
        }
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Serialized,
    Stack,
}

/// One table row: a serialized item, or the summary of a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow<T> {
    pub key: GroupKey,
    pub kind: RowKind,
    pub label: String,
    pub quantity: usize,
    pub items: Vec<T>,
}

impl<T> GroupRow<T> {
    pub fn member_ids(&self) -> Vec<Uuid>
    where
        T: Groupable,
    {
        self.items.iter().map(Groupable::item_id).collect()
    }
}

/// `Laptop (x2)`; a stack of one shows the bare name.
pub fn stack_label(name: &str, quantity: usize) -> String {
    if quantity > 1 {
        format!("{} (x{})", name, quantity)
    } else {
        name.to_string()
    }
}

pub fn group_rows<T, I>(items: I) -> Vec<GroupRow<T>>
where
    T: Groupable,
    I: IntoIterator<Item = T>,
{
    group_items(items)
        .into_vec()
        .into_iter()
        .map(|(key, items)| {
            let quantity = items.len();
            // Non-empty by construction
            let name = items.first().map(|i| i.name().to_string()).unwrap_or_default();
            if key.is_stack() {
                GroupRow { label: stack_label(&name, quantity), key, kind: RowKind::Stack, quantity, items }
            } else {
                GroupRow { label: name, key, kind: RowKind::Serialized, quantity, items }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::model::NewProduct;

    fn item(name: &str, brand: &str, serial: Option<&str>) -> Product {
        let mut p = Product::create(NewProduct {
            name: name.into(),
            brand: brand.into(),
            category: "Computers".into(),
            location: "HQ".into(),
            ..Default::default()
        })
        .unwrap();
        // Bypass normalisation to exercise raw client-side values
        p.serial_number = serial.map(str::to_string);
        p
    }

    #[test]
    fn empty_and_null_serials_stack_together() {
        let rows = group_rows(vec![item("Laptop", "Dell", Some("")), item("Laptop", "Dell", None)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RowKind::Stack);
        assert_eq!(rows[0].quantity, 2);
        assert_eq!(rows[0].label, "Laptop (x2)");
    }

    #[test]
    fn whitespace_serial_is_not_serialized() {
        let a = item("Mouse", "Logi", Some("   "));
        assert!(group_key(&a).is_stack());
    }

    #[test]
    fn distinct_serials_never_merge() {
        let rows = group_rows(vec![item("Laptop", "Dell", Some("SN-001")), item("Laptop", "Dell", Some("SN-002"))]);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.kind == RowKind::Serialized && r.quantity == 1));
        assert_eq!(rows[0].label, "Laptop");
    }

    #[test]
    fn stacking_ignores_letter_case() {
        let groups = group_items(vec![item("LAPTOP", "dell", None), item("laptop", "DELL", None)]);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn group_count_is_serials_plus_stack_keys() {
        let items = vec![
            item("Laptop", "Dell", Some("A")),
            item("Cable", "Generic", None),
            item("Laptop", "Dell", Some("B")),
            item("Cable", "generic", None),
            item("Cable", "Belkin", None),
            item("Laptop", "Dell", None),
        ];
        let groups = group_items(items);
        // 2 serialized + {cable|generic, cable|belkin, laptop|dell}
        assert_eq!(groups.len(), 5);
    }

    #[test]
    fn preserves_first_appearance_order() {
        let items = vec![
            item("B", "x", None),
            item("A", "x", None),
            item("B", "x", None),
            item("C", "x", Some("S1")),
        ];
        let rows = group_rows(items);
        let labels: Vec<_> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["B (x2)", "A", "C"]);
    }
}
