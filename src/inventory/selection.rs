use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Checkbox state of a group row. Always derived from the selection set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupState {
    Checked,
    Unchecked,
    Indeterminate,
}

pub fn derive_group_state(selected: &SelectionSet, members: &[Uuid]) -> GroupState {
    let count = members.iter().filter(|id| selected.contains(id)).count();
    match count {
        0 => GroupState::Unchecked,
        n if n == members.len() => GroupState::Checked,
        _ => GroupState::Indeterminate,
    }
}

/// Selected item ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    ids: BTreeSet<Uuid>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &Uuid> {
        self.ids.iter()
    }

    /// Flips a single item; returns whether it is now selected.
    pub fn toggle_item(&mut self, id: Uuid) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Union when `on`, difference otherwise.
    pub fn set_group(&mut self, members: &[Uuid], on: bool) {
        if on {
            self.ids.extend(members.iter().copied());
        } else {
            for id in members {
                self.ids.remove(id);
            }
        }
    }

    /// Group checkbox click: a fully selected group is cleared, anything
    /// else becomes fully selected. Returns the new state.
    pub fn toggle_group(&mut self, members: &[Uuid]) -> GroupState {
        let turn_on = derive_group_state(self, members) != GroupState::Checked;
        self.set_group(members, turn_on);
        derive_group_state(self, members)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops ids that are no longer present, e.g. after a re-fetch.
    pub fn retain_known<'a>(&mut self, known: impl IntoIterator<Item = &'a Uuid>) {
        let known: BTreeSet<Uuid> = known.into_iter().copied().collect();
        self.ids.retain(|id| known.contains(id));
    }
}
