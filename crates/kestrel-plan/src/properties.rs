//! Logical Properties and Functional Dependencies
//!
//! Facts about a plan's output that rules consult to justify rewrites:
//! which slot sets are unique, which slots are constant across all rows
//! (uniform), which slots always hold equal values, and which determinant
//! sets fix which dependent sets.
//!
//! All collections are ordered so that deriving the same facts twice yields
//! identical values.

use crate::expr::Slot;
use kestrel_common::SlotId;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type SlotSet = BTreeSet<SlotId>;

/// Schema and dependency facts of a plan node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalProperties {
    pub output: Vec<Slot>,
    pub fds: FunctionalDependencies,
}

impl LogicalProperties {
    pub fn output_ids(&self) -> Vec<SlotId> {
        self.output.iter().map(|s| s.id).collect()
    }
}

/// `determinants -> dependents`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FdItem {
    pub determinants: SlotSet,
    pub dependents: SlotSet,
    /// The determinants are also a unique key
    pub is_unique: bool,
}

impl FdItem {
    pub fn new(determinants: SlotSet, dependents: SlotSet, is_unique: bool) -> Self {
        Self {
            determinants,
            dependents,
            is_unique,
        }
    }
}

impl fmt::Display for FdItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}{}",
            fmt_set(&self.determinants),
            fmt_set(&self.dependents),
            if self.is_unique { " (unique)" } else { "" }
        )
    }
}

fn fmt_set(set: &SlotSet) -> String {
    let items: Vec<String> = set.iter().map(|s| s.to_string()).collect();
    format!("{{{}}}", items.join(", "))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionalDependencies {
    unique_sets: BTreeSet<SlotSet>,
    uniform_slots: SlotSet,
    equal_sets: BTreeSet<SlotSet>,
    fd_items: BTreeSet<FdItem>,
}

impl FunctionalDependencies {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_sets.is_empty()
            && self.uniform_slots.is_empty()
            && self.equal_sets.is_empty()
            && self.fd_items.is_empty()
    }

    /// Whether rows are distinct on `slots`.
    pub fn is_unique(&self, slots: &SlotSet) -> bool {
        self.unique_sets.iter().any(|u| u.is_subset(slots))
    }

    pub fn is_unique_slot(&self, slot: SlotId) -> bool {
        self.is_unique(&SlotSet::from([slot]))
    }

    pub fn is_uniform(&self, slot: SlotId) -> bool {
        self.uniform_slots.contains(&slot)
    }

    pub fn is_equal(&self, a: SlotId, b: SlotId) -> bool {
        a == b
            || self
                .equal_sets
                .iter()
                .any(|set| set.contains(&a) && set.contains(&b))
    }

    pub fn unique_sets(&self) -> &BTreeSet<SlotSet> {
        &self.unique_sets
    }

    pub fn uniform_slots(&self) -> &SlotSet {
        &self.uniform_slots
    }

    pub fn fd_items(&self) -> &BTreeSet<FdItem> {
        &self.fd_items
    }

    /// Every equivalence class of size two or more.
    pub fn all_equal_sets(&self) -> Vec<SlotSet> {
        self.equal_sets.iter().cloned().collect()
    }

    /// Equal slot pairs `(a, b)` with `a < b`.
    pub fn equal_pairs(&self) -> Vec<(SlotId, SlotId)> {
        let mut pairs = Vec::new();
        for set in &self.equal_sets {
            let members: Vec<SlotId> = set.iter().copied().collect();
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }
}

impl fmt::Display for FunctionalDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uniques: Vec<String> = self.unique_sets.iter().map(fmt_set).collect();
        let equals: Vec<String> = self.equal_sets.iter().map(fmt_set).collect();
        let items: Vec<String> = self.fd_items.iter().map(|i| i.to_string()).collect();
        write!(
            f,
            "unique=[{}] uniform={} equal=[{}] items=[{}]",
            uniques.join(", "),
            fmt_set(&self.uniform_slots),
            equals.join(", "),
            items.join(", ")
        )
    }
}

/// Disjoint sets over slot ids
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    parent: BTreeMap<SlotId, SlotId>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self {
            parent: BTreeMap::new(),
        }
    }

    pub fn find(&mut self, v: SlotId) -> SlotId {
        let parent = *self.parent.entry(v).or_insert(v);
        if parent == v {
            return v;
        }
        let root = self.find(parent);
        self.parent.insert(v, root);
        root
    }

    /// Union keeps the smaller id as root so classes are order independent.
    pub fn add(&mut self, a: SlotId, b: SlotId) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (root, child) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent.insert(child, root);
        }
    }

    pub fn is_connected(&mut self, a: SlotId, b: SlotId) -> bool {
        self.find(a) == self.find(b)
    }

    pub fn classes(&mut self) -> Vec<SlotSet> {
        let keys: Vec<SlotId> = self.parent.keys().copied().collect();
        let mut by_root: BTreeMap<SlotId, SlotSet> = BTreeMap::new();
        for k in keys {
            let root = self.find(k);
            by_root.entry(root).or_default().insert(k);
        }
        by_root.into_values().filter(|c| c.len() > 1).collect()
    }
}

/// Accumulates facts for one plan node; consumed by [`FdBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct FdBuilder {
    unique_sets: BTreeSet<SlotSet>,
    uniform_slots: SlotSet,
    equal: UnionFind,
    fd_items: BTreeSet<FdItem>,
}

impl FdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unique_set(&mut self, slots: impl IntoIterator<Item = SlotId>) {
        self.unique_sets.insert(slots.into_iter().collect());
    }

    pub fn add_unique_slot(&mut self, slot: SlotId) {
        self.add_unique_set([slot]);
    }

    pub fn add_uniform_slot(&mut self, slot: SlotId) {
        self.uniform_slots.insert(slot);
    }

    pub fn add_equal_pair(&mut self, a: SlotId, b: SlotId) {
        if a != b {
            self.equal.add(a, b);
        }
    }

    pub fn add_fd_item(&mut self, item: FdItem) {
        self.fd_items.insert(item);
    }

    pub fn add_unique_from(&mut self, fds: &FunctionalDependencies) {
        self.unique_sets.extend(fds.unique_sets.iter().cloned());
    }

    pub fn add_uniform_from(&mut self, fds: &FunctionalDependencies) {
        self.uniform_slots.extend(fds.uniform_slots.iter().copied());
    }

    pub fn add_equal_from(&mut self, fds: &FunctionalDependencies) {
        for (a, b) in fds.equal_pairs() {
            self.equal.add(a, b);
        }
    }

    pub fn add_fd_items_from(&mut self, fds: &FunctionalDependencies) {
        self.fd_items.extend(fds.fd_items.iter().cloned());
    }

    /// Inherit every fact of `fds`.
    pub fn add_all_from(&mut self, fds: &FunctionalDependencies) {
        self.add_unique_from(fds);
        self.add_uniform_from(fds);
        self.add_equal_from(fds);
        self.add_fd_items_from(fds);
    }

    /// Finish, keeping only facts about `output`.
    pub fn build(mut self, output: &[Slot]) -> FunctionalDependencies {
        let visible: SlotSet = output.iter().map(|s| s.id).collect();

        let mut equal_sets = BTreeSet::new();
        for class in self.equal.classes() {
            // a uniform member makes the whole class uniform
            if class.iter().any(|s| self.uniform_slots.contains(s)) {
                self.uniform_slots.extend(class.iter().copied());
            }
            let kept: SlotSet = class.intersection(&visible).copied().collect();
            if kept.len() > 1 {
                equal_sets.insert(kept);
            }
        }

        let unique_sets = self
            .unique_sets
            .into_iter()
            .filter(|u| u.is_subset(&visible))
            .collect();
        let uniform_slots = self
            .uniform_slots
            .intersection(&visible)
            .copied()
            .collect();
        let fd_items = self
            .fd_items
            .into_iter()
            .filter(|i| i.determinants.is_subset(&visible))
            .filter_map(|mut i| {
                i.dependents = i.dependents.intersection(&visible).copied().collect();
                (!i.dependents.is_empty()).then_some(i)
            })
            .collect();

        FunctionalDependencies {
            unique_sets,
            uniform_slots,
            equal_sets,
            fd_items,
        }
    }
}
