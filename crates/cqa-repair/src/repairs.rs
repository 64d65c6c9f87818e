//! Conflict groups and lazy repair enumeration.
//!
//! Preparation partitions the items of a relation by key: keys held by a
//! single item are *singles*, keys held by several items form a
//! [`ConflictGroup`]. A repair keeps every single and exactly one member of
//! each group, so there are `∏ |group|` repairs. They are produced lazily, in
//! cartesian-product order (first group varies slowest), and every repair
//! keeps the surviving items in their original order.

use std::collections::HashMap;

use serde::Serialize;

use crate::relation::{key_of, RelationSnapshot};
use crate::tuple::Tuple;

/// Items sharing one key value (always more than one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictGroup {
    /// Canonical key string shared by the members.
    pub key: String,
    /// Indices into the prepared item list, ascending.
    pub members: Vec<usize>,
}

impl ConflictGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    group: usize,
    position: usize,
}

/// Pre-computed partition of a relation into singles and conflict groups.
#[derive(Debug, Clone)]
pub struct RepairPlan<T> {
    items: Vec<T>,
    groups: Vec<ConflictGroup>,
    slots: Vec<Option<Slot>>,
}

impl<T: Clone> RepairPlan<T> {
    /// Group `items` by `key`. Groups are ordered by the first occurrence of
    /// their key.
    pub fn prepare<F>(items: Vec<T>, key: F) -> Self
    where
        F: Fn(&T) -> String,
    {
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut buckets: Vec<(String, Vec<usize>)> = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            let k = key(item);
            match by_key.get(&k) {
                Some(&b) => buckets[b].1.push(idx),
                None => {
                    by_key.insert(k.clone(), buckets.len());
                    buckets.push((k, vec![idx]));
                }
            }
        }

        let groups: Vec<ConflictGroup> = buckets
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(key, members)| ConflictGroup { key, members })
            .collect();

        let mut slots: Vec<Option<Slot>> = vec![None; items.len()];
        for (g, group) in groups.iter().enumerate() {
            for (position, &idx) in group.members.iter().enumerate() {
                slots[idx] = Some(Slot { group: g, position });
            }
        }

        Self {
            items,
            groups,
            slots,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn groups(&self) -> &[ConflictGroup] {
        &self.groups
    }

    /// Items whose key is not shared with any other item.
    pub fn singles(&self) -> impl Iterator<Item = &T> {
        self.items
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.is_none())
            .map(|(item, _)| item)
    }

    /// True when no key is shared, i.e. the relation is its own only repair.
    pub fn is_consistent(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of repairs, `None` if the product overflows `u64`.
    pub fn count(&self) -> Option<u64> {
        self.groups
            .iter()
            .try_fold(1u64, |acc, g| acc.checked_mul(g.len() as u64))
    }

    /// False iff `key` names a conflict group, i.e. some repair drops the
    /// tuple currently holding that key.
    pub fn is_key_certain(&self, key: &str) -> bool {
        !self.groups.iter().any(|g| g.key == key)
    }

    /// Lazily enumerate every repair.
    pub fn repairs(&self) -> Repairs<'_, T> {
        Repairs {
            plan: self,
            choice: vec![0; self.groups.len()],
            done: false,
        }
    }
}

impl RepairPlan<Tuple> {
    /// Plan the repairs of a relation snapshot under `key_columns`.
    pub fn for_key(snapshot: &RelationSnapshot, key_columns: &[String]) -> Self {
        RepairPlan::prepare(snapshot.tuples.clone(), |t| key_of(t, key_columns))
    }
}

/// Iterator over the repairs of a [`RepairPlan`].
pub struct Repairs<'a, T> {
    plan: &'a RepairPlan<T>,
    choice: Vec<usize>,
    done: bool,
}

impl<'a, T: Clone> Repairs<'a, T> {
    fn current(&self) -> Vec<T> {
        self.plan
            .items
            .iter()
            .zip(&self.plan.slots)
            .filter(|(_, slot)| match slot {
                None => true,
                Some(s) => self.choice[s.group] == s.position,
            })
            .map(|(item, _)| item.clone())
            .collect()
    }

    fn advance(&mut self) {
        for g in (0..self.choice.len()).rev() {
            self.choice[g] += 1;
            if self.choice[g] < self.plan.groups[g].len() {
                return;
            }
            self.choice[g] = 0;
        }
        // Every digit wrapped (or there were none): the product is exhausted.
        self.done = true;
    }
}

impl<'a, T: Clone> Iterator for Repairs<'a, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let repair = self.current();
        self.advance();
        Some(repair)
    }
}
