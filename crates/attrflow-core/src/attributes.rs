//! Per-instance attribute state.
//!
//! [`Attributes`] pairs the shared [`Schema`] of an owner type with the
//! instance's own slot values, discovered children and the set of attributes
//! currently being resolved. Owners embed one and hand it to the engine via
//! [`Dataflow`](crate::Dataflow).

use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;

use crate::config::{EdgeDiscovery, EngineConfig};
use crate::engine::Dataflow;
use crate::error::{DataflowError, Result};
use crate::schema::Schema;
use crate::slot::{AttrId, SlotState, SlotValue};

pub struct Attributes<O: Dataflow> {
    schema: Arc<Schema<O>>,
    slots: Vec<SlotState<O::Value>>,
    in_progress: Vec<bool>,
    /// Attributes being resolved, outermost first. Spans nested reads made
    /// from inside compute methods.
    resolving: Vec<AttrId>,
    /// Valid slots with an invalid known parent. While there are none, every
    /// known descendant of an invalid slot is invalid too.
    loose: Vec<bool>,
    loose_count: usize,
}

/// What one invalidation walk touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Cascade {
    pub(crate) visited: usize,
    pub(crate) invalidated: usize,
}

impl<O: Dataflow> Clone for Attributes<O> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            slots: self.slots.clone(),
            in_progress: self.in_progress.clone(),
            resolving: self.resolving.clone(),
            loose: self.loose.clone(),
            loose_count: self.loose_count,
        }
    }
}

impl<O: Dataflow> fmt::Debug for Attributes<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (id, decl) in self.schema.decls() {
            map.entry(&decl.name(), &self.slots[id.index()].value);
        }
        map.finish()
    }
}

impl<O: Dataflow> Attributes<O> {
    /// Fresh state for one instance: declared initial values, and either no
    /// children or the full declared reverse index depending on the schema's
    /// [`EdgeDiscovery`].
    pub fn new(schema: Arc<Schema<O>>) -> Self {
        let eager = schema.config().edge_discovery == EdgeDiscovery::Eager;
        let slots = schema
            .decls()
            .map(|(id, decl)| {
                let children = if eager {
                    schema.declared_children(id).to_vec()
                } else {
                    Vec::new()
                };
                SlotState::new(SlotValue::from(decl.initial().cloned()), children)
            })
            .collect();
        let len = schema.len();
        let mut attrs = Self {
            schema,
            slots,
            in_progress: vec![false; len],
            resolving: Vec::new(),
            loose: vec![false; len],
            loose_count: 0,
        };
        let ids: Vec<AttrId> = attrs.schema.decls().map(|(id, _)| id).collect();
        for id in ids {
            attrs.track_loose(id);
        }
        attrs
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<Schema<O>> {
        &self.schema
    }

    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.schema.config()
    }

    pub fn id(&self, name: &str) -> Result<AttrId> {
        self.schema.id(name)
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this instance's schema.
    #[must_use]
    pub fn name(&self, id: AttrId) -> &str {
        self.schema.name(id)
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this instance's schema.
    #[must_use]
    pub fn slot(&self, id: AttrId) -> &SlotState<O::Value> {
        &self.slots[id.index()]
    }

    pub(crate) fn slot_mut(&mut self, id: AttrId) -> &mut SlotState<O::Value> {
        &mut self.slots[id.index()]
    }

    /// Current value without triggering resolution.
    pub fn peek(&self, name: &str) -> Result<Option<&O::Value>> {
        let id = self.id(name)?;
        Ok(self.slot(id).value().as_valid())
    }

    pub fn is_valid(&self, name: &str) -> Result<bool> {
        let id = self.id(name)?;
        Ok(self.slot(id).value().is_valid())
    }

    /// How many times the attribute's compute method has produced a value.
    pub fn version(&self, name: &str) -> Result<u64> {
        let id = self.id(name)?;
        Ok(self.slot(id).version())
    }

    /// Names of the children currently known for `name`.
    pub fn children(&self, name: &str) -> Result<Vec<&str>> {
        let id = self.id(name)?;
        Ok(self
            .slot(id)
            .children()
            .iter()
            .map(|&child| self.name(child))
            .collect())
    }

    pub(crate) fn is_resolving(&self, id: AttrId) -> bool {
        self.in_progress[id.index()]
    }

    /// Mark `id` as being resolved, or report the cycle it would close.
    pub(crate) fn begin_resolving(&mut self, id: AttrId) -> Result<()> {
        if self.is_resolving(id) {
            let start = self
                .resolving
                .iter()
                .position(|&open| open == id)
                .unwrap_or(0);
            let path = self.resolving[start..]
                .iter()
                .chain(std::iter::once(&id))
                .map(|&open| self.name(open).to_string())
                .collect();
            return Err(DataflowError::CycleDetected { path });
        }
        self.in_progress[id.index()] = true;
        self.resolving.push(id);
        Ok(())
    }

    pub(crate) fn end_resolving(&mut self, id: AttrId) {
        self.in_progress[id.index()] = false;
        if self.resolving.last() == Some(&id) {
            self.resolving.pop();
        } else {
            self.resolving.retain(|&open| open != id);
        }
    }

    /// Store a value, as the write protocol does once it has decided the
    /// value changed.
    pub(crate) fn store(&mut self, id: AttrId, value: O::Value) {
        self.slot_mut(id).value = SlotValue::Valid(value);
        self.track_loose(id);
    }

    /// Set one slot invalid. Returns whether it was valid.
    pub(crate) fn invalidate_slot(&mut self, id: AttrId) -> bool {
        if std::mem::take(&mut self.loose[id.index()]) {
            self.loose_count -= 1;
        }
        self.slot_mut(id).invalidate()
    }

    /// Record `id` if it is valid while one of its known parents is not.
    pub(crate) fn track_loose(&mut self, id: AttrId) {
        if self.loose[id.index()] || !self.slot(id).value().is_valid() {
            return;
        }
        let has_invalid_parent = self.schema.dependency_ids(id).iter().flatten().any(|&parent| {
            let slot = self.slot(parent);
            !slot.value().is_valid() && slot.children().contains(&id)
        });
        if has_invalid_parent {
            self.loose[id.index()] = true;
            self.loose_count += 1;
        }
    }

    /// Set every transitively known child of `root` to invalid. Returns how
    /// many slots went from valid to invalid.
    pub(crate) fn invalidate_descendants(&mut self, root: AttrId) -> usize {
        self.cascade(root).invalidated
    }

    /// Walks with an explicit worklist and visited set, so shared descendants
    /// are handled once and cyclic child lists terminate. A child that was
    /// already invalid is only walked through while some valid slot sits
    /// below an invalid parent; otherwise its subtree is invalid already.
    pub(crate) fn cascade(&mut self, root: AttrId) -> Cascade {
        let mut cascade = Cascade::default();
        if self.slot(root).children().is_empty() {
            return cascade;
        }
        let mut visited = AHashSet::new();
        visited.insert(root);
        let mut work: Vec<AttrId> = self.slot(root).children().iter().rev().copied().collect();

        while let Some(child) = work.pop() {
            if !visited.insert(child) {
                continue;
            }
            cascade.visited += 1;
            let was_valid = self.invalidate_slot(child);
            if was_valid {
                cascade.invalidated += 1;
            } else if self.loose_count == 0 {
                continue;
            }
            work.extend(self.slot(child).children().iter().rev().copied());
        }
        cascade
    }
}
