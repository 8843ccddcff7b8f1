//! Attribute slots: the per-instance unit of state.
//!
//! # Invariants
//!
//! 1. A slot without dependencies is never [`SlotValue::Invalid`] after
//!    construction.
//! 2. `children` holds no duplicates and only grows.
//! 3. `version` increments by exactly 1 each time the slot's compute method
//!    fulfils its contract.

use std::fmt;

/// Dense identifier of a declared attribute, assigned in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrId(pub u32);

impl AttrId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cached value of a slot, or the marker that it must be recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue<V> {
    Valid(V),
    Invalid,
}

impl<V> Default for SlotValue<V> {
    fn default() -> Self {
        Self::Invalid
    }
}

impl<V> SlotValue<V> {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    #[must_use]
    pub fn as_valid(&self) -> Option<&V> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid => None,
        }
    }

    #[must_use]
    pub fn into_valid(self) -> Option<V> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid => None,
        }
    }
}

impl<V> From<Option<V>> for SlotValue<V> {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Invalid, Self::Valid)
    }
}

impl<V: PartialEq> SlotValue<V> {
    /// Whether the slot currently holds exactly `value`.
    ///
    /// `Invalid` never equals a concrete value.
    #[must_use]
    pub fn holds(&self, value: &V) -> bool {
        matches!(self, Self::Valid(current) if current == value)
    }
}

/// Mutable state of one attribute on one owner instance.
#[derive(Debug, Clone)]
pub struct SlotState<V> {
    pub(crate) value: SlotValue<V>,
    pub(crate) children: Vec<AttrId>,
    pub(crate) version: u64,
}

impl<V> SlotState<V> {
    pub(crate) fn new(value: SlotValue<V>, children: Vec<AttrId>) -> Self {
        Self {
            value,
            children,
            version: 0,
        }
    }

    #[must_use]
    pub fn value(&self) -> &SlotValue<V> {
        &self.value
    }

    #[must_use]
    pub fn children(&self) -> &[AttrId] {
        &self.children
    }

    /// Number of completed recomputations.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Register `child` as a dependent. Returns `true` if the edge is new.
    pub(crate) fn add_child(&mut self, child: AttrId) -> bool {
        if self.children.contains(&child) {
            return false;
        }
        self.children.push(child);
        true
    }

    /// Replace the value, returning whether the slot went from valid to invalid.
    pub(crate) fn invalidate(&mut self) -> bool {
        std::mem::replace(&mut self.value, SlotValue::Invalid).is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_never_holds_a_value() {
        let slot: SlotValue<i32> = SlotValue::Invalid;
        assert!(!slot.holds(&0));
        assert!(!slot.is_valid());
        assert_eq!(slot.as_valid(), None);
    }

    #[test]
    fn holds_uses_equality() {
        let slot = SlotValue::Valid(String::from("(1+2)"));
        assert!(slot.holds(&"(1+2)".to_string()));
        assert!(!slot.holds(&"(1+3)".to_string()));
    }

    #[test]
    fn from_option() {
        assert_eq!(SlotValue::from(Some(3)), SlotValue::Valid(3));
        assert_eq!(SlotValue::<i32>::from(None), SlotValue::Invalid);
    }

    #[test]
    fn add_child_deduplicates() {
        let mut state: SlotState<i32> = SlotState::new(SlotValue::Valid(1), Vec::new());
        assert!(state.add_child(AttrId::new(3)));
        assert!(state.add_child(AttrId::new(1)));
        assert!(!state.add_child(AttrId::new(3)));
        assert_eq!(state.children(), &[AttrId::new(3), AttrId::new(1)]);
    }

    #[test]
    fn invalidate_reports_transition() {
        let mut state: SlotState<i32> = SlotState::new(SlotValue::Valid(1), Vec::new());
        assert!(state.invalidate());
        assert!(!state.invalidate());
        assert_eq!(state.value(), &SlotValue::Invalid);
    }

    #[test]
    fn attr_id_accessors() {
        let id = AttrId::new(7);
        assert_eq!(id.raw(), 7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "#7");
    }
}
