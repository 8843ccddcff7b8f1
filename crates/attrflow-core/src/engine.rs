//! The read/write protocol over attribute slots.
//!
//! # Read
//!
//! A valid slot is returned as is. An invalid one is resolved with an
//! explicit worklist of `(attribute, next dependency)` frames: dependencies
//! are visited depth-first in declared order, each invalid one is resolved
//! before its dependent, and only then is the dependent's compute method run.
//! The compute method writes the slot through [`Dataflow::set`]; if it does
//! not, the read fails with [`DataflowError::StaleCompute`].
//!
//! # Write
//!
//! Writing a value equal to the current one does nothing. Anything else is
//! stored and every transitively known child is set invalid.
//!
//! # Invariants
//!
//! 1. A read never returns a value computed from a since-changed dependency,
//!    as long as the dependency edge is known (always with
//!    [`EdgeDiscovery::Eager`](crate::EdgeDiscovery::Eager)).
//! 2. Between two writes, an attribute's compute method runs at most once.
//! 3. Resolution depth does not consume call stack, and a cycle is reported
//!    as [`DataflowError::CycleDetected`] instead of recursing forever.
//!
//! # Failure Modes
//!
//! - **Compute method errors**: the error propagates to the caller; every
//!   attribute on the failed resolution path stays invalid and the next read
//!   starts over.

use std::fmt;
use std::sync::Arc;

use crate::attributes::Attributes;
use crate::config::EdgeDiscovery;
use crate::error::{DataflowError, Result};
use crate::schema::{AttrKind, Schema};
use crate::slot::{AttrId, SlotValue};

/// Implemented by types whose attributes live in an [`Attributes`] map.
///
/// ```
/// use std::sync::Arc;
/// use attrflow_core::{Attributes, Dataflow, Result, Schema};
///
/// struct Rect {
///     attrs: Attributes<Rect>,
/// }
///
/// impl Dataflow for Rect {
///     type Value = u32;
///     fn attributes(&self) -> &Attributes<Self> {
///         &self.attrs
///     }
///     fn attributes_mut(&mut self) -> &mut Attributes<Self> {
///         &mut self.attrs
///     }
/// }
///
/// fn update_area(rect: &mut Rect) -> Result<()> {
///     let area = rect.get("width")? * rect.get("height")?;
///     rect.set("area", area)?;
///     Ok(())
/// }
///
/// let schema = Schema::<Rect>::builder()
///     .independent("width", 3)
///     .independent("height", 4)
///     .derived("area", ["width", "height"], "update_area")
///     .method("update_area", update_area)
///     .build()?;
/// let mut rect = Rect { attrs: Attributes::new(Arc::new(schema)) };
///
/// assert_eq!(rect.get("area")?, 12);
/// rect.set("width", 5)?;
/// assert_eq!(rect.get("area")?, 20);
/// # Ok::<(), attrflow_core::DataflowError>(())
/// ```
pub trait Dataflow: Sized {
    type Value: Clone + PartialEq + fmt::Debug;

    fn attributes(&self) -> &Attributes<Self>;

    fn attributes_mut(&mut self) -> &mut Attributes<Self>;

    /// Read an attribute, recomputing it and any invalid dependencies first.
    fn get(&mut self, name: &str) -> Result<Self::Value> {
        let id = self.attributes().id(name)?;
        read(self, id)
    }

    /// Write an attribute. Returns whether the stored value changed.
    fn set(&mut self, name: &str, value: Self::Value) -> Result<bool> {
        let id = self.attributes().id(name)?;
        Ok(write(self, id, value))
    }

    fn get_id(&mut self, id: AttrId) -> Result<Self::Value> {
        let id = self.attributes().schema().check(id)?;
        read(self, id)
    }

    fn set_id(&mut self, id: AttrId, value: Self::Value) -> Result<bool> {
        let id = self.attributes().schema().check(id)?;
        Ok(write(self, id, value))
    }

    /// Force a derived attribute, and everything known to depend on it, to
    /// be recomputed on next read. Independent attributes are left alone.
    ///
    /// Returns how many slots went from valid to invalid.
    fn invalidate(&mut self, name: &str) -> Result<usize> {
        let id = self.attributes().id(name)?;
        let attrs = self.attributes_mut();
        if attrs.schema().decl(id).kind() == AttrKind::Independent {
            return Ok(0);
        }
        let own = usize::from(attrs.invalidate_slot(id));
        let invalidated = own + attrs.invalidate_descendants(id);
        tracing::debug!(message = "dataflow.invalidate", attr = name, invalidated);
        Ok(invalidated)
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    id: AttrId,
    next: usize,
}

impl Frame {
    fn new(id: AttrId) -> Self {
        Self { id, next: 0 }
    }
}

fn read<O: Dataflow>(owner: &mut O, id: AttrId) -> Result<O::Value> {
    let attrs = owner.attributes();
    if let SlotValue::Valid(value) = attrs.slot(id).value() {
        tracing::trace!(message = "dataflow.read", attr = attrs.name(id), hit = true);
        return Ok(value.clone());
    }

    let schema = Arc::clone(attrs.schema());
    let span = tracing::debug_span!(
        "dataflow.resolve",
        attr = schema.name(id),
        recomputed = tracing::field::Empty
    );
    let _guard = span.enter();

    let mut stack = Vec::new();
    match resolve(owner, &schema, id, &mut stack) {
        Ok(recomputed) => {
            span.record("recomputed", recomputed);
        }
        Err(err) => {
            let attrs = owner.attributes_mut();
            for frame in stack.iter().rev() {
                attrs.end_resolving(frame.id);
            }
            tracing::debug!(message = "dataflow.resolve.failed", error = %err);
            return Err(err);
        }
    }

    match owner.attributes().slot(id).value() {
        SlotValue::Valid(value) => Ok(value.clone()),
        SlotValue::Invalid => Err(stale(&schema, id)),
    }
}

/// Drive the worklist until `target` has been computed. Returns the number
/// of compute methods that ran. Frames still on `stack` after an error are
/// marked as resolving and must be released by the caller.
fn resolve<O: Dataflow>(
    owner: &mut O,
    schema: &Schema<O>,
    target: AttrId,
    stack: &mut Vec<Frame>,
) -> Result<u64> {
    let lazy = schema.config().edge_discovery == EdgeDiscovery::Lazy;
    let mut recomputed = 0;

    owner.attributes_mut().begin_resolving(target)?;
    stack.push(Frame::new(target));

    while let Some(frame) = stack.last_mut() {
        let id = frame.id;
        let index = frame.next;
        frame.next += 1;

        if let Some(&dep) = schema.dependency_ids(id).get(index) {
            let Some(dep) = dep else {
                return Err(DataflowError::MissingDependency {
                    attr: schema.name(id).to_string(),
                    dependency: schema.decl(id).dependencies()[index].clone(),
                });
            };

            let attrs = owner.attributes_mut();
            if lazy && attrs.slot_mut(dep).add_child(id) {
                attrs.track_loose(id);
                tracing::trace!(
                    message = "dataflow.edge",
                    parent = schema.name(dep),
                    child = schema.name(id)
                );
            }
            if attrs.slot(dep).value().is_valid() {
                continue;
            }
            attrs.begin_resolving(dep)?;
            stack.push(Frame::new(dep));
            continue;
        }

        compute(owner, schema, id)?;
        recomputed += 1;
        stack.pop();
        owner.attributes_mut().end_resolving(id);
        if let Some(parent) = stack.last() {
            ensure_resolved(owner, schema, parent.id, id)?;
        }
    }

    Ok(recomputed)
}

/// A derived dependency must hold a value once its frame is done. Later
/// siblings may invalidate it again; the dependent's compute method reads it
/// through [`Dataflow::get`] and so resolves it afresh.
fn ensure_resolved<O: Dataflow>(
    owner: &O,
    schema: &Schema<O>,
    id: AttrId,
    dep: AttrId,
) -> Result<()> {
    if owner.attributes().slot(dep).value().is_valid()
        || schema.decl(dep).kind() == AttrKind::Independent
    {
        return Ok(());
    }
    Err(DataflowError::DependencyUpdate {
        attr: schema.name(id).to_string(),
        dependency: schema.name(dep).to_string(),
    })
}

fn compute<O: Dataflow>(owner: &mut O, schema: &Schema<O>, id: AttrId) -> Result<()> {
    let decl = schema.decl(id);
    match (schema.compute_fn(id), decl.compute()) {
        (Some(run), method) => {
            tracing::debug!(
                message = "dataflow.compute",
                attr = decl.name(),
                method = method.unwrap_or_default()
            );
            run(owner)?;
        }
        (None, Some(method)) => {
            return Err(DataflowError::MissingCompute {
                attr: decl.name().to_string(),
                method: method.to_string(),
            });
        }
        (None, None) => {}
    }

    let slot = owner.attributes_mut().slot_mut(id);
    if !slot.value().is_valid() {
        return Err(stale(schema, id));
    }
    slot.version += 1;
    Ok(())
}

fn stale<O: Dataflow>(schema: &Schema<O>, id: AttrId) -> DataflowError {
    let decl = schema.decl(id);
    DataflowError::StaleCompute {
        attr: decl.name().to_string(),
        method: decl.compute().unwrap_or_default().to_string(),
    }
}

fn write<O: Dataflow>(owner: &mut O, id: AttrId, value: O::Value) -> bool {
    let attrs = owner.attributes_mut();
    let slot = attrs.slot_mut(id);
    if slot.value().holds(&value) {
        tracing::trace!(message = "dataflow.write.noop", attr = attrs.name(id));
        return false;
    }
    attrs.store(id, value);
    let cascade = attrs.cascade(id);
    tracing::debug!(
        message = "dataflow.write",
        attr = attrs.name(id),
        invalidated = cascade.invalidated,
        visited = cascade.visited
    );
    true
}
