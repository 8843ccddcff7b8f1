//! Declared attribute graphs.
//!
//! A [`Schema`] is the immutable, per-type half of the engine: attribute
//! declarations, their dependency lists, the compute methods bound to them
//! and the reverse-edge index derived from the declarations. It is built once
//! per owner type and shared through an `Arc` by every instance, which keeps
//! only the mutable half in its [`Attributes`](crate::Attributes).
//!
//! # Invariants
//!
//! 1. Attribute ids are dense and follow declaration order.
//! 2. Nothing in a schema changes after [`SchemaBuilder::build`].
//! 3. With [`Validation::Strict`] every dependency and compute method
//!    resolves and the graph is acyclic.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::config::{EngineConfig, Validation};
use crate::engine::Dataflow;
use crate::error::{DataflowError, Result};
use crate::slot::AttrId;

/// A compute method: invoked with the owner, it must write its attribute.
pub type ComputeFn<O> = Arc<dyn Fn(&mut O) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// No dependencies and no compute method; only ever set directly.
    Independent,
    /// Computed from its dependencies by a compute method.
    Derived,
}

/// Declaration of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrDecl<V> {
    name: String,
    initial: Option<V>,
    dependencies: Vec<String>,
    compute: Option<String>,
}

impl<V> AttrDecl<V> {
    /// General declaration.
    ///
    /// A derived attribute given an `initial` value starts valid with it and
    /// is only computed once something invalidates it.
    pub fn new<I, S>(
        name: impl Into<String>,
        initial: Option<V>,
        dependencies: I,
        compute: Option<&str>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            initial,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            compute: compute.map(str::to_string),
        }
    }

    pub fn independent(name: impl Into<String>, initial: V) -> Self {
        Self {
            name: name.into(),
            initial: Some(initial),
            dependencies: Vec::new(),
            compute: None,
        }
    }

    /// A derived attribute: starts invalid and is computed on first read.
    pub fn derived<I, S>(name: impl Into<String>, dependencies: I, compute: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            initial: None,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            compute: Some(compute.into()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn initial(&self) -> Option<&V> {
        self.initial.as_ref()
    }

    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    #[must_use]
    pub fn compute(&self) -> Option<&str> {
        self.compute.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> AttrKind {
        if self.dependencies.is_empty() && self.compute.is_none() {
            AttrKind::Independent
        } else {
            AttrKind::Derived
        }
    }
}

/// The immutable attribute graph of an owner type.
pub struct Schema<O: Dataflow> {
    decls: Vec<AttrDecl<O::Value>>,
    index: AHashMap<String, AttrId>,
    /// Resolved dependency ids; `None` marks an undeclared dependency.
    dependencies: Vec<Vec<Option<AttrId>>>,
    computes: Vec<Option<ComputeFn<O>>>,
    declared_children: Vec<Vec<AttrId>>,
    order: Option<Vec<AttrId>>,
    config: EngineConfig,
}

impl<O: Dataflow> fmt::Debug for Schema<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("decls", &self.decls)
            .field("order", &self.order)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<O: Dataflow> Schema<O> {
    pub fn builder() -> SchemaBuilder<O> {
        SchemaBuilder::new()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn id(&self, name: &str) -> Result<AttrId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DataflowError::unknown(name))
    }

    /// Reject ids that do not belong to this schema.
    pub fn check(&self, id: AttrId) -> Result<AttrId> {
        if id.index() < self.decls.len() {
            Ok(id)
        } else {
            Err(DataflowError::unknown(id.to_string()))
        }
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this schema.
    #[must_use]
    pub fn name(&self, id: AttrId) -> &str {
        self.decls[id.index()].name()
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this schema.
    #[must_use]
    pub fn decl(&self, id: AttrId) -> &AttrDecl<O::Value> {
        &self.decls[id.index()]
    }

    pub fn decls(&self) -> impl Iterator<Item = (AttrId, &AttrDecl<O::Value>)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, decl)| (AttrId::new(i as u32), decl))
    }

    pub(crate) fn dependency_ids(&self, id: AttrId) -> &[Option<AttrId>] {
        &self.dependencies[id.index()]
    }

    pub(crate) fn compute_fn(&self, id: AttrId) -> Option<&ComputeFn<O>> {
        self.computes[id.index()].as_ref()
    }

    /// Children implied by the declarations, in declaration order.
    #[must_use]
    pub fn declared_children(&self, id: AttrId) -> &[AttrId] {
        &self.declared_children[id.index()]
    }

    /// A dependency-first ordering of every attribute, or `None` when the
    /// declarations contain a cycle (only possible with deferred validation).
    #[must_use]
    pub fn topological_order(&self) -> Option<&[AttrId]> {
        self.order.as_deref()
    }
}

/// Collects declarations and compute methods for a [`Schema`].
pub struct SchemaBuilder<O: Dataflow> {
    decls: Vec<AttrDecl<O::Value>>,
    methods: AHashMap<String, ComputeFn<O>>,
    config: EngineConfig,
}

impl<O: Dataflow> Default for SchemaBuilder<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Dataflow> SchemaBuilder<O> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decls: Vec::new(),
            methods: AHashMap::new(),
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn attr(mut self, decl: AttrDecl<O::Value>) -> Self {
        self.decls.push(decl);
        self
    }

    #[must_use]
    pub fn independent(self, name: impl Into<String>, initial: O::Value) -> Self {
        self.attr(AttrDecl::independent(name, initial))
    }

    #[must_use]
    pub fn derived<I, S>(
        self,
        name: impl Into<String>,
        dependencies: I,
        compute: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attr(AttrDecl::derived(name, dependencies, compute))
    }

    /// Register a compute method under `name`. A later registration with the
    /// same name replaces the earlier one.
    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&mut O) -> Result<()> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(compute));
        self
    }

    pub fn build(self) -> Result<Schema<O>> {
        let strict = self.config.validation == Validation::Strict;

        let mut index = AHashMap::with_capacity(self.decls.len());
        for (i, decl) in self.decls.iter().enumerate() {
            if index
                .insert(decl.name.clone(), AttrId::new(i as u32))
                .is_some()
            {
                return Err(DataflowError::DuplicateAttribute {
                    name: decl.name.clone(),
                });
            }
            if decl.kind() == AttrKind::Independent && decl.initial.is_none() {
                return Err(DataflowError::MissingInitialValue {
                    attr: decl.name.clone(),
                });
            }
        }

        let mut dependencies = Vec::with_capacity(self.decls.len());
        for decl in &self.decls {
            let mut ids = Vec::with_capacity(decl.dependencies.len());
            for dep in &decl.dependencies {
                let id = index.get(dep.as_str()).copied();
                if id.is_none() && strict {
                    return Err(DataflowError::MissingDependency {
                        attr: decl.name.clone(),
                        dependency: dep.clone(),
                    });
                }
                ids.push(id);
            }
            dependencies.push(ids);
        }

        let mut computes = Vec::with_capacity(self.decls.len());
        for decl in &self.decls {
            let bound = match decl.compute() {
                Some(method) => {
                    let bound = self.methods.get(method).cloned();
                    if bound.is_none() && strict {
                        return Err(DataflowError::MissingCompute {
                            attr: decl.name.clone(),
                            method: method.to_string(),
                        });
                    }
                    bound
                }
                None => None,
            };
            computes.push(bound);
        }

        let mut declared_children = vec![Vec::new(); self.decls.len()];
        for (i, ids) in dependencies.iter().enumerate() {
            let child = AttrId::new(i as u32);
            for dep in ids.iter().flatten() {
                let children: &mut Vec<AttrId> = &mut declared_children[dep.index()];
                if !children.contains(&child) {
                    children.push(child);
                }
            }
        }

        let order = match topological_order(&dependencies) {
            Ok(order) => Some(order),
            Err(unordered) if strict => {
                return Err(DataflowError::CycleDetected {
                    path: unordered
                        .into_iter()
                        .map(|id| self.decls[id.index()].name.clone())
                        .collect(),
                });
            }
            Err(_) => None,
        };

        tracing::debug!(
            message = "dataflow.schema",
            attrs = self.decls.len(),
            methods = self.methods.len(),
            acyclic = order.is_some(),
            edge_discovery = %self.config.edge_discovery,
            validation = %self.config.validation,
        );

        Ok(Schema {
            decls: self.decls,
            index,
            dependencies,
            computes,
            declared_children,
            order,
            config: self.config,
        })
    }
}

/// Kahn's algorithm over the resolved dependency edges.
///
/// Ties are broken by declaration order. On a cycle, returns the attributes
/// that could not be ordered.
fn topological_order(
    dependencies: &[Vec<Option<AttrId>>],
) -> std::result::Result<Vec<AttrId>, Vec<AttrId>> {
    let n = dependencies.len();
    let mut in_degree = vec![0usize; n];
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, ids) in dependencies.iter().enumerate() {
        for dep in ids.iter().flatten() {
            adj[dep.index()].push(i);
            in_degree[i] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(node) = queue.pop_front() {
        order.push(AttrId::new(node as u32));
        for &next in &adj[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        Err((0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| AttrId::new(i as u32))
            .collect())
    }
}
