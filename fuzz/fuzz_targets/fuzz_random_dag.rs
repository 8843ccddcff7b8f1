#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use attrflow_core::{
    AttrDecl, Attributes, Dataflow, EdgeDiscovery, EngineConfig, Schema, Validation,
};
use libfuzzer_sys::fuzz_target;

const MAX_NODES: usize = 32;
const MAX_DEPS: usize = 8;
const MAX_OPS: usize = 256;

#[derive(Arbitrary, Debug)]
struct Node {
    /// Indices into the node list; one past the end names an undeclared attribute.
    deps: Vec<u8>,
    seeded: Option<i16>,
    unbound: bool,
}

#[derive(Arbitrary, Debug)]
enum Op {
    Get(u8),
    Set(u8, i16),
    Invalidate(u8),
}

#[derive(Arbitrary, Debug)]
struct Input {
    nodes: Vec<Node>,
    ops: Vec<Op>,
    lazy: bool,
}

struct Graph {
    attrs: Attributes<Graph>,
}

impl Dataflow for Graph {
    type Value = i64;

    fn attributes(&self) -> &Attributes<Self> {
        &self.attrs
    }

    fn attributes_mut(&mut self) -> &mut Attributes<Self> {
        &mut self.attrs
    }
}

fn name(i: usize) -> String {
    format!("n{i}")
}

fuzz_target!(|input: Input| {
    let n = input.nodes.len().min(MAX_NODES);
    if n == 0 {
        return;
    }
    let nodes = &input.nodes[..n];
    let edges = if input.lazy {
        EdgeDiscovery::Lazy
    } else {
        EdgeDiscovery::Eager
    };

    let mut deps: Vec<Vec<usize>> = Vec::with_capacity(n);
    let mut builder = Schema::<Graph>::builder()
        .config(EngineConfig::new()
            .with_edge_discovery(edges)
            .with_validation(Validation::Deferred));
    for (i, node) in nodes.iter().enumerate() {
        let own_deps: Vec<usize> = node
            .deps
            .iter()
            .take(MAX_DEPS)
            .map(|&d| usize::from(d) % (n + 1))
            .collect();
        let dep_names: Vec<String> = own_deps.iter().map(|&d| name(d)).collect();
        let own = name(i);
        if own_deps.is_empty() {
            builder = builder.independent(own, i64::from(node.seeded.unwrap_or(0)));
        } else {
            let method = format!("update_{own}");
            builder = builder.attr(AttrDecl::new(
                own.clone(),
                node.seeded.map(i64::from),
                dep_names.clone(),
                Some(method.as_str()),
            ));
            if !node.unbound {
                builder = builder.method(method, move |g: &mut Graph| {
                    let mut total = 0i64;
                    for dep in &dep_names {
                        total = total.wrapping_mul(31).wrapping_add(g.get(dep)?);
                    }
                    g.set(&own, total).map(drop)
                });
            }
        }
        deps.push(own_deps);
    }

    let Ok(schema) = builder.build() else {
        return;
    };
    let schema = Arc::new(schema);
    // Reads can be checked against direct evaluation only for a sound,
    // unseeded graph.
    let sound = schema.topological_order().is_some()
        && nodes
            .iter()
            .zip(&deps)
            .all(|(node, d)| d.is_empty() || (!node.unbound && node.seeded.is_none()))
        && deps.iter().flatten().all(|&d| d < n);
    let mut graph = Graph {
        attrs: Attributes::new(Arc::clone(&schema)),
    };
    let mut inputs: Vec<i64> = nodes
        .iter()
        .map(|node| i64::from(node.seeded.unwrap_or(0)))
        .collect();

    for op in input.ops.iter().take(MAX_OPS) {
        match *op {
            Op::Get(i) => {
                let i = usize::from(i) % n;
                let got = graph.get(&name(i));
                if sound {
                    let expected = evaluate(&deps, &inputs, i);
                    assert_eq!(got, Ok(expected), "n{i}");
                }
            }
            Op::Set(i, v) => {
                let i = usize::from(i) % n;
                // Only independents are written, so direct evaluation stays valid.
                if deps[i].is_empty() {
                    let changed = graph.set(&name(i), i64::from(v)).expect("declared");
                    assert_eq!(changed, inputs[i] != i64::from(v));
                    inputs[i] = i64::from(v);
                }
            }
            Op::Invalidate(i) => {
                let i = usize::from(i) % n;
                let _ = graph.invalidate(&name(i));
            }
        }
    }
});

fn evaluate(deps: &[Vec<usize>], inputs: &[i64], root: usize) -> i64 {
    let mut memo: Vec<Option<i64>> = vec![None; deps.len()];
    let mut stack = vec![root];
    while let Some(&i) = stack.last() {
        if memo[i].is_some() {
            stack.pop();
            continue;
        }
        if deps[i].is_empty() {
            memo[i] = Some(inputs[i]);
            stack.pop();
            continue;
        }
        let pending: Vec<usize> = deps[i].iter().copied().filter(|&d| memo[d].is_none()).collect();
        if pending.is_empty() {
            let total = deps[i].iter().fold(0i64, |acc, &d| {
                acc.wrapping_mul(31).wrapping_add(memo[d].unwrap_or_default())
            });
            memo[i] = Some(total);
            stack.pop();
        } else {
            stack.extend(pending);
        }
    }
    memo[root].unwrap_or_default()
}
