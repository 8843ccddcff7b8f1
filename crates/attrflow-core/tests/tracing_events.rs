//! Structured events emitted while resolving and writing attributes.

use std::sync::{Arc, Mutex};

use attrflow_core::{Attributes, Dataflow, EdgeDiscovery, EngineConfig, Result, Schema};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Debug, Default)]
struct Captured {
    /// `(message, attr)` of every event, in emission order.
    events: Vec<(String, Option<String>)>,
    resolve_spans: Vec<String>,
    recomputed: Vec<u64>,
}

impl Captured {
    fn attrs_for(&self, message: &str) -> Vec<&str> {
        self.events
            .iter()
            .filter(|(m, _)| m == message)
            .filter_map(|(_, attr)| attr.as_deref())
            .collect()
    }
}

struct DataflowTraceCapture {
    state: Arc<Mutex<Captured>>,
}

#[derive(Default)]
struct Fields {
    message: Option<String>,
    attr: Option<String>,
    recomputed: Option<u64>,
}

impl tracing::field::Visit for Fields {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "attr" => self.attr = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        if field.name() == "recomputed" {
            self.recomputed = Some(value);
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}").trim_matches('"').to_string());
        }
    }
}

impl<S> Layer<S> for DataflowTraceCapture
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::Id,
        _ctx: Context<'_, S>,
    ) {
        if attrs.metadata().name() != "dataflow.resolve" {
            return;
        }
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        if let Some(attr) = fields.attr {
            self.state.lock().expect("trace lock").resolve_spans.push(attr);
        }
    }

    fn on_record(&self, id: &tracing::Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if span.metadata().name() != "dataflow.resolve" {
            return;
        }
        let mut fields = Fields::default();
        values.record(&mut fields);
        if let Some(n) = fields.recomputed {
            self.state.lock().expect("trace lock").recomputed.push(n);
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        if let Some(message) = fields.message {
            self.state
                .lock()
                .expect("trace lock")
                .events
                .push((message, fields.attr));
        }
    }
}

struct Chain {
    attrs: Attributes<Chain>,
}

impl Dataflow for Chain {
    type Value = i32;

    fn attributes(&self) -> &Attributes<Self> {
        &self.attrs
    }

    fn attributes_mut(&mut self) -> &mut Attributes<Self> {
        &mut self.attrs
    }
}

fn update_b(chain: &mut Chain) -> Result<()> {
    let v = chain.get("a")? + 1;
    chain.set("b", v).map(drop)
}

fn update_c(chain: &mut Chain) -> Result<()> {
    let v = chain.get("b")? * 2;
    chain.set("c", v).map(drop)
}

fn chain(edges: EdgeDiscovery) -> Chain {
    let schema = Schema::<Chain>::builder()
        .config(EngineConfig::new().with_edge_discovery(edges))
        .independent("a", 1)
        .derived("b", ["a"], "update_b")
        .derived("c", ["b"], "update_c")
        .method("update_b", update_b)
        .method("update_c", update_c)
        .build()
        .expect("valid schema");
    Chain {
        attrs: Attributes::new(Arc::new(schema)),
    }
}

fn capture(f: impl FnOnce()) -> Captured {
    let state = Arc::new(Mutex::new(Captured::default()));
    let subscriber = tracing_subscriber::registry().with(DataflowTraceCapture {
        state: Arc::clone(&state),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = std::mem::take(&mut *state.lock().expect("trace lock"));
    captured
}

#[test]
fn resolve_span_records_recomputed_count() {
    let captured = capture(|| {
        let mut c = chain(EdgeDiscovery::Eager);
        assert_eq!(c.get("c").unwrap(), 4);
    });

    assert_eq!(captured.resolve_spans, ["c"]);
    assert_eq!(captured.recomputed, [2]);
    assert_eq!(captured.attrs_for("dataflow.compute"), ["b", "c"]);
    assert_eq!(captured.attrs_for("dataflow.write"), ["b", "c"]);
    assert!(captured.attrs_for("dataflow.edge").is_empty());
}

#[test]
fn memo_hits_and_noop_writes_are_traced() {
    let captured = capture(|| {
        let mut c = chain(EdgeDiscovery::Eager);
        c.get("c").unwrap();
        c.get("c").unwrap();
        assert!(!c.set("a", 1).unwrap());
    });

    assert_eq!(captured.resolve_spans, ["c"]);
    // Two hits from inside compute methods, one from the second read.
    assert_eq!(captured.attrs_for("dataflow.read"), ["a", "b", "c"]);
    assert_eq!(captured.attrs_for("dataflow.write.noop"), ["a"]);
}

#[test]
fn lazy_mode_traces_discovered_edges() {
    let captured = capture(|| {
        let mut c = chain(EdgeDiscovery::Lazy);
        c.get("c").unwrap();
        c.get("c").unwrap();
    });

    let edges = captured
        .events
        .iter()
        .filter(|(m, _)| m == "dataflow.edge")
        .count();
    assert_eq!(edges, 2);
}

#[test]
fn changed_write_reports_invalidation() {
    let captured = capture(|| {
        let mut c = chain(EdgeDiscovery::Eager);
        c.get("c").unwrap();
        assert!(c.set("a", 5).unwrap());
        assert_eq!(c.get("c").unwrap(), 12);
    });

    assert_eq!(captured.attrs_for("dataflow.write"), ["b", "c", "a", "b", "c"]);
    assert_eq!(captured.resolve_spans, ["c", "c"]);
    assert_eq!(captured.recomputed, [2, 2]);
}
