use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::span::{Attributes, Record};
use tracing::{Id, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Span field that groups spans into one run.
pub const RUN_ID_FIELD: &str = "run_id";

/// A closed span, as captured by [`RunTraceLayer`].
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub span_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    /// Nanoseconds since the Unix epoch.
    pub start_time: u128,
    pub end_time: u128,
    pub fields: HashMap<String, serde_json::Value>,
}

impl SpanRecord {
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

/// Closed spans grouped by run id.
#[derive(Debug, Clone, Default)]
pub struct RunTraceStore {
    runs: Arc<RwLock<HashMap<String, Vec<SpanRecord>>>>,
}

impl RunTraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spans of one run in the order they closed.
    pub fn spans(&self, run_id: &str) -> Vec<SpanRecord> {
        self.runs.read().ok().and_then(|runs| runs.get(run_id).cloned()).unwrap_or_default()
    }

    pub fn run_ids(&self) -> Vec<String> {
        self.runs.read().map(|runs| runs.keys().cloned().collect()).unwrap_or_default()
    }

    fn add(&self, run_id: String, span: SpanRecord) {
        if let Ok(mut runs) = self.runs.write() {
            runs.entry(run_id).or_default().push(span);
        }
    }
}

/// A layer that records every span carrying (or inheriting) a `run_id`.
pub struct RunTraceLayer {
    store: RunTraceStore,
}

impl RunTraceLayer {
    pub fn new(store: RunTraceStore) -> Self {
        Self { store }
    }
}

struct SpanFields(HashMap<String, serde_json::Value>);

struct StartTime(u128);

fn now_nanos() -> u128 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos()
}

impl<S> Layer<S> for RunTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        // Child spans inherit the run they belong to.
        if !fields.contains_key(RUN_ID_FIELD) {
            if let Some(parent) = span.parent() {
                if let Some(run_id) =
                    parent.extensions().get::<SpanFields>().and_then(|f| f.0.get(RUN_ID_FIELD).cloned())
                {
                    fields.insert(RUN_ID_FIELD.to_string(), run_id);
                }
            }
        }

        let mut extensions = span.extensions_mut();
        extensions.insert(StartTime(now_nanos()));
        extensions.insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let extensions = span.extensions();
        let Some(fields) = extensions.get::<SpanFields>().map(|f| f.0.clone()) else { return };
        let Some(run_id) = fields.get(RUN_ID_FIELD).and_then(|v| v.as_str()).map(str::to_string) else {
            return;
        };

        let record = SpanRecord {
            span_id: format!("{:016x}", id.into_u64()),
            name: span.metadata().name().to_string(),
            parent_span_id: span.parent().map(|p| format!("{:016x}", p.id().into_u64())),
            start_time: extensions.get::<StartTime>().map_or(0, |s| s.0),
            end_time: now_nanos(),
            fields,
        };
        self.store.add(run_id, record);
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}

#[cfg(test)]
mod tests {
    use tracing::info_span;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[test]
    fn spans_are_grouped_by_inherited_run_id() {
        let store = RunTraceStore::new();
        let subscriber = tracing_subscriber::registry().with(RunTraceLayer::new(store.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let run = info_span!("crew_run", run_id = "run-1");
            let _run = run.enter();
            let task = info_span!("task", task = "find", index = 0u64);
            drop(task.enter());
        });
        let unrelated = info_span!("orphan");
        drop(unrelated);

        let spans = store.spans("run-1");
        assert_eq!(spans.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), ["task", "crew_run"]);
        assert_eq!(spans[0].field_str("task"), Some("find"));
        assert_eq!(spans[0].fields["index"], 0);
        assert_eq!(spans[0].parent_span_id.as_deref(), Some(spans[1].span_id.as_str()));
        assert_eq!(store.run_ids(), ["run-1"]);
    }
}
