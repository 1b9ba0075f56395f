//! Request Pipeline Stages
//!
//! Every outgoing request passes through an explicit, ordered pipeline of
//! named stages. Each stage takes the request builder and returns it,
//! possibly extended; nothing is registered implicitly, so the full
//! assembly order is visible in one place.

use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::trace;
use uuid::Uuid;

use crate::client::options::RequestOptions;

/// Header carrying the per-request trace identifier.
pub const TRACE_HEADER: &str = "X-Request-Id";

// == Request Context ==
/// Inputs the pipeline stages draw from, captured once per attempt.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Bearer token, when a session is active
    pub token: Option<String>,
    /// Fresh trace identifier for this attempt
    pub trace_id: String,
    /// Extra caller-supplied headers
    pub headers: Vec<(String, String)>,
    /// Query parameters
    pub params: Option<Value>,
}

impl RequestContext {
    /// Builds a context with a freshly generated trace identifier.
    pub fn new(token: Option<String>, opts: &RequestOptions) -> Self {
        Self {
            token,
            trace_id: Uuid::new_v4().to_string(),
            headers: opts.headers.clone(),
            params: opts.params.clone(),
        }
    }
}

/// One pipeline stage: (builder, context) -> builder.
type Stage = fn(RequestBuilder, &RequestContext) -> RequestBuilder;

/// The assembly pipeline, applied in order.
const PIPELINE: &[(&str, Stage)] = &[
    ("query-params", attach_query_params),
    ("custom-headers", attach_custom_headers),
    ("bearer-auth", attach_bearer_auth),
    ("trace-id", attach_trace_id),
];

// == Apply Pipeline ==
/// Runs the builder through every stage in order.
pub fn apply_pipeline(mut builder: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
    for (name, stage) in PIPELINE {
        trace!(stage = name, trace_id = %ctx.trace_id, "Applying request stage");
        builder = stage(builder, ctx);
    }
    builder
}

/// Serializes the params object into query pairs.
fn attach_query_params(builder: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
    match &ctx.params {
        Some(Value::Object(map)) => {
            let pairs: Vec<(String, String)> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), scalar_string(v)))
                .collect();
            builder.query(&pairs)
        }
        _ => builder,
    }
}

/// Appends caller-supplied headers.
fn attach_custom_headers(mut builder: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
    for (name, value) in &ctx.headers {
        builder = builder.header(name, value);
    }
    builder
}

/// Attaches the bearer credential when a session is active.
fn attach_bearer_auth(builder: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
    match &ctx.token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Attaches the per-request trace identifier.
fn attach_trace_id(builder: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
    builder.header(TRACE_HEADER, &ctx.trace_id)
}

/// Query-string rendering of a scalar JSON value. Strings are used as-is;
/// anything else keeps its JSON serialization.
fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
