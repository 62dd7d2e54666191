//! Caller-facing request/response contract.
//!
//! [`QueryService`] wires the pipeline together for one request at a time:
//! variable substitution, parsing, execution and assembly. Each call owns a
//! fresh [`RequestContext`], so errors and compiled queries never leak between
//! requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info_span};

use crate::engine::QueryEngine;
use crate::query::assemble::assemble;
use crate::query::context::RequestContext;
use crate::query::executor::Executor;
use crate::query::metadata::MetadataCatalog;
use crate::query::profile::{
    profile_timer as query_profile_timer, record_profile_timer as record_query_profile_timer,
    QueryProfileKind,
};
use crate::query::tree::{TreeBuilder, DEFAULT_MAX_DEPTH};

/// Inbound request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Query document text.
    pub query: String,
    /// Values substituted for `$name` references before parsing.
    #[serde(default)]
    pub variables: BTreeMap<String, JsonValue>,
}

impl Request {
    /// Creates a request without variables.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Adds a variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// Outbound response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Assembled data keyed by root alias, or `null` when nothing could be parsed or resolved.
    pub data: Option<Map<String, JsonValue>>,
    /// Every error raised while serving the request, in order.
    pub errors: Vec<String>,
    /// Every native query compiled while serving the request, in order.
    pub queries: Vec<String>,
}

/// Replaces every `$name` with the percent-encoded value of `variables[name]`.
///
/// Substitution is textual. Longer names are substituted first so `$id` does
/// not clobber `$idx`. Non-string values are encoded from their JSON text.
pub fn substitute_variables(query: &str, variables: &BTreeMap<String, JsonValue>) -> String {
    let mut names: Vec<&String> = variables.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let mut out = query.to_owned();
    for name in names {
        let rendered = match &variables[name] {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(&format!("${name}"), &urlencoding::encode(&rendered));
    }
    out
}

/// Serves requests against a catalog and a backing store.
pub struct QueryService<C, E> {
    catalog: C,
    engine: E,
    max_depth: usize,
}

impl<C, E> QueryService<C, E>
where
    C: MetadataCatalog,
    E: QueryEngine,
{
    /// Creates a service with the default nesting limit.
    pub fn new(catalog: C, engine: E) -> Self {
        Self {
            catalog,
            engine,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Overrides the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Serves one request.
    pub fn handle(&self, request: &Request) -> Response {
        let span = info_span!("query.request", variables = request.variables.len());
        let _guard = span.enter();
        let mut ctx = RequestContext::new();

        let query = substitute_variables(&request.query, &request.variables);
        let parse_timer = query_profile_timer();
        let roots = TreeBuilder::new(&self.catalog)
            .with_max_depth(self.max_depth)
            .parse(&query, &mut ctx);
        record_query_profile_timer(QueryProfileKind::Parse, parse_timer);

        let data = match roots {
            Some(mut roots) if !roots.is_empty() => {
                Executor::new(&self.engine).execute(&mut roots, &mut ctx);
                Some(assemble(&roots))
            }
            _ => None,
        };

        debug!(
            errors = ctx.errors.len(),
            queries = ctx.audit.queries().len(),
            "query.request.complete"
        );
        Response {
            data,
            errors: ctx.errors.messages(),
            queries: ctx.audit.into_queries(),
        }
    }
}
