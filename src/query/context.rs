//! Request-scoped accumulators.
//!
//! A [`RequestContext`] is created at the start of one request, threaded by
//! `&mut` through every stage, and dropped with the response. Nothing here is
//! shared between requests.

use tracing::debug;

use crate::query::errors::{RequestError, RequestErrorWithCode};

/// Ordered, append-only list of errors raised while serving one request.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<RequestError>,
}

impl ErrorCollector {
    /// Appends an error.
    pub fn push(&mut self, err: RequestError) {
        debug!(error = %RequestErrorWithCode(&err), "query.error");
        self.errors.push(err);
    }

    /// Returns the collected errors in the order they were raised.
    pub fn errors(&self) -> &[RequestError] {
        &self.errors
    }

    /// Returns true when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Renders every error into its response string.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Log of every native query compiled during one request.
#[derive(Debug, Default)]
pub struct QueryAudit {
    queries: Vec<String>,
}

impl QueryAudit {
    /// Records a compiled query.
    pub fn record(&mut self, query: impl Into<String>) {
        self.queries.push(query.into());
    }

    /// Returns the recorded queries in compilation order.
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    /// Consumes the audit, returning the recorded queries.
    pub fn into_queries(self) -> Vec<String> {
        self.queries
    }
}

/// Everything a request accumulates besides its data.
#[derive(Debug, Default)]
pub struct RequestContext {
    /// Errors raised by any stage.
    pub errors: ErrorCollector,
    /// Queries compiled by the compiler.
    pub audit: QueryAudit,
}

impl RequestContext {
    /// Creates an empty context for a new request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `self.errors.push(err)`.
    pub fn error(&mut self, err: RequestError) {
        self.errors.push(err);
    }
}
