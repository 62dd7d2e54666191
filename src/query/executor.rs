//! Runs compiled node queries in dependency order.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::engine::{QueryEngine, Record};
use crate::query::compile::{compile, sql_literal, CompiledQuery, ParentLink};
use crate::query::context::RequestContext;
use crate::query::errors::RequestError;
use crate::query::node::{join_field, RequestNode};
use crate::query::profile::{
    profile_timer as query_profile_timer, record_profile_timer as record_query_profile_timer,
    QueryProfileKind,
};
use crate::query::value::Value;

/// Executes request trees against a backing store.
///
/// Traversal is depth-first and pre-order: a node's query completes before any
/// of its children are compiled, because the children filter on the node's
/// identifiers. Queries run one at a time.
pub struct Executor<'a> {
    engine: &'a dyn QueryEngine,
}

impl<'a> Executor<'a> {
    /// Creates an executor over `engine`.
    pub fn new(engine: &'a dyn QueryEngine) -> Self {
        Self { engine }
    }

    /// Executes every root in order, populating results throughout the tree.
    pub fn execute(&self, roots: &mut [RequestNode], ctx: &mut RequestContext) {
        for root in roots.iter_mut() {
            self.execute_node(root, None, ctx);
        }
    }

    fn execute_node(
        &self,
        node: &mut RequestNode,
        parent: Option<ParentLink<'_>>,
        ctx: &mut RequestContext,
    ) {
        let compile_timer = query_profile_timer();
        let compiled = compile(node, parent, ctx);
        record_query_profile_timer(QueryProfileKind::Compile, compile_timer);

        node.result_records = match compiled {
            Some(CompiledQuery::Execute(query)) => self.run(&node.entity, &query, ctx),
            Some(CompiledQuery::ShortCircuit(_)) => {
                debug!(entity = %node.entity, "query.execute.short_circuit");
                Vec::new()
            }
            None => Vec::new(),
        };
        node.result_identifiers = identifiers(&node.result_records, &node.id_field);

        let RequestNode {
            entity,
            children,
            child_join_keys,
            result_identifiers,
            ..
        } = node;
        for child in children.iter_mut() {
            let Some(join_field) = join_field(child_join_keys, &child.name) else {
                // The resolver only admits related children; keep going regardless.
                warn!(parent = %entity, child = %child.name, "query.execute.missing_join");
                ctx.error(RequestError::UnknownRelationship {
                    name: child.name.clone(),
                    parent: entity.clone(),
                });
                continue;
            };
            let link = ParentLink {
                join_field,
                identifiers: result_identifiers,
            };
            self.execute_node(child, Some(link), ctx);
        }
    }

    fn run(&self, entity: &str, query: &str, ctx: &mut RequestContext) -> Vec<Box<dyn Record>> {
        let timer = query_profile_timer();
        let outcome = self.engine.execute(query);
        record_query_profile_timer(QueryProfileKind::Execute, timer);
        match outcome {
            Ok(records) => {
                debug!(entity, rows = records.len(), "query.execute");
                records
            }
            Err(err) => {
                warn!(entity, query, error = %err, "query.execute.failed");
                ctx.error(RequestError::Execution {
                    message: err.to_string(),
                });
                Vec::new()
            }
        }
    }
}

/// Collects the distinct, non-null identifier values of `records`, in record order.
fn identifiers(records: &[Box<dyn Record>], id_field: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|record| record.get(id_field))
        .filter(|value| sql_literal(value).is_some_and(|literal| seen.insert(literal)))
        .cloned()
        .collect()
}
